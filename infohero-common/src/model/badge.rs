use crate::model::{Id, post::PostMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::Error,
};
use thiserror::Error;

/// Badge assignment cap per post, checked before anything is written.
pub const MAX_POST_BADGES: usize = 3;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BadgeMarker;

/// A named, colored topical tag. Created out-of-band; posts only reference
/// existing badges.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Badge {
    pub id: Id<BadgeMarker>,
    pub name: String,
    pub color: String,
}

/// A post↔badge association row.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct BadgeLink {
    pub post: Id<PostMarker>,
    pub badge: Id<BadgeMarker>,
}

/// The badges picked for a draft: between one and [`MAX_POST_BADGES`]
/// distinct badge IDs.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct BadgeSelection(Vec<Id<BadgeMarker>>);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidBadgeSelectionError {
    #[error("At least one badge must be selected")]
    Empty,
    #[error("At most {MAX_POST_BADGES} badges may be selected, got {0}")]
    TooMany(usize),
    #[error("The same badge was selected more than once")]
    Duplicate,
}

impl BadgeSelection {
    pub fn new(badges: Vec<Id<BadgeMarker>>) -> Result<Self, InvalidBadgeSelectionError> {
        if badges.is_empty() {
            return Err(InvalidBadgeSelectionError::Empty);
        }
        if badges.len() > MAX_POST_BADGES {
            return Err(InvalidBadgeSelectionError::TooMany(badges.len()));
        }
        for (index, badge) in badges.iter().enumerate() {
            if badges[..index].contains(badge) {
                return Err(InvalidBadgeSelectionError::Duplicate);
            }
        }

        Ok(Self(badges))
    }

    #[must_use]
    pub fn get(&self) -> &[Id<BadgeMarker>] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<Id<BadgeMarker>> {
        self.0
    }
}

impl<'de> Deserialize<'de> for BadgeSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = Vec::deserialize(deserializer)?;
        BadgeSelection::new(inner).map_err(Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::badge::{BadgeSelection, InvalidBadgeSelectionError, MAX_POST_BADGES};

    #[test]
    fn selection_bounds() {
        assert_eq!(
            BadgeSelection::new(Vec::new()),
            Err(InvalidBadgeSelectionError::Empty)
        );

        let ids = |count: u64| (1..=count).map(Into::into).collect::<Vec<_>>();

        for count in 1..=MAX_POST_BADGES as u64 {
            assert!(BadgeSelection::new(ids(count)).is_ok());
        }
        assert_eq!(
            BadgeSelection::new(ids(MAX_POST_BADGES as u64 + 1)),
            Err(InvalidBadgeSelectionError::TooMany(MAX_POST_BADGES + 1))
        );
    }

    #[test]
    fn selection_rejects_duplicates() {
        assert_eq!(
            BadgeSelection::new(vec![7_u64.into(), 7_u64.into()]),
            Err(InvalidBadgeSelectionError::Duplicate)
        );
    }
}
