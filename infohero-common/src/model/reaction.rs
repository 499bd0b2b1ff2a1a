use crate::model::{Id, comment::CommentMarker, post::PostMarker, profile::ProfileMarker};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// The single polarity a user can hold toward a target at a time.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Like,
    Unlike,
}

impl Polarity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Like => "like",
            Polarity::Unlike => "unlike",
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown reaction polarity: {0}")]
pub struct InvalidPolarityError(String);

impl FromStr for Polarity {
    type Err = InvalidPolarityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Polarity::Like),
            "unlike" => Ok(Polarity::Unlike),
            other => Err(InvalidPolarityError(other.to_owned())),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct PostReaction {
    pub profile: Id<ProfileMarker>,
    pub post: Id<PostMarker>,
    pub polarity: Polarity,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct CommentReaction {
    pub profile: Id<ProfileMarker>,
    pub comment: Id<CommentMarker>,
    pub polarity: Polarity,
}

/// Derived counts for one target; always counted from rows, never stored.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct ReactionCounts {
    pub likes: u64,
    pub unlikes: u64,
}

#[cfg(test)]
mod tests {
    use crate::model::reaction::Polarity;
    use std::str::FromStr;

    #[test]
    fn polarity_string_roundtrip() {
        for polarity in [Polarity::Like, Polarity::Unlike] {
            assert_eq!(Polarity::from_str(polarity.as_str()), Ok(polarity));
        }
        assert!(Polarity::from_str("meh").is_err());
    }
}
