use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const USERNAME_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ProfileMarker;

/// The public face of an account, as shown on posts and leaderboards.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct Author {
    pub id: Id<ProfileMarker>,
    pub username: Username,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Profile {
    pub id: Id<ProfileMarker>,
    pub username: Username,
    pub avatar_url: Option<String>,
    pub created_at: UtcDateTime,
}

/// A leaderboard entry: a profile together with the total number of likes
/// its posts have received.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Hero {
    pub id: Id<ProfileMarker>,
    pub username: Username,
    pub avatar_url: Option<String>,
    pub likes: u64,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0}")]
pub struct InvalidUsernameError(String);

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let length = username.chars().count();
        if length > 0 && length <= USERNAME_MAX_LEN {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Username"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::profile::{USERNAME_MAX_LEN, Username};

    #[test]
    fn username_bounds() {
        assert!(Username::new(String::new()).is_err());
        assert!(Username::new("hero".to_owned()).is_ok());
        assert!(Username::new("x".repeat(USERNAME_MAX_LEN)).is_ok());
        assert!(Username::new("x".repeat(USERNAME_MAX_LEN + 1)).is_err());
    }
}
