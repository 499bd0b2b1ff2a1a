pub mod auth;
pub mod badge;
pub mod comment;
pub mod feed;
pub mod post;
pub mod profile;
pub mod reaction;

use crate::{
    model::{
        auth::InvalidAuthTokenHashError,
        badge::InvalidBadgeSelectionError,
        post::InvalidPostTitleError,
        profile::InvalidUsernameError,
        reaction::InvalidPolarityError,
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

/// Raised when data coming back from storage does not satisfy the model's
/// validation rules.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    PostTitle(#[from] InvalidPostTitleError),
    #[error(transparent)]
    BadgeSelection(#[from] InvalidBadgeSelectionError),
    #[error(transparent)]
    Polarity(#[from] InvalidPolarityError),
    #[error(transparent)]
    NonPositiveDuration(#[from] auth::NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct InfoHeroEpoch;
impl Epoch for InfoHeroEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2024-01-01 00:00);
}

pub type InfoHeroSnowflake = Snowflake<InfoHeroEpoch>;
pub type InfoHeroSnowflakeGenerator = SnowflakeGenerator<InfoHeroEpoch>;

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(InfoHeroSnowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: InfoHeroSnowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> InfoHeroSnowflake {
        self.0
    }

    /// The creation instant encoded in the ID.
    #[must_use]
    pub fn created_at(self) -> UtcDateTime {
        self.0.created_at()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<InfoHeroSnowflake> for Id<Marker> {
    fn from(value: InfoHeroSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for InfoHeroSnowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(InfoHeroSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
