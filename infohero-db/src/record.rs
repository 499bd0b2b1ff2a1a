//! Raw row shapes and their conversions into domain models.

use infohero_common::model::{
    ModelValidationError,
    auth::Session,
    badge::{Badge, BadgeLink},
    comment::Comment,
    post::{Post, PostTitle},
    profile::{Author, Hero, Profile, Username},
    reaction::{CommentReaction, Polarity, PostReaction, ReactionCounts},
};
use sqlx::FromRow;
use std::str::FromStr;
use time::{Duration, PrimitiveDateTime};

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct ProfileRecord {
    pub profile_snowflake: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub created_at: PrimitiveDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CredentialsRecord {
    pub profile_snowflake: i64,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct SessionRecord {
    pub profile_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: PrimitiveDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct PostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub hashtags: Vec<String>,
    pub fake_detection: bool,
    pub created_at: PrimitiveDateTime,
    pub author_snowflake: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub post_snowflake: i64,
    pub content: String,
    pub created_at: PrimitiveDateTime,
    pub author_snowflake: i64,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct BadgeRecord {
    pub badge_snowflake: i64,
    pub name: String,
    pub color: String,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct BadgeLinkRecord {
    pub post_snowflake: i64,
    pub badge_snowflake: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct PostReactionRecord {
    pub profile_snowflake: i64,
    pub post_snowflake: i64,
    pub polarity: String,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CommentReactionRecord {
    pub profile_snowflake: i64,
    pub comment_snowflake: i64,
    pub polarity: String,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct HeroRecord {
    pub profile_snowflake: i64,
    pub username: String,
    pub avatar_url: Option<String>,
    pub likes: i64,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct ReactionCountsRecord {
    pub likes: i64,
    pub unlikes: i64,
}

impl TryFrom<ProfileRecord> for Profile {
    type Error = ModelValidationError;

    fn try_from(value: ProfileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.profile_snowflake.cast_unsigned().into(),
            username: Username::new(value.username)?,
            avatar_url: value.avatar_url,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<SessionRecord> for Session {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            profile: value.profile_snowflake.cast_unsigned().into(),
            token_hash: value.token_hash.into_boxed_slice().try_into()?,
            created_at: value.created_at.as_utc(),
            expires_after: value
                .expires_after_seconds
                .map(|seconds| Duration::seconds(seconds).try_into())
                .transpose()?,
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_snowflake.cast_unsigned().into(),
            author: Author {
                id: value.author_snowflake.cast_unsigned().into(),
                username: Username::new(value.username)?,
                avatar_url: value.avatar_url,
            },
            title: PostTitle::new(value.title)?,
            content: value.content,
            image_url: value.image_url,
            source: value.source,
            hashtags: value.hashtags,
            fake_detection: value.fake_detection,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.comment_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            author: Author {
                id: value.author_snowflake.cast_unsigned().into(),
                username: Username::new(value.username)?,
                avatar_url: value.avatar_url,
            },
            content: value.content,
            created_at: value.created_at.as_utc(),
        })
    }
}

impl From<BadgeRecord> for Badge {
    fn from(value: BadgeRecord) -> Self {
        Self {
            id: value.badge_snowflake.cast_unsigned().into(),
            name: value.name,
            color: value.color,
        }
    }
}

impl From<BadgeLinkRecord> for BadgeLink {
    fn from(value: BadgeLinkRecord) -> Self {
        Self {
            post: value.post_snowflake.cast_unsigned().into(),
            badge: value.badge_snowflake.cast_unsigned().into(),
        }
    }
}

impl TryFrom<PostReactionRecord> for PostReaction {
    type Error = ModelValidationError;

    fn try_from(value: PostReactionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            profile: value.profile_snowflake.cast_unsigned().into(),
            post: value.post_snowflake.cast_unsigned().into(),
            polarity: Polarity::from_str(&value.polarity)?,
        })
    }
}

impl TryFrom<CommentReactionRecord> for CommentReaction {
    type Error = ModelValidationError;

    fn try_from(value: CommentReactionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            profile: value.profile_snowflake.cast_unsigned().into(),
            comment: value.comment_snowflake.cast_unsigned().into(),
            polarity: Polarity::from_str(&value.polarity)?,
        })
    }
}

impl TryFrom<HeroRecord> for Hero {
    type Error = ModelValidationError;

    fn try_from(value: HeroRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.profile_snowflake.cast_unsigned().into(),
            username: Username::new(value.username)?,
            avatar_url: value.avatar_url,
            likes: value.likes.cast_unsigned(),
        })
    }
}

impl From<ReactionCountsRecord> for ReactionCounts {
    fn from(value: ReactionCountsRecord) -> Self {
        Self {
            likes: value.likes.cast_unsigned(),
            unlikes: value.unlikes.cast_unsigned(),
        }
    }
}
