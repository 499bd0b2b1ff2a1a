use crate::model::{
    Id,
    badge::BadgeSelection,
    profile::{Author, ProfileMarker},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_TITLE_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A published article as read back from storage, with the author resolved.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: Author,
    pub title: PostTitle,
    pub content: String,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub hashtags: Vec<String>,
    pub fake_detection: bool,
    pub created_at: UtcDateTime,
}

/// The fields written for a new post, after the draft has been normalized
/// and the moderation gate has fixed `fake_detection`.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub author: Id<ProfileMarker>,
    pub title: PostTitle,
    pub content: String,
    pub image_url: Option<String>,
    pub source: Option<String>,
    pub hashtags: Vec<String>,
    pub fake_detection: bool,
}

/// An incoming draft as submitted by the composition form.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct PostDraft {
    pub title: PostTitle,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Comma-separated, as typed into the form.
    #[serde(default)]
    pub hashtags: String,
    pub badges: BadgeSelection,
}

impl PostDraft {
    /// The text blob handed to the moderation collaborator.
    #[must_use]
    pub fn moderation_text(&self) -> String {
        format!("{}. {}", self.title.get(), self.content)
    }

    #[must_use]
    pub fn hashtag_list(&self) -> Vec<String> {
        parse_hashtags(&self.hashtags)
    }

    /// Turns the draft into the row to insert, applying empty-string
    /// normalization on the optional URLs.
    #[must_use]
    pub fn into_new_post(self, author: Id<ProfileMarker>, fake_detection: bool) -> NewPost {
        let hashtags = self.hashtag_list();
        NewPost {
            author,
            title: self.title,
            content: self.content,
            image_url: normalize_optional(self.image_url),
            source: normalize_optional(self.source),
            hashtags,
            fake_detection,
        }
    }
}

/// Splits a comma-separated hashtag string, trimming whitespace and dropping
/// empty segments.
#[must_use]
pub fn parse_hashtags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Empty or whitespace-only values become `None`.
#[must_use]
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_owned)
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostTitle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The post title is invalid: {0}")]
pub struct InvalidPostTitleError(String);

impl PostTitle {
    pub fn new(title: String) -> Result<Self, InvalidPostTitleError> {
        let length = title.chars().count();
        if length > 0 && length <= POST_TITLE_MAX_LEN {
            Ok(PostTitle(title))
        } else {
            Err(InvalidPostTitleError(title))
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

impl<'de> Deserialize<'de> for PostTitle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostTitle::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"PostTitle"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        badge::BadgeSelection,
        post::{POST_TITLE_MAX_LEN, PostDraft, PostTitle, normalize_optional, parse_hashtags},
    };

    fn draft() -> PostDraft {
        PostDraft {
            title: PostTitle::new("Test".to_owned()).unwrap(),
            content: "Hello world".to_owned(),
            image_url: None,
            source: Some(String::new()),
            hashtags: " news, politics ,,local ".to_owned(),
            badges: BadgeSelection::new(vec![1_u64.into()]).unwrap(),
        }
    }

    #[test]
    fn title_bounds() {
        assert!(PostTitle::new(String::new()).is_err());
        assert!(PostTitle::new("x".repeat(POST_TITLE_MAX_LEN)).is_ok());
        assert!(PostTitle::new("x".repeat(POST_TITLE_MAX_LEN + 1)).is_err());
    }

    #[test]
    fn moderation_text_concatenates_title_and_content() {
        assert_eq!(draft().moderation_text(), "Test. Hello world");
    }

    #[test]
    fn hashtags_are_split_and_trimmed() {
        assert_eq!(parse_hashtags(""), Vec::<String>::new());
        assert_eq!(
            parse_hashtags(" news, politics ,,local "),
            vec!["news", "politics", "local"]
        );
    }

    #[test]
    fn empty_urls_normalize_to_none() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some(String::new())), None);
        assert_eq!(normalize_optional(Some("   ".to_owned())), None);
        assert_eq!(
            normalize_optional(Some("https://example.org".to_owned())),
            Some("https://example.org".to_owned())
        );
    }

    #[test]
    fn draft_normalizes_into_new_post() {
        let new_post = draft().into_new_post(9_u64.into(), false);

        assert_eq!(new_post.author, 9_u64.into());
        assert_eq!(new_post.image_url, None);
        assert_eq!(new_post.source, None);
        assert_eq!(new_post.hashtags, vec!["news", "politics", "local"]);
        assert!(!new_post.fake_detection);
    }
}
