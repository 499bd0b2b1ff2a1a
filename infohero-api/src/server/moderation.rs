//! Client for the external text-classification service and the publication
//! gate built on top of it.
//!
//! The two calls are deliberately asymmetric: hate speech blocks
//! publication whenever the service does not return an explicit clean
//! verdict, while the fake-news classification only annotates the post and
//! never blocks.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationKind {
    HateSpeech,
    FakeNews,
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Request to the moderation service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("The moderation service replied with status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    #[serde(rename = "type")]
    kind: ClassificationKind,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Deserialize)]
struct ClassifyResponse {
    predicted_class: bool,
}

/// The gate's decision over a draft.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum GateVerdict {
    /// The draft must not be published.
    Blocked,
    /// The draft may be published, carrying the fake-news annotation.
    Cleared { fake_detection: bool },
}

#[derive(Debug)]
pub struct ModerationClient {
    classify_url: String,
    client: reqwest::Client,
}

impl ModerationClient {
    pub fn new(base_url: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(CLASSIFY_TIMEOUT)
            .build()?;
        let classify_url = format!("{}/classify", base_url.trim_end_matches('/'));

        Ok(Self {
            classify_url,
            client,
        })
    }

    pub async fn classify(
        &self,
        text: &str,
        kind: ClassificationKind,
    ) -> Result<bool, ModerationError> {
        let response = self
            .client
            .post(&self.classify_url)
            .json(&ClassifyRequest { text, kind })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ModerationError::Status(response.status()));
        }

        let body: ClassifyResponse = response.json().await?;
        Ok(body.predicted_class)
    }

    /// Runs the full two-step gate over a draft's combined text.
    pub async fn screen(&self, text: &str) -> GateVerdict {
        let hate_speech = self.classify(text, ClassificationKind::HateSpeech).await;
        if blocks_publication(&hate_speech) {
            if let Err(err) = &hate_speech {
                warn!(
                    error = %err,
                    "Hate speech check did not complete, treating the draft as unverified"
                );
            }
            return GateVerdict::Blocked;
        }

        let fake_news = self.classify(text, ClassificationKind::FakeNews).await;
        if let Err(err) = &fake_news {
            warn!(error = %err, "Fake news check did not complete, leaving the flag unset");
        }

        GateVerdict::Cleared {
            fake_detection: fake_annotation(fake_news),
        }
    }
}

/// Anything but an explicit clean verdict blocks publication.
fn blocks_publication<E>(outcome: &Result<bool, E>) -> bool {
    !matches!(outcome, Ok(false))
}

/// A failed classification leaves the annotation unset.
fn fake_annotation<E>(outcome: Result<bool, E>) -> bool {
    outcome.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use crate::server::moderation::{
        ClassificationKind, blocks_publication, fake_annotation,
    };

    #[test]
    fn hate_speech_gate_fails_closed() {
        assert!(!blocks_publication::<()>(&Ok(false)));
        assert!(blocks_publication::<()>(&Ok(true)));
        assert!(blocks_publication(&Err(())));
    }

    #[test]
    fn fake_news_annotation_fails_open() {
        assert!(fake_annotation::<()>(Ok(true)));
        assert!(!fake_annotation::<()>(Ok(false)));
        assert!(!fake_annotation(Err(())));
    }

    #[test]
    fn classification_kinds_use_the_wire_names() {
        assert_eq!(
            serde_json::to_string(&ClassificationKind::HateSpeech).unwrap(),
            "\"hate_speech\""
        );
        assert_eq!(
            serde_json::to_string(&ClassificationKind::FakeNews).unwrap(),
            "\"fake_news\""
        );
    }
}
