//! Scorer collaborator contract and HTTP client
//!
//! The vision side (pollution heuristics, image-text matching) lives in a
//! separate service; this module only carries the contract the pipeline
//! depends on and a reqwest client for the remote implementation.

use async_trait::async_trait;
use breathe_common::{Error, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;

const SCORE_PATH: &str = "/verify-report";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Raw scorer output. Confidence scales are whatever the scorer emits
/// (0-1 fraction or 0-100 percent); normalization happens in the pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreOutcome {
    #[serde(default)]
    pub pollution_confidence: f64,
    #[serde(default)]
    pub description_match_confidence: f64,
    /// Credits the scorer suggests awarding on a verified outcome
    #[serde(default)]
    pub awarded_credits: i64,
    /// Free-form diagnostic keys (e.g. per-heuristic sub-scores)
    #[serde(default)]
    pub details: Map<String, Value>,
}

/// Image + description scoring collaborator
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, image: &[u8], filename: &str, description: &str)
        -> Result<ScoreOutcome>;
}

/// Client for the external scorer service
pub struct HttpScorer {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpScorer {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build scorer client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Scorer for HttpScorer {
    /// POST the image and description to the scorer service.
    ///
    /// Transport failures, timeouts, and non-2xx responses all map to
    /// `ScorerUnavailable` so callers never mistake them for a low-confidence
    /// verdict.
    async fn score(
        &self,
        image: &[u8],
        filename: &str,
        description: &str,
    ) -> Result<ScoreOutcome> {
        let part = reqwest::multipart::Part::bytes(image.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("description", description.to_string());

        let url = format!("{}{}", self.base_url, SCORE_PATH);
        tracing::debug!(url = %url, image_size = image.len(), "Requesting image score");

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::ScorerUnavailable(format!("Scorer request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ScorerUnavailable(format!(
                "Scorer returned HTTP {}",
                status
            )));
        }

        response
            .json::<ScoreOutcome>()
            .await
            .map_err(|e| Error::ScorerUnavailable(format!("Scorer response unreadable: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_fields_default_when_absent() {
        let outcome: ScoreOutcome = serde_json::from_str("{}").unwrap();
        assert_eq!(outcome.pollution_confidence, 0.0);
        assert_eq!(outcome.description_match_confidence, 0.0);
        assert_eq!(outcome.awarded_credits, 0);
        assert!(outcome.details.is_empty());
    }

    #[test]
    fn outcome_parses_scorer_payload() {
        let outcome: ScoreOutcome = serde_json::from_str(
            r#"{
                "pollution_confidence": 61.2,
                "description_match_confidence": 0.7,
                "awarded_credits": 100,
                "details": {"edge_density_score": "61.20%"}
            }"#,
        )
        .unwrap();
        assert_eq!(outcome.pollution_confidence, 61.2);
        assert_eq!(outcome.awarded_credits, 100);
        assert!(outcome.details.contains_key("edge_density_score"));
    }
}
