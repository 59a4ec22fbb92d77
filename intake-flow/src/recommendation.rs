//! Boundary to the remote recommendation service.
//!
//! The service receives the whole conversation as `{"history": [...]}` and
//! answers with `{"response": "..."}`. Error bodies use the same shape, with
//! `response` carrying the error detail.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::{
    error::{FlowError, Result},
    message::Message,
};

pub const DEFAULT_RECOMMENDATION_URL: &str = "http://127.0.0.1:8000/api/insurance";

#[async_trait]
pub trait RecommendationClient: Send + Sync {
    /// Send the augmented history and return the recommendation text.
    async fn recommend(&self, history: &[Message]) -> Result<String>;
}

#[derive(Serialize)]
struct RecommendationRequest<'a> {
    history: &'a [Message],
}

#[derive(Deserialize, Debug)]
struct RecommendationResponse {
    response: String,
}

/// `reqwest` implementation: one POST per call, no retry and no timeout.
#[derive(Debug, Clone)]
pub struct HttpRecommendationClient {
    client: Client,
    url: String,
}

impl HttpRecommendationClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RecommendationClient for HttpRecommendationClient {
    #[instrument(skip(self, history), fields(url = %self.url, messages = history.len()))]
    async fn recommend(&self, history: &[Message]) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&RecommendationRequest { history })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<RecommendationResponse>(&body)
                .map(|r| r.response)
                .unwrap_or(body);
            error!(%status, %detail, "Recommendation service request failed");
            return Err(FlowError::Service {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed = serde_json::from_str::<RecommendationResponse>(&body)
            .map_err(|e| FlowError::MalformedResponse(e.to_string()))?;
        debug!(length = parsed.response.len(), "Received recommendation");
        Ok(parsed.response)
    }
}
