use crate::core::moderation::{CategoryScores, ModerationProvider, ProviderError, ProviderReply};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const MODERATIONS_URL: &str = "https://api.openai.com/v1/moderations";

/// Body of a `/v1/moderations` response. Only the fields we read.
#[derive(Debug, Deserialize)]
struct ModerationsResponse {
    results: Vec<CategoryScores>,
}

/// Primary provider: OpenAI's moderation endpoint, which already returns
/// per-category flags and scores.
pub struct OpenAiModerationClient {
    client: Client,
    api_key: String,
}

impl OpenAiModerationClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn into_reply(body: ModerationsResponse) -> Result<ProviderReply, ProviderError> {
        body.results
            .into_iter()
            .next()
            .map(ProviderReply::Scored)
            .ok_or_else(|| ProviderError::InvalidResponse("empty results array".to_string()))
    }
}

#[async_trait]
impl ModerationProvider for OpenAiModerationClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, content: &str) -> Result<ProviderReply, ProviderError> {
        let response = self
            .client
            .post(MODERATIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "input": content }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(ProviderError::Api { status, body });
        }

        let body: ModerationsResponse = response.json().await?;
        Self::into_reply(body)
    }
}
