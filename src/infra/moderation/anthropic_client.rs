use crate::core::moderation::response_parser::moderation_prompt;
use crate::core::moderation::{ModerationProvider, ProviderError, ProviderReply};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// One block of the reply. Non-text blocks have no `text`.
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Secondary provider: a Claude model told to answer in our verdict schema.
///
/// Returns the model's raw text; the service parses it.
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    fn build_request<'a>(&'a self, content: &str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content: moderation_prompt(content),
            }],
        }
    }

    fn into_reply(body: MessagesResponse) -> Result<ProviderReply, ProviderError> {
        body.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .map(ProviderReply::Text)
            .ok_or_else(|| ProviderError::InvalidResponse("no text content block".to_string()))
    }
}

#[async_trait]
impl ModerationProvider for AnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn classify(&self, content: &str) -> Result<ProviderReply, ProviderError> {
        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", API_VERSION)
            .json(&self.build_request(content))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(ProviderError::Api { status, body });
        }

        let body: MessagesResponse = response.json().await?;
        Self::into_reply(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicClient {
        AnthropicClient::new("test-key".to_string(), "claude-3-5-sonnet-20241022".to_string())
    }

    #[test]
    fn test_request_serialization() {
        let client = client();
        let json = serde_json::to_value(client.build_request("Check out my video!")).unwrap();

        assert_eq!(json["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(json["max_tokens"], 1000);
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("Check out my video!"));
    }

    #[test]
    fn test_first_text_block_is_the_reply() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{
                "role": "assistant",
                "content": [
                    {"type": "thinking", "thinking": "..."},
                    {"type": "text", "text": "{\"is_safe\": true}"}
                ]
            }"#,
        )
        .unwrap();

        let reply = AnthropicClient::into_reply(body).unwrap();

        assert_eq!(reply, ProviderReply::Text("{\"is_safe\": true}".to_string()));
    }

    #[test]
    fn test_reply_without_text_is_invalid() {
        let body: MessagesResponse = serde_json::from_str(r#"{"content": []}"#).unwrap();

        assert!(matches!(
            AnthropicClient::into_reply(body),
            Err(ProviderError::InvalidResponse(_))
        ));
    }
}
