pub mod anthropic_client;
pub mod mock_clients;
pub mod openai_client;

pub use anthropic_client::AnthropicClient;
pub use mock_clients::{MockAnthropicClient, MockOpenAiClient};
pub use openai_client::OpenAiModerationClient;

use crate::core::moderation::ProviderError;

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}
