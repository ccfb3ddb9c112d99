// This is the entry point of the moderation service.
//
// **Architecture Overview:**
// - `core/` = Business logic (validation, fallback pipeline, parsing)
// - `infra/` = Implementations of core traits (provider clients, mocks)
//
// This file's job is to:
// 1. Load configuration
// 2. Build the two providers and the service (dependency injection)
// 3. Serve requests: one JSON request per stdin line, one JSON reply per stdout line

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::moderation::{
    ModerationConfig, ModerationError, ModerationProvider, ModerationRequestPayload,
    ModerationService,
};
use crate::infra::moderation::{
    AnthropicClient, MockAnthropicClient, MockOpenAiClient, OpenAiModerationClient,
};
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

type Service = ModerationService<Box<dyn ModerationProvider>, Box<dyn ModerationProvider>>;

/// Drop unset or whitespace-only values.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Provider credentials and model choice, as read at startup.
#[derive(Debug, Default)]
struct ProviderSettings {
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    anthropic_model: Option<String>,
}

impl ProviderSettings {
    fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            anthropic_model: std::env::var("ANTHROPIC_MODEL").ok(),
        }
    }
}

fn config_from_env() -> ModerationConfig {
    timeout_config(std::env::var("MODERATION_TIMEOUT_SECONDS").ok().as_deref())
}

/// Per-provider deadline from the raw `MODERATION_TIMEOUT_SECONDS` value.
///
/// Anything that is not a positive number representable as a `Duration`
/// is ignored with a warning.
fn timeout_config(raw: Option<&str>) -> ModerationConfig {
    let Some(raw) = raw else {
        return ModerationConfig::default();
    };

    let timeout = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

    match timeout {
        Some(timeout) => ModerationConfig { timeout },
        None => {
            tracing::warn!(
                value = %raw,
                "Ignoring invalid MODERATION_TIMEOUT_SECONDS, using default"
            );
            ModerationConfig::default()
        }
    }
}

fn anthropic_model(raw: Option<String>) -> String {
    non_blank(raw).unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string())
}

fn build_service(settings: ProviderSettings, config: ModerationConfig) -> Service {
    let primary: Box<dyn ModerationProvider> = match non_blank(settings.openai_api_key) {
        Some(key) => Box::new(OpenAiModerationClient::new(key)),
        None => {
            tracing::warn!("OPENAI_API_KEY not set, using mock primary provider");
            Box::new(MockOpenAiClient)
        }
    };

    let secondary: Box<dyn ModerationProvider> = match non_blank(settings.anthropic_api_key) {
        Some(key) => Box::new(AnthropicClient::new(
            key,
            anthropic_model(settings.anthropic_model),
        )),
        None => {
            tracing::warn!("ANTHROPIC_API_KEY not set, using mock secondary provider");
            Box::new(MockAnthropicClient)
        }
    };

    ModerationService::new(primary, secondary, config)
}

fn error_line(status: u16, detail: String) -> String {
    json!({ "status": status, "error": detail }).to_string()
}

/// Turn one request line into one reply line.
///
/// Malformed JSON and invalid requests are client errors (400); a total
/// provider failure is a service error (500).
async fn handle_line(service: &Service, line: &str) -> String {
    let payload = match serde_json::from_str::<ModerationRequestPayload>(line) {
        Ok(payload) => payload,
        Err(e) => return error_line(400, format!("Malformed request: {}", e)),
    };

    match service.moderate_payload(payload).await {
        Ok(response) => serde_json::to_string(&response)
            .unwrap_or_else(|e| error_line(500, format!("Failed to encode response: {}", e))),
        Err(ModerationError::Validation(e)) => error_line(400, e.to_string()),
        Err(e @ ModerationError::AllProvidersFailed { .. }) => {
            error_line(500, format!("Moderation failed: {}", e))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is reserved for replies.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = config_from_env();
    let timeout = config.timeout;
    let service = build_service(ProviderSettings::from_env(), config);

    tracing::info!(
        providers = ?service.provider_names(),
        ?timeout,
        "Moderation service initialized"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = handle_line(&service, &line).await;
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    tracing::info!("Input closed, shutting down moderation service");
    Ok(())
}
