// Moderation service - the fallback pipeline.
//
// This service handles:
// - Validating the inbound request before any provider is contacted
// - Calling the primary provider under a hard deadline
// - Falling back to the secondary provider on any primary failure
// - Parsing free-text replies and checking every verdict before it leaves
//
// NO HTTP dependencies here - providers come in through `ModerationProvider`.

use super::moderation_models::{
    ModerationConfig, ModerationRequest, ModerationRequestPayload, ModerationResponse,
    ModerationResult, ValidationError,
};
use super::moderation_provider::{ModerationProvider, ProviderError, ProviderReply};
use super::response_parser::{self, ParseError};
use std::time::{Duration, Instant};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Why a single provider attempt produced no usable verdict.
#[derive(Debug, Error)]
pub enum ProviderFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("verdict rejected: {0}")]
    Rejected(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("all providers failed (primary: {primary}; secondary: {secondary})")]
    AllProvidersFailed {
        primary: ProviderFailure,
        secondary: ProviderFailure,
    },
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Moderates content against a primary provider with a secondary fallback.
///
/// Providers are called one at a time: the secondary only runs once the
/// primary has definitively failed. There is no retry on the same provider.
pub struct ModerationService<P: ModerationProvider, S: ModerationProvider> {
    primary: P,
    secondary: S,
    config: ModerationConfig,
}

impl<P: ModerationProvider, S: ModerationProvider> ModerationService<P, S> {
    pub fn new(primary: P, secondary: S, config: ModerationConfig) -> Self {
        Self {
            primary,
            secondary,
            config,
        }
    }

    /// Provider names in fallback order.
    pub fn provider_names(&self) -> [&str; 2] {
        [self.primary.name(), self.secondary.name()]
    }

    /// Validate a wire payload, then moderate it.
    pub async fn moderate_payload(
        &self,
        payload: ModerationRequestPayload,
    ) -> Result<ModerationResponse, ModerationError> {
        let request = ModerationRequest::try_from(payload)?;
        self.moderate(request).await
    }

    /// Moderate a request and report how long it took.
    pub async fn moderate(
        &self,
        request: ModerationRequest,
    ) -> Result<ModerationResponse, ModerationError> {
        let started = Instant::now();
        let moderation = self.moderate_content(&request).await?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            creator_id = request.creator_id(),
            provider = moderation.provider(),
            is_safe = moderation.is_safe(),
            violation = %moderation.violation(),
            reasoning = moderation.reasoning(),
            elapsed_ms,
            "Content moderated"
        );

        Ok(ModerationResponse {
            video_id: request.video_id().map(str::to_string),
            moderation,
            processing_time_ms: (elapsed_ms * 100.0).round() / 100.0,
        })
    }

    /// Run the fallback chain for one request.
    ///
    /// # Returns
    /// The first verdict that passes validation, or `AllProvidersFailed`
    /// carrying both causes. A default verdict is never made up.
    pub async fn moderate_content(
        &self,
        request: &ModerationRequest,
    ) -> Result<ModerationResult, ModerationError> {
        let primary = match self.attempt(&self.primary, request.content()).await {
            Ok(result) => return Ok(result),
            Err(failure) => failure,
        };

        tracing::warn!(
            provider = self.primary.name(),
            fallback = self.secondary.name(),
            creator_id = request.creator_id(),
            error = %primary,
            "Primary moderation provider failed, falling back"
        );

        match self.attempt(&self.secondary, request.content()).await {
            Ok(result) => Ok(result),
            Err(secondary) => {
                tracing::error!(
                    creator_id = request.creator_id(),
                    primary_error = %primary,
                    secondary_error = %secondary,
                    "All moderation providers failed"
                );
                Err(ModerationError::AllProvidersFailed { primary, secondary })
            }
        }
    }

    /// One bounded call to one provider, through to a checked verdict.
    ///
    /// On timeout the provider future is dropped; whatever it would have
    /// returned later is discarded.
    async fn attempt<T: ModerationProvider>(
        &self,
        provider: &T,
        content: &str,
    ) -> Result<ModerationResult, ProviderFailure> {
        let reply = tokio::time::timeout(self.config.timeout, provider.classify(content))
            .await
            .map_err(|_| ProviderFailure::Timeout(self.config.timeout))??;

        let candidate = match reply {
            ProviderReply::Scored(scores) => scores.to_candidate(provider.name()),
            ProviderReply::Text(text) => {
                response_parser::parse(&text)?.into_candidate(provider.name())
            }
        };

        Ok(ModerationResult::try_from(candidate)?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
