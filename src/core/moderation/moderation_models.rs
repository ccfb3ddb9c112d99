// Moderation domain models - requests, verdicts and the checks that guard them.
//
// These are pure domain types with no HTTP dependencies.
// Both constructors here are the only way to obtain a request or a verdict,
// so anything that reaches a provider or leaves the pipeline has been checked.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// Malformed input, either from the caller or from a provider's verdict.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("content must not be empty or whitespace")]
    EmptyContent,

    #[error("creator_id must not be empty or whitespace")]
    EmptyCreatorId,

    #[error("inconsistent verdict: is_safe={is_safe} but violation_type={violation}")]
    InconsistentVerdict {
        is_safe: bool,
        violation: ViolationCategory,
    },

    #[error("confidence {0} is outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),
}

// ============================================================================
// VIOLATION CATEGORIES
// ============================================================================

/// The kind of policy violation a verdict reports. Exactly one applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCategory {
    None,
    HateSpeech,
    Violence,
    AdultContent,
    Spam,
}

impl ViolationCategory {
    /// Map a primary-provider category name onto our closed set.
    ///
    /// Returns `None` for names we don't moderate on (e.g. "self-harm").
    pub fn from_provider_category(name: &str) -> Option<Self> {
        match name {
            "hate" => Some(Self::HateSpeech),
            "violence" => Some(Self::Violence),
            "sexual" => Some(Self::AdultContent),
            "spam" => Some(Self::Spam),
            _ => None,
        }
    }

    /// Tie-break rank when two flagged categories score the same.
    /// Lower wins. Provisional ordering pending product input.
    pub fn priority(self) -> u8 {
        match self {
            Self::HateSpeech => 0,
            Self::Violence => 1,
            Self::AdultContent => 2,
            Self::Spam => 3,
            Self::None => u8::MAX,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::HateSpeech => "hate_speech",
            Self::Violence => "violence",
            Self::AdultContent => "adult_content",
            Self::Spam => "spam",
        }
    }
}

impl std::fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// Wire shape of an inbound request, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ModerationRequestPayload {
    pub content: String,
    pub creator_id: String,
    #[serde(default)]
    pub video_id: Option<String>,
}

/// A validated moderation request.
///
/// `content` is trimmed and both `content` and `creator_id` are guaranteed
/// non-empty. Build one with [`ModerationRequest::new`] or from a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationRequest {
    content: String,
    creator_id: String,
    video_id: Option<String>,
}

impl ModerationRequest {
    pub fn new(
        content: impl Into<String>,
        creator_id: impl Into<String>,
        video_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let content: String = content.into();
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        let creator_id: String = creator_id.into();
        let creator_id = creator_id.trim();
        if creator_id.is_empty() {
            return Err(ValidationError::EmptyCreatorId);
        }

        Ok(Self {
            content: content.to_string(),
            creator_id: creator_id.to_string(),
            video_id,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }
}

impl TryFrom<ModerationRequestPayload> for ModerationRequest {
    type Error = ValidationError;

    fn try_from(payload: ModerationRequestPayload) -> Result<Self, Self::Error> {
        Self::new(payload.content, payload.creator_id, payload.video_id)
    }
}

// ============================================================================
// VERDICT
// ============================================================================

/// An unchecked verdict as produced by a provider adapter or the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictCandidate {
    pub is_safe: bool,
    pub confidence: f64,
    pub violation: ViolationCategory,
    pub reasoning: String,
    pub provider: String,
}

/// A verdict that passed the consistency checks. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModerationResult {
    is_safe: bool,
    confidence: f64,
    #[serde(rename = "violation_type")]
    violation: ViolationCategory,
    reasoning: String,
    provider: String,
}

impl ModerationResult {
    pub fn is_safe(&self) -> bool {
        self.is_safe
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn violation(&self) -> ViolationCategory {
        self.violation
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }
}

impl TryFrom<VerdictCandidate> for ModerationResult {
    type Error = ValidationError;

    fn try_from(candidate: VerdictCandidate) -> Result<Self, Self::Error> {
        if candidate.is_safe != (candidate.violation == ViolationCategory::None) {
            return Err(ValidationError::InconsistentVerdict {
                is_safe: candidate.is_safe,
                violation: candidate.violation,
            });
        }

        // NaN fails `contains` too.
        if !(0.0..=1.0).contains(&candidate.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(candidate.confidence));
        }

        Ok(Self {
            is_safe: candidate.is_safe,
            confidence: candidate.confidence,
            violation: candidate.violation,
            reasoning: candidate.reasoning,
            provider: candidate.provider,
        })
    }
}

/// What the boundary hands back to the caller for one request.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationResponse {
    pub video_id: Option<String>,
    pub moderation: ModerationResult,
    pub processing_time_ms: f64,
}

// ============================================================================
// CONFIG
// ============================================================================

/// Tunables for the fallback pipeline.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Deadline applied to each provider call separately.
    pub timeout: Duration,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(is_safe: bool, confidence: f64, violation: ViolationCategory) -> VerdictCandidate {
        VerdictCandidate {
            is_safe,
            confidence,
            violation,
            reasoning: "test".to_string(),
            provider: "primary".to_string(),
        }
    }

    #[test]
    fn test_request_rejects_blank_content() {
        for content in ["", "   ", "\n\t  "] {
            assert_eq!(
                ModerationRequest::new(content, "creator-1", None),
                Err(ValidationError::EmptyContent)
            );
        }
    }

    #[test]
    fn test_request_rejects_blank_creator_id() {
        assert_eq!(
            ModerationRequest::new("hello", "  ", None),
            Err(ValidationError::EmptyCreatorId)
        );
        assert_eq!(
            ModerationRequest::new("hello", "", None),
            Err(ValidationError::EmptyCreatorId)
        );
    }

    #[test]
    fn test_request_trims_content() {
        let request =
            ModerationRequest::new("  Check out my video!  ", " creator-1 ", Some("v1".into()))
                .unwrap();

        assert_eq!(request.content(), "Check out my video!");
        assert_eq!(request.creator_id(), "creator-1");
        assert_eq!(request.video_id(), Some("v1"));
    }

    #[test]
    fn test_request_from_payload() {
        let payload: ModerationRequestPayload =
            serde_json::from_str(r#"{"content":" hi ","creator_id":"c1"}"#).unwrap();
        let ok = ModerationRequest::try_from(payload).unwrap();
        assert_eq!(ok.content(), "hi");
        assert_eq!(ok.video_id(), None);

        let payload: ModerationRequestPayload =
            serde_json::from_str(r#"{"content":"  ","creator_id":"c1","video_id":"v9"}"#)
                .unwrap();
        assert_eq!(
            ModerationRequest::try_from(payload),
            Err(ValidationError::EmptyContent)
        );

        // Missing field is a wire error before validation runs.
        assert!(serde_json::from_str::<ModerationRequestPayload>(r#"{"content":"hi"}"#).is_err());
    }

    #[test]
    fn test_result_accepts_consistent_verdicts() {
        let safe = ModerationResult::try_from(candidate(true, 0.95, ViolationCategory::None)).unwrap();
        assert!(safe.is_safe());
        assert_eq!(safe.violation(), ViolationCategory::None);

        let unsafe_ =
            ModerationResult::try_from(candidate(false, 0.85, ViolationCategory::HateSpeech))
                .unwrap();
        assert!(!unsafe_.is_safe());
        assert_eq!(unsafe_.confidence(), 0.85);
        assert_eq!(unsafe_.reasoning(), "test");
        assert_eq!(unsafe_.provider(), "primary");
    }

    #[test]
    fn test_result_rejects_inconsistent_verdicts() {
        assert!(matches!(
            ModerationResult::try_from(candidate(true, 0.9, ViolationCategory::Spam)),
            Err(ValidationError::InconsistentVerdict { .. })
        ));
        assert!(matches!(
            ModerationResult::try_from(candidate(false, 0.9, ViolationCategory::None)),
            Err(ValidationError::InconsistentVerdict { .. })
        ));
    }

    #[test]
    fn test_result_rejects_confidence_out_of_range() {
        for confidence in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ModerationResult::try_from(candidate(true, confidence, ViolationCategory::None)),
                Err(ValidationError::ConfidenceOutOfRange(_))
            ));
        }

        // Bounds are inclusive.
        assert!(ModerationResult::try_from(candidate(true, 0.0, ViolationCategory::None)).is_ok());
        assert!(ModerationResult::try_from(candidate(true, 1.0, ViolationCategory::None)).is_ok());
    }

    #[test]
    fn test_result_serializes_wire_names() {
        let result =
            ModerationResult::try_from(candidate(false, 0.5, ViolationCategory::AdultContent))
                .unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["violation_type"], "adult_content");
        assert_eq!(json["is_safe"], false);
        assert_eq!(json["provider"], "primary");
    }

    #[test]
    fn test_provider_category_mapping() {
        assert_eq!(
            ViolationCategory::from_provider_category("hate"),
            Some(ViolationCategory::HateSpeech)
        );
        assert_eq!(
            ViolationCategory::from_provider_category("sexual"),
            Some(ViolationCategory::AdultContent)
        );
        assert_eq!(ViolationCategory::from_provider_category("self-harm"), None);
    }
}
