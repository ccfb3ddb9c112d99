// Provider port - the one capability every moderation back-end exposes.
//
// Implementations live in `infra/moderation`. They are built once at startup,
// own their credentials, and never mutate afterwards, so a single instance is
// shared by every concurrent request.

use super::moderation_models::{VerdictCandidate, ViolationCategory};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// A provider call that did not produce a reply.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// REPLIES
// ============================================================================

/// Per-category classification, in the shape moderation endpoints return it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CategoryScores {
    /// Category name -> whether the provider flagged it.
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    /// Category name -> likelihood in [0, 1].
    #[serde(default)]
    pub category_scores: BTreeMap<String, f64>,
}

impl CategoryScores {
    /// Reduce the per-category scores to a single verdict.
    ///
    /// The flagged category with the highest score wins; equal scores fall
    /// back to [`ViolationCategory::priority`]. Flagged names outside our
    /// category set don't count towards the verdict.
    pub fn to_candidate(&self, provider: &str) -> VerdictCandidate {
        let flagged: Vec<(&str, ViolationCategory, f64)> = self
            .categories
            .iter()
            .filter(|(_, flagged)| **flagged)
            .filter_map(|(name, _)| {
                let category = ViolationCategory::from_provider_category(name)?;
                let score = self.category_scores.get(name).copied().unwrap_or(0.0);
                Some((name.as_str(), category, score))
            })
            .collect();

        let selected = flagged.iter().max_by(|a, b| {
            a.2.total_cmp(&b.2)
                .then_with(|| b.1.priority().cmp(&a.1.priority()))
        });

        match selected {
            Some(&(_, violation, score)) => {
                let listed: Vec<String> = flagged
                    .iter()
                    .map(|(name, _, score)| format!("{} ({:.2})", name, score))
                    .collect();

                VerdictCandidate {
                    is_safe: false,
                    confidence: score,
                    violation,
                    reasoning: format!("Flagged categories: {}", listed.join(", ")),
                    provider: provider.to_string(),
                }
            }
            None => {
                let max_score = self
                    .category_scores
                    .values()
                    .copied()
                    .fold(0.0_f64, f64::max);

                VerdictCandidate {
                    is_safe: true,
                    confidence: 1.0 - max_score,
                    violation: ViolationCategory::None,
                    reasoning: format!(
                        "No categories flagged (highest score {:.2})",
                        max_score
                    ),
                    provider: provider.to_string(),
                }
            }
        }
    }
}

/// What a provider hands back before it becomes a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    /// Structured categorized scores (moderation endpoints).
    Scored(CategoryScores),
    /// Free text expected to embed the JSON verdict (chat models).
    Text(String),
}

// ============================================================================
// PROVIDER TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Name recorded as the verdict's provenance.
    fn name(&self) -> &str;

    /// Classify one piece of content. May fail or hang; the caller bounds it.
    async fn classify(&self, content: &str) -> Result<ProviderReply, ProviderError>;
}

// Lets the service hold either a real client or a mock chosen at runtime.
#[async_trait]
impl ModerationProvider for Box<dyn ModerationProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn classify(&self, content: &str) -> Result<ProviderReply, ProviderError> {
        (**self).classify(content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(entries: &[(&str, bool, f64)]) -> CategoryScores {
        CategoryScores {
            categories: entries
                .iter()
                .map(|(name, flagged, _)| (name.to_string(), *flagged))
                .collect(),
            category_scores: entries
                .iter()
                .map(|(name, _, score)| (name.to_string(), *score))
                .collect(),
        }
    }

    #[test]
    fn test_nothing_flagged_is_safe() {
        let candidate = scores(&[
            ("hate", false, 0.05),
            ("violence", false, 0.03),
            ("sexual", false, 0.02),
            ("spam", false, 0.04),
        ])
        .to_candidate("primary");

        assert!(candidate.is_safe);
        assert_eq!(candidate.violation, ViolationCategory::None);
        assert!((candidate.confidence - 0.95).abs() < 1e-9);
        assert_eq!(candidate.provider, "primary");
    }

    #[test]
    fn test_single_flag_uses_its_score() {
        let candidate = scores(&[
            ("hate", true, 0.85),
            ("violence", false, 0.03),
            ("sexual", false, 0.02),
            ("spam", false, 0.04),
        ])
        .to_candidate("primary");

        assert!(!candidate.is_safe);
        assert_eq!(candidate.violation, ViolationCategory::HateSpeech);
        assert_eq!(candidate.confidence, 0.85);
        assert!(candidate.reasoning.contains("hate (0.85)"));
    }

    #[test]
    fn test_highest_flagged_score_wins() {
        let candidate = scores(&[
            ("hate", true, 0.60),
            ("sexual", true, 0.92),
            ("spam", true, 0.65),
        ])
        .to_candidate("primary");

        assert_eq!(candidate.violation, ViolationCategory::AdultContent);
        assert_eq!(candidate.confidence, 0.92);
        assert!(candidate.reasoning.contains("hate (0.60)"));
        assert!(candidate.reasoning.contains("spam (0.65)"));
    }

    #[test]
    fn test_equal_scores_break_by_priority() {
        let candidate = scores(&[
            ("spam", true, 0.7),
            ("violence", true, 0.7),
            ("sexual", true, 0.7),
        ])
        .to_candidate("primary");
        assert_eq!(candidate.violation, ViolationCategory::Violence);

        let candidate = scores(&[("spam", true, 0.7), ("hate", true, 0.7)]).to_candidate("primary");
        assert_eq!(candidate.violation, ViolationCategory::HateSpeech);
    }

    #[test]
    fn test_unknown_flagged_category_is_ignored() {
        let candidate =
            scores(&[("self-harm", true, 0.4), ("hate", false, 0.1)]).to_candidate("primary");

        assert!(candidate.is_safe);
        assert!((candidate.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_scores_are_fully_confident_safe() {
        let candidate = CategoryScores::default().to_candidate("primary");

        assert!(candidate.is_safe);
        assert_eq!(candidate.confidence, 1.0);
    }
}
