// Keyword-based stand-ins for the two providers.
//
// Used when credentials are missing so the service still starts in local
// development. Never rely on these outside of that.

use crate::core::moderation::{CategoryScores, ModerationProvider, ProviderError, ProviderReply};
use async_trait::async_trait;
use serde_json::json;

/// (provider category, trigger keywords, score when triggered, score otherwise)
const KEYWORD_RULES: [(&str, &[&str], f64, f64); 4] = [
    ("hate", &["hate"], 0.85, 0.05),
    ("violence", &["violence", "attack"], 0.78, 0.03),
    ("sexual", &["nsfw", "adult"], 0.92, 0.02),
    ("spam", &["spam"], 0.65, 0.04),
];

fn triggered(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Mimics the OpenAI moderation endpoint.
pub struct MockOpenAiClient;

#[async_trait]
impl ModerationProvider for MockOpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, content: &str) -> Result<ProviderReply, ProviderError> {
        let text = content.to_lowercase();
        let mut scores = CategoryScores::default();

        for (category, keywords, hit, miss) in KEYWORD_RULES {
            let flagged = triggered(&text, keywords);
            scores.categories.insert(category.to_string(), flagged);
            scores
                .category_scores
                .insert(category.to_string(), if flagged { hit } else { miss });
        }

        Ok(ProviderReply::Scored(scores))
    }
}

/// Mimics a Claude reply that follows the verdict schema.
pub struct MockAnthropicClient;

#[async_trait]
impl ModerationProvider for MockAnthropicClient {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn classify(&self, content: &str) -> Result<ProviderReply, ProviderError> {
        let text = content.to_lowercase();

        // First matching rule wins, in rule order.
        let violation = KEYWORD_RULES
            .iter()
            .find(|(_, keywords, _, _)| triggered(&text, keywords))
            .map(|(category, _, _, _)| match *category {
                "hate" => "hate_speech",
                "violence" => "violence",
                "sexual" => "adult_content",
                _ => "spam",
            })
            .unwrap_or("none");
        let is_safe = violation == "none";
        let (confidence, finding) = if is_safe {
            (0.95, "No violations found.")
        } else {
            (0.75, "Potential violation detected.")
        };

        let reply = json!({
            "is_safe": is_safe,
            "confidence": confidence,
            "violation_type": violation,
            "reasoning": format!("Content analyzed for policy violations. {}", finding),
        });

        Ok(ProviderReply::Text(reply.to_string()))
    }
}
