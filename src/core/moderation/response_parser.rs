//! Extracting a verdict from a free-text provider reply.
//!
//! The secondary provider is a chat model. We ask it (see [`moderation_prompt`])
//! to answer with a small JSON object, but models often wrap that object in a
//! markdown code fence. Parsing is all-or-nothing: either the whole payload
//! decodes into [`RawVerdict`] or the reply is rejected.

use super::moderation_models::{VerdictCandidate, ViolationCategory};
use serde::Deserialize;
use thiserror::Error;

const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reply contains no decodable verdict payload")]
    UnparsableReply { reply: String },

    #[error("fenced verdict payload is malformed: {source}")]
    MalformedPayload {
        #[source]
        source: serde_json::Error,
        reply: String,
    },
}

impl ParseError {
    /// The original reply text, kept for diagnostics.
    #[allow(dead_code)]
    pub fn reply(&self) -> &str {
        match self {
            ParseError::UnparsableReply { reply } => reply,
            ParseError::MalformedPayload { reply, .. } => reply,
        }
    }
}

/// The verdict fields exactly as the provider was told to emit them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawVerdict {
    pub is_safe: bool,
    pub confidence: f64,
    pub violation_type: ViolationCategory,
    pub reasoning: String,
}

impl RawVerdict {
    pub fn into_candidate(self, provider: &str) -> VerdictCandidate {
        VerdictCandidate {
            is_safe: self.is_safe,
            confidence: self.confidence,
            violation: self.violation_type,
            reasoning: self.reasoning,
            provider: provider.to_string(),
        }
    }
}

/// Parse a provider reply into verdict fields.
///
/// Tries the whole reply as JSON first, then one fenced block: the first one
/// tagged `json`, else the first one holding an object, else the first one.
pub fn parse(text: &str) -> Result<RawVerdict, ParseError> {
    if let Ok(verdict) = serde_json::from_str::<RawVerdict>(text.trim()) {
        return Ok(verdict);
    }

    let Some(block) = fenced_block(text) else {
        return Err(ParseError::UnparsableReply {
            reply: text.to_string(),
        });
    };

    serde_json::from_str(block).map_err(|source| ParseError::MalformedPayload {
        source,
        reply: text.to_string(),
    })
}

/// One ``` region: its info-string tag (possibly empty) and trimmed body.
struct Fence<'a> {
    tag: &'a str,
    body: &'a str,
}

impl<'a> Fence<'a> {
    fn new(interior: &'a str) -> Self {
        let interior = interior.trim_start();
        let tag_len = interior
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(interior.len());
        let (tag, body) = interior.split_at(tag_len);

        // A bare word with no body (```inline```) is content, not a tag.
        if body.trim().is_empty() {
            return Self {
                tag: "",
                body: interior.trim(),
            };
        }

        Self {
            tag,
            body: body.trim(),
        }
    }

    fn is_json(&self) -> bool {
        self.tag.eq_ignore_ascii_case("json")
    }

    fn holds_object(&self) -> bool {
        self.body.starts_with('{')
    }
}

/// Every complete ``` pair in `text`, in order. An unpaired trailing fence
/// is ignored.
fn fences(text: &str) -> Vec<Fence<'_>> {
    let mut found = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };
        found.push(Fence::new(&after_open[..close]));
        rest = &after_open[close + FENCE.len()..];
    }

    found
}

fn fenced_block(text: &str) -> Option<&str> {
    let fences = fences(text);

    fences
        .iter()
        .find(|fence| fence.is_json())
        .or_else(|| fences.iter().find(|fence| fence.holds_object()))
        .or_else(|| fences.first())
        .map(|fence| fence.body)
}

/// Instruction sent to the secondary provider. Documents the reply schema
/// that [`parse`] expects.
pub fn moderation_prompt(content: &str) -> String {
    format!(
        "You are a content moderation system. Analyze the user-submitted text below \
for policy violations.\n\
\n\
Respond with ONLY a JSON object of this exact shape and nothing else:\n\
{{\n\
  \"is_safe\": <true or false>,\n\
  \"confidence\": <number between 0.0 and 1.0>,\n\
  \"violation_type\": \"hate_speech\" | \"violence\" | \"adult_content\" | \"spam\" | \"none\",\n\
  \"reasoning\": \"<one short sentence>\"\n\
}}\n\
\n\
Rules: \"is_safe\" must be true exactly when \"violation_type\" is \"none\". \
Pick the single most severe violation if several apply.\n\
\n\
Text to analyze:\n\
<content>\n\
{content}\n\
</content>"
    )
}
