//! LLM collaborator
//!
//! The scraper only needs one operation from a language model: send a system
//! prompt and a user message, get text back. `LlmClient` is that seam;
//! `OpenRouterClient` implements it against an OpenRouter-compatible
//! chat-completions endpoint.
//!
//! Helpers for handling replies live here too, since model output tends to
//! arrive wrapped in code fences or surrounded by prose.

mod openrouter;

pub use openrouter::OpenRouterClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while talking to the LLM endpoint
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("LLM returned no content")]
    EmptyResponse,

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),
}

/// A chat-completion style language model
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends `system` and `user` messages and returns the reply text
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences from a response.
pub fn strip_code_fences(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parses the first JSON object in a model reply
///
/// Code fences are stripped first; if the remainder is not a JSON object, the
/// slice between the first `{` and the last `}` is tried, which covers
/// replies that wrap the object in prose.
pub fn extract_json_object(response: &str) -> Option<serde_json::Value> {
    extract_json_between(response, '{', '}', serde_json::Value::is_object)
}

/// Parses the first JSON array in a model reply, like `extract_json_object`
///
/// An array wrapped in an object (`{"filters": [...]}`) is found through the
/// `[`..`]` slice.
pub fn extract_json_array(response: &str) -> Option<serde_json::Value> {
    extract_json_between(response, '[', ']', serde_json::Value::is_array)
}

fn extract_json_between(
    response: &str,
    open: char,
    close: char,
    is_kind: fn(&serde_json::Value) -> bool,
) -> Option<serde_json::Value> {
    let stripped = strip_code_fences(response);

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(stripped) {
        if is_kind(&value) {
            return Some(value);
        }
    }

    let start = stripped.find(open)?;
    let end = stripped.rfind(close)?;
    if end <= start {
        return None;
    }

    serde_json::from_str(&stripped[start..=end])
        .ok()
        .filter(is_kind)
}
