//! Large-language-model client abstraction.
//!
//! The engine depends only on [`LlmClient`]; [`anthropic::AnthropicClient`]
//! is the reference implementation used in production and wired through
//! tests via a scriptable mock.

pub mod anthropic;

use async_trait::async_trait;

use crate::error::Result;

/// A thread-safe client capable of generating text from a prompt against
/// a configurable model id. Implementations are assumed to apply their
/// own internal rate limiting; the engine does not pool connections
/// beyond what the client exposes.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate raw text from `prompt` using `model`.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String>;
}

/// Strip optional fenced-code markers (``` or ```json) from `text`,
/// trimming surrounding whitespace. Idempotent: re-stripping an already
/// stripped, well-formed payload returns it unchanged.
pub fn strip_markdown_fences(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() >= 6 {
        if let Some(first_newline) = trimmed.find('\n') {
            let header = &trimmed[..first_newline];
            if header.starts_with("```") {
                let body_start = first_newline + 1;
                let body_end = trimmed.len() - 3;
                if body_start < body_end {
                    return trimmed[body_start..body_end].trim().to_string();
                }
            }
        }
        return trimmed[3..trimmed.len() - 3].trim().to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_markdown_fences_json_fence() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_markdown_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_markdown_fences_bare_fence() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_markdown_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_markdown_fences_no_fence_is_noop() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_strip_markdown_fences_is_idempotent() {
        let once = strip_markdown_fences("```json\n{\"a\":1}\n```");
        let twice = strip_markdown_fences(&once);
        assert_eq!(once, twice);
    }
}
