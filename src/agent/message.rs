//! Request and response shapes exchanged with a generation backend.
//!
//! An analysis is always a single turn: one instruction message and one
//! topic-plus-evidence message in, one block of text out.

use serde::{Deserialize, Serialize};

/// Who authored a prompt message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Analyst instructions (the loaded analysis prompt).
    System,
    /// Topic, evidence context and depth instruction.
    User,
}

/// One prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// Instruction message.
    #[must_use]
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
        }
    }

    /// Topic message.
    #[must_use]
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }
}

/// What the synthesizer asks a backend to generate.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model id, e.g. `"gpt-4o-mini"`.
    pub model: String,
    /// Instruction first, then the topic message.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature from the depth profile. `None` or zero leaves
    /// the backend default.
    pub temperature: Option<f32>,
    /// Output budget from the depth profile.
    pub max_tokens: Option<u32>,
    /// Ask the backend to constrain output to a JSON object.
    pub json_mode: bool,
}

impl ChatRequest {
    /// Characters across all messages, for logging prompt size.
    #[must_use]
    pub fn prompt_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }
}

/// Token accounting reported by the backend (zero when unreported).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt side.
    pub prompt_tokens: u32,
    /// Generated side.
    pub completion_tokens: u32,
    /// Sum of both.
    pub total_tokens: u32,
}

/// Generated text plus bookkeeping.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Raw model output; may be fenced or wrapped in prose.
    pub content: String,
    /// Tokens spent.
    pub usage: TokenUsage,
    /// Backend stop reason, e.g. `"stop"` or `"length"`.
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Whether generation stopped at the output budget. A truncated analysis
    /// usually carries unbalanced JSON.
    #[must_use]
    pub fn hit_token_limit(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(finish_reason: Option<&str>) -> ChatResponse {
        ChatResponse {
            content: "{}".to_string(),
            usage: TokenUsage::default(),
            finish_reason: finish_reason.map(str::to_string),
        }
    }

    #[test]
    fn test_constructors_set_role() {
        assert_eq!(ChatMessage::system("analyst").role, Role::System);
        assert_eq!(ChatMessage::user("Research Topic: x").role, Role::User);
    }

    #[test]
    fn test_prompt_chars_counts_chars_not_bytes() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage::system("ab"), ChatMessage::user("éé")],
            temperature: None,
            max_tokens: None,
            json_mode: true,
        };
        assert_eq!(request.prompt_chars(), 4);
    }

    #[test]
    fn test_hit_token_limit() {
        assert!(response(Some("length")).hit_token_limit());
        assert!(!response(Some("stop")).hit_token_limit());
        assert!(!response(None).hit_token_limit());
    }

    #[test]
    fn test_role_wire_name() {
        let json = serde_json::to_string(&Role::System).unwrap_or_default();
        assert_eq!(json, "\"system\"");
    }
}
