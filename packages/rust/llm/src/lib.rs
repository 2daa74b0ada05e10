//! Generative-text capability for dbbuilder.
//!
//! The pipeline only depends on the [`TextGenerator`] trait: send a
//! conversation, get raw text back. [`ChatClient`] implements it against any
//! OpenAI-compatible `chat/completions` endpoint. Model output is never
//! evaluated; [`parse_list`] reads it with an explicit grammar.

mod client;
mod parser;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dbbuilder_shared::Result;

pub use client::ChatClient;
pub use parser::{extract_https_url, parse_list};

// ---------------------------------------------------------------------------
// Conversation types
// ---------------------------------------------------------------------------

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of the structured context sent to the generative service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// A generative-text service.
///
/// Implementations report quota exhaustion as `DbBuilderError::RateLimited`
/// and timeouts/5xx as `DbBuilderError::Transient` so the retry layer can
/// tell them apart from fatal failures.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete the conversation and return the raw response text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_serializes_role_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn chat_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);
    }
}
