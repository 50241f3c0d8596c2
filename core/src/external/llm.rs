//! The LLM provider interface: text-in, text-out.

use async_trait::async_trait;

use crate::error::Result;

/// A single chat message in a prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Who produced the message: `"system"`, `"user"`, or `"assistant"`.
    pub role: String,
    /// The message body.
    pub content: String,
}

impl Message {
    /// Builds a user-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Builds a system-role message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Text completion provider. Implementations must tolerate prompts over
/// 8k tokens; the core never truncates on their behalf.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invokes the model with a message list and returns its full response.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::LLMFailure`] if the call fails; the
    /// `stage` field is filled in by the caller, not this method.
    async fn invoke(&self, messages: &[Message]) -> Result<String>;
}
