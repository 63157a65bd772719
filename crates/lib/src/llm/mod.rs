//! Completion abstraction and Gemini client.
//!
//! Completions never fail from the caller's point of view: upstream problems are turned into
//! fixed user-facing fallback text inside the client.

mod gemini;

use async_trait::async_trait;

use crate::channels::MediaBlob;

pub use gemini::{
    Content, GeminiClient, GeminiError, InlineData, Part, IMAGE_PROMPT, IMAGE_REPLY_ERROR,
    IMAGE_REPLY_NO_ANSWER, TEXT_REPLY_ERROR, TEXT_REPLY_NO_ANSWER,
};

/// Reply text produced for the user. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiReply {
    pub text: String,
}

impl AiReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Single-turn completion backend.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete a user text message.
    async fn complete_text(&self, message: &str) -> AiReply;

    /// Describe an image.
    async fn complete_image(&self, image: &MediaBlob) -> AiReply;
}
