//! Gemini generateContent client (https://generativelanguage.googleapis.com/v1beta by default).
//! The API key travels as the `key` query parameter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::channels::MediaBlob;
use crate::llm::{AiReply, Completion};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Instruction sent ahead of an inline image ("please analyze this image").
pub const IMAGE_PROMPT: &str = "โปรดวิเคราะห์รูปภาพนี้";
/// Text completion came back without usable content.
pub const TEXT_REPLY_NO_ANSWER: &str = "ขออภัย ฉันไม่สามารถตอบคำถามนี้ได้";
/// Text completion request failed.
pub const TEXT_REPLY_ERROR: &str = "ขออภัย มีข้อผิดพลาด กรุณาลองใหม่อีกครั้ง";
/// Image completion came back without usable content.
pub const IMAGE_REPLY_NO_ANSWER: &str = "ขออภัย ฉันไม่สามารถวิเคราะห์ภาพนี้ได้";
/// Image completion request failed.
pub const IMAGE_REPLY_ERROR: &str = "ขออภัย ฉันไม่สามารถวิเคราะห์ภาพนี้ได้ในขณะนี้";

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("gemini request failed: {0}")]
    Request(reqwest::Error),
    #[error("gemini api error: {0}")]
    Api(String),
    #[error("gemini returned no content")]
    Empty,
}

impl From<reqwest::Error> for GeminiError {
    // The request URL carries the API key; keep it out of error messages.
    fn from(e: reqwest::Error) -> Self {
        GeminiError::Request(e.without_url())
    }
}

/// One entry of `contents`.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn inline_image(image: &MediaBlob) -> Self {
        Self {
            parts: vec![Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 of the raw bytes.
    pub data: String,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`, if present and non-empty.
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .as_deref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .as_deref()?
            .first()?
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

/// Client for the Gemini generateContent API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self {
            base_url,
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST /models/{model}:generateContent — returns the first candidate's first text part.
    pub async fn generate_content(&self, contents: Vec<Content>) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest { contents };
        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GeminiError::Api(format!("{} {}", status, body)));
        }
        let data: GenerateContentResponse = res.json().await?;
        data.first_text()
            .map(str::to_string)
            .ok_or(GeminiError::Empty)
    }
}

/// Map a completion outcome to user-facing text: the reply itself, or one of two fallbacks.
fn reply_or_fallback(
    kind: &str,
    result: Result<String, GeminiError>,
    no_answer: &str,
    error: &str,
) -> AiReply {
    match result {
        Ok(text) => AiReply::new(text),
        Err(GeminiError::Empty) => {
            log::warn!("gemini ({}): response had no text content", kind);
            AiReply::new(no_answer)
        }
        Err(e) => {
            log::warn!("gemini ({}): {}", kind, e);
            AiReply::new(error)
        }
    }
}

#[async_trait]
impl Completion for GeminiClient {
    async fn complete_text(&self, message: &str) -> AiReply {
        let result = self.generate_content(vec![Content::text(message)]).await;
        reply_or_fallback("text", result, TEXT_REPLY_NO_ANSWER, TEXT_REPLY_ERROR)
    }

    async fn complete_image(&self, image: &MediaBlob) -> AiReply {
        let contents = vec![Content::text(IMAGE_PROMPT), Content::inline_image(image)];
        let result = self.generate_content(contents).await;
        reply_or_fallback("image", result, IMAGE_REPLY_NO_ANSWER, IMAGE_REPLY_ERROR)
    }
}
