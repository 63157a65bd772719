//! LINE channel: webhook payload types, content download and reply via the Messaging API.

use crate::channels::handle::{ChannelError, ChannelHandle};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};

const LINE_API_BASE: &str = "https://api.line.me";
const LINE_DATA_API_BASE: &str = "https://api-data.line.me";
const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Webhook POST body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    /// Absent or null means no events. Kept raw so one unreadable event cannot reject the rest.
    #[serde(default)]
    pub events: Option<Vec<serde_json::Value>>,
}

impl WebhookPayload {
    /// Typed events; entries that are not event objects are dropped with a warning.
    pub fn into_events(self) -> Vec<WebhookEvent> {
        self.events
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<WebhookEvent>(raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    log::warn!("skipping unreadable webhook event: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// One event from the webhook `events` array. Only `message` events are acted on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Empty when the event carries no type.
    #[serde(rename = "type", default)]
    pub typ: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_message")]
    pub message: Option<EventMessage>,
}

/// A message object that does not fit any known shape (e.g. no `type`) reads as `Unsupported`.
fn lenient_message<'de, D>(deserializer: D) -> Result<Option<EventMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.map(|v| serde_json::from_value(v).unwrap_or(EventMessage::Unsupported)))
}

impl WebhookEvent {
    pub fn is_message(&self) -> bool {
        self.typ == "message"
    }
}

/// Message object of a `message` event, tagged by its `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventMessage {
    Text {
        #[serde(default)]
        text: String,
    },
    Image {
        /// Message id used to download the content.
        #[serde(default)]
        id: String,
    },
    /// Video, audio, sticker, location, file, ...
    #[serde(other)]
    Unsupported,
}

/// Downloaded media, base64-encoded for inline transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime_type: String,
    /// Standard base64 of the raw bytes.
    pub data: String,
}

impl MediaBlob {
    pub fn from_bytes(bytes: &[u8], content_type: Option<&str>) -> Self {
        Self {
            mime_type: image_mime_type(content_type),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// MIME type for the inline image: the reported Content-Type when it is an image type, else image/jpeg.
fn image_mime_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| ct.starts_with("image/"))
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    typ: &'static str,
    text: &'a str,
}

/// Client for the LINE Messaging API (reply) and content API (downloads).
#[derive(Clone)]
pub struct LineClient {
    id: String,
    access_token: String,
    api_base: String,
    data_api_base: String,
    client: reqwest::Client,
}

impl LineClient {
    pub fn new(
        access_token: String,
        api_base: Option<String>,
        data_api_base: Option<String>,
    ) -> Self {
        let api_base = api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_API_BASE.to_string());
        let data_api_base = data_api_base
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| LINE_DATA_API_BASE.to_string());
        Self {
            id: "line".to_string(),
            access_token,
            api_base,
            data_api_base,
            client: reqwest::Client::new(),
        }
    }

    /// GET /v2/bot/message/{id}/content — raw message content, base64-encoded.
    pub async fn get_content(&self, message_id: &str) -> Result<MediaBlob, ChannelError> {
        let url = format!(
            "{}/v2/bot/message/{}/content",
            self.data_api_base, message_id
        );
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("{} {}", status, body)));
        }
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            return Err(ChannelError::Api("empty content".to_string()));
        }
        Ok(MediaBlob::from_bytes(&bytes, content_type.as_deref()))
    }

    /// POST /v2/bot/message/reply with a single text message.
    pub async fn reply_message(&self, reply_token: &str, text: &str) -> Result<(), ChannelError> {
        let url = format!("{}/v2/bot/message/reply", self.api_base);
        let body = ReplyRequest {
            reply_token,
            messages: vec![TextMessage { typ: "text", text }],
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("reply failed: {} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelHandle for LineClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_content(&self, message_id: &str) -> Option<MediaBlob> {
        match self.get_content(message_id).await {
            Ok(blob) => Some(blob),
            Err(e) => {
                log::warn!("line: downloading content of message {} failed: {}", message_id, e);
                None
            }
        }
    }

    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), ChannelError> {
        self.reply_message(reply_token, text).await
    }
}
