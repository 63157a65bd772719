//! Channel handle: the platform operations the dispatcher needs (download content, reply).

use async_trait::async_trait;

use crate::channels::line::MediaBlob;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("channel api error: {0}")]
    Api(String),
}

/// Handle to a messaging platform, shared by every in-flight event.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "line").
    fn id(&self) -> &str;

    /// Download the binary content of a message. `None` on any failure; the caller decides what the user sees.
    async fn fetch_content(&self, message_id: &str) -> Option<MediaBlob>;

    /// Send one text reply addressed by a single-use reply token.
    async fn reply_text(&self, reply_token: &str, text: &str) -> Result<(), ChannelError>;
}
