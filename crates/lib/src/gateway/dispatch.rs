//! Event dispatcher: routes each webhook event to a completion and sends the reply.
//!
//! Events are independent. Every event becomes its own future; the request waits for all of
//! them. Within one event the order is download (images only), completion, reply.

use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;

use crate::channels::{ChannelError, ChannelHandle, EventMessage, WebhookEvent};
use crate::llm::Completion;

/// Reply sent when an image could not be downloaded ("could not download the image").
pub const IMAGE_DOWNLOAD_FAILED: &str = "ไม่สามารถดาวน์โหลดรูปภาพได้";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("sending reply failed: {0}")]
    Reply(#[from] ChannelError),
    #[error("malformed message event: {0}")]
    MalformedEvent(&'static str),
}

/// Routes events to the completion backend and replies through the channel.
#[derive(Clone)]
pub struct Dispatcher {
    completion: Arc<dyn Completion>,
    channel: Arc<dyn ChannelHandle>,
}

impl Dispatcher {
    pub fn new(completion: Arc<dyn Completion>, channel: Arc<dyn ChannelHandle>) -> Self {
        Self {
            completion,
            channel,
        }
    }

    /// One pending operation per event; none has started yet.
    pub fn dispatch<'a>(
        &'a self,
        events: &'a [WebhookEvent],
    ) -> Vec<BoxFuture<'a, Result<(), DispatchError>>> {
        events
            .iter()
            .map(|event| self.handle_event(event).boxed())
            .collect()
    }

    /// Run all events concurrently and wait for every one of them.
    /// Returns the first failure, but only after all operations have finished.
    pub async fn run(&self, events: &[WebhookEvent]) -> Result<(), DispatchError> {
        let results = join_all(self.dispatch(events)).await;
        let mut first_err = None;
        for err in results.into_iter().filter_map(Result::err) {
            log::error!("{} event failed: {}", self.channel.id(), err);
            if first_err.is_none() {
                first_err = Some(err);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn handle_event(&self, event: &WebhookEvent) -> Result<(), DispatchError> {
        if !event.is_message() {
            log::debug!("ignoring {} event", event.typ);
            return Ok(());
        }
        let Some(message) = &event.message else {
            return Err(DispatchError::MalformedEvent("no message object"));
        };
        if matches!(message, EventMessage::Unsupported) {
            log::debug!("ignoring unsupported message type");
            return Ok(());
        }
        let Some(reply_token) = event.reply_token.as_deref() else {
            return Err(DispatchError::MalformedEvent("no reply token"));
        };

        let text = match message {
            EventMessage::Text { text } => self.completion.complete_text(text).await.text,
            EventMessage::Image { id } => match self.channel.fetch_content(id).await {
                Some(image) => self.completion.complete_image(&image).await.text,
                None => IMAGE_DOWNLOAD_FAILED.to_string(),
            },
            EventMessage::Unsupported => return Ok(()),
        };

        self.channel.reply_text(reply_token, &text).await?;
        Ok(())
    }
}
