//! Messaging platform channels (LINE).
//!
//! Webhook payload types, signature verification, and the `ChannelHandle` the dispatcher
//! uses to download content and send replies.

mod handle;
mod line;
pub mod signature;

pub use handle::{ChannelError, ChannelHandle};
pub use line::{EventMessage, LineClient, MediaBlob, WebhookEvent, WebhookPayload};
