//! Gateway: the LINE webhook HTTP endpoint.
//!
//! Single port. `POST /webhook` verifies the signature, parses the events and fans them out
//! to the dispatcher; the response status reflects whether every reply was sent.

mod dispatch;
mod server;

pub use dispatch::{DispatchError, Dispatcher, IMAGE_DOWNLOAD_FAILED};
pub use server::{router, run_gateway, GatewayState, WEBHOOK_PATH};
