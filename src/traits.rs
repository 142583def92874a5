//! Core traits for JSON-RPC handlers.

use crate::contract::ContractRegistry;
use crate::types::{Message, Response};

/// Error type for application bugs escaping a handler.
///
/// This is not a protocol channel: the dispatcher never converts these
/// into JSON-RPC errors, it propagates them so the host can apply its
/// generic fault behavior (typically HTTP 500).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Capability consumed by the dispatcher: a contract map plus one async
/// entry point per validated message.
///
/// `handle` returns `Ok(None)` when the handler produces no response.
/// The dispatcher owns the notification rules - a response returned for
/// a notification is discarded, a missing response for a request is
/// passed through as silence (and logged as an anomaly).
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    /// Contract map that drives deserialization for this handler
    fn contracts(&self) -> &ContractRegistry;

    /// Handle one validated request or notification
    async fn handle(&self, message: Message) -> Result<Option<Response>, HandlerError>;
}
