//! Outbound Delivery boundary: the narrow interface to the chat transport.

use async_trait::async_trait;
use thiserror::Error;

use courier_types::{DeliveryReceipt, MessageId, OutboundContent, UserId};

/// Transport-level failure. Always non-fatal to the engine: callers log it
/// and continue with best-effort semantics.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("send to {recipient} failed: {reason}")]
    Send { recipient: UserId, reason: String },

    #[error("delete of message {message_id} failed: {reason}")]
    Delete { message_id: MessageId, reason: String },
}

/// The chat transport as the engine sees it: send content to a recipient,
/// delete a previously sent message. Implemented outside this crate by the
/// messaging SDK glue; implemented inside tests by recording mocks.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        recipient: UserId,
        content: OutboundContent,
    ) -> Result<DeliveryReceipt, DeliveryError>;

    async fn delete(&self, recipient: UserId, message_id: MessageId) -> Result<(), DeliveryError>;
}
