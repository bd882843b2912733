//! Shared data model for the Courier content-distribution engine.
//!
//! Canonical definitions of stored entities (items, batches, stats,
//! profiles), the boundary event types exchanged with the chat transport,
//! and the share-token codec. Everything here is plain data: behavior lives
//! in `courier-store` and `courier-engine`.

pub mod events;
pub mod models;
pub mod share;

pub use events::{DeliveryReceipt, InboundEvent, OutboundContent};
pub use models::{
    Batch, ItemContent, ItemKind, KindCounts, ShareGrant, StoredItem, UsageStats, UserProfile,
};
pub use share::ShareToken;

/// Identity of a user on the chat transport.
pub type UserId = i64;

/// Identifier of a message delivered through the transport.
pub type MessageId = i64;
