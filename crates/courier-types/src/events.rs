//! Boundary types exchanged with the chat-transport layer.

use serde::{Deserialize, Serialize};

use crate::models::{ItemContent, ItemKind};
use crate::{MessageId, UserId};

/// New content submitted by a user through the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub sender_id: UserId,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(flatten)]
    pub content: ItemContent,
    /// Batch the content is destined for; `None` stores it standalone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_batch: Option<String>,
}

/// Payload handed to the transport for one outbound send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundContent {
    Text {
        text: String,
    },
    Media {
        kind: ItemKind,
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl OutboundContent {
    pub fn text(text: impl Into<String>) -> Self {
        OutboundContent::Text { text: text.into() }
    }

    /// Render an item's content for delivery, with an optional caption line
    /// prepended to whatever caption the item already carries.
    pub fn from_item(content: &ItemContent, notice: Option<&str>) -> Self {
        let compose = |caption: Option<&str>| -> Option<String> {
            match (notice, caption) {
                (Some(n), Some(c)) => Some(format!("{n}\n\n{c}")),
                (Some(n), None) => Some(n.to_string()),
                (None, Some(c)) => Some(c.to_string()),
                (None, None) => None,
            }
        };
        match content {
            ItemContent::Text { text } => match notice {
                Some(n) => OutboundContent::text(format!("{n}\n\n{text}")),
                None => OutboundContent::text(text.clone()),
            },
            ItemContent::Photo { media_ref, caption } => OutboundContent::Media {
                kind: ItemKind::Photo,
                media_ref: media_ref.clone(),
                caption: compose(caption.as_deref()),
            },
            ItemContent::Video { media_ref, caption } => OutboundContent::Media {
                kind: ItemKind::Video,
                media_ref: media_ref.clone(),
                caption: compose(caption.as_deref()),
            },
            ItemContent::Document {
                media_ref,
                file_name,
                caption,
            } => OutboundContent::Media {
                kind: ItemKind::Document,
                media_ref: media_ref.clone(),
                caption: compose(caption.as_deref().or(file_name.as_deref())),
            },
            ItemContent::Audio { media_ref, title } => OutboundContent::Media {
                kind: ItemKind::Audio,
                media_ref: media_ref.clone(),
                caption: compose(title.as_deref()),
            },
            ItemContent::Voice { media_ref } => OutboundContent::Media {
                kind: ItemKind::Voice,
                media_ref: media_ref.clone(),
                caption: compose(None),
            },
            ItemContent::Sticker { media_ref } => OutboundContent::Media {
                kind: ItemKind::Sticker,
                media_ref: media_ref.clone(),
                // Stickers cannot carry captions; the notice is sent as a
                // separate text message by the fan-out layer.
                caption: None,
            },
            ItemContent::Animation { media_ref, caption } => OutboundContent::Media {
                kind: ItemKind::Animation,
                media_ref: media_ref.clone(),
                caption: compose(caption.as_deref()),
            },
        }
    }
}

/// Acknowledgement returned by the transport for a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: MessageId,
}
