use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Kind tag for a stored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Sticker,
    Animation,
}

impl ItemKind {
    pub const ALL: [ItemKind; 8] = [
        ItemKind::Text,
        ItemKind::Photo,
        ItemKind::Video,
        ItemKind::Document,
        ItemKind::Audio,
        ItemKind::Voice,
        ItemKind::Sticker,
        ItemKind::Animation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Text => "text",
            ItemKind::Photo => "photo",
            ItemKind::Video => "video",
            ItemKind::Document => "document",
            ItemKind::Audio => "audio",
            ItemKind::Voice => "voice",
            ItemKind::Sticker => "sticker",
            ItemKind::Animation => "animation",
        }
    }
}

/// Kind-specific payload of an item. Exactly one variant is ever set, and
/// every non-text variant carries a mandatory `media_ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemContent {
    Text {
        text: String,
    },
    Photo {
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Video {
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Document {
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Audio {
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Voice {
        media_ref: String,
    },
    Sticker {
        media_ref: String,
    },
    Animation {
        media_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl ItemContent {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemContent::Text { .. } => ItemKind::Text,
            ItemContent::Photo { .. } => ItemKind::Photo,
            ItemContent::Video { .. } => ItemKind::Video,
            ItemContent::Document { .. } => ItemKind::Document,
            ItemContent::Audio { .. } => ItemKind::Audio,
            ItemContent::Voice { .. } => ItemKind::Voice,
            ItemContent::Sticker { .. } => ItemKind::Sticker,
            ItemContent::Animation { .. } => ItemKind::Animation,
        }
    }

    /// Short human preview used in listings and search results.
    pub fn preview(&self, max: usize) -> String {
        let text = match self {
            ItemContent::Text { text } => text.as_str(),
            ItemContent::Photo { caption, .. }
            | ItemContent::Video { caption, .. }
            | ItemContent::Animation { caption, .. } => caption.as_deref().unwrap_or(""),
            ItemContent::Document {
                file_name, caption, ..
            } => file_name
                .as_deref()
                .or(caption.as_deref())
                .unwrap_or(""),
            ItemContent::Audio { title, .. } => title.as_deref().unwrap_or(""),
            ItemContent::Voice { .. } | ItemContent::Sticker { .. } => "",
        };
        if text.is_empty() {
            format!("[{}]", self.kind().as_str().to_uppercase())
        } else {
            text.chars().take(max).collect()
        }
    }
}

/// One unit of stored content. Created once on ingestion, never mutated,
/// removed only when its owning batch is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub key: String,
    pub owner_id: UserId,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
    /// Canonical batch name for batch-scoped items, `None` for standalone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(flatten)]
    pub content: ItemContent,
}

/// Denormalized per-kind counters, one slot per [`ItemKind`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindCounts {
    #[serde(default)]
    pub text: u64,
    #[serde(default)]
    pub photo: u64,
    #[serde(default)]
    pub video: u64,
    #[serde(default)]
    pub document: u64,
    #[serde(default)]
    pub audio: u64,
    #[serde(default)]
    pub voice: u64,
    #[serde(default)]
    pub sticker: u64,
    #[serde(default)]
    pub animation: u64,
}

impl KindCounts {
    pub fn bump(&mut self, kind: ItemKind) {
        *self.slot(kind) += 1;
    }

    pub fn get(&self, kind: ItemKind) -> u64 {
        match kind {
            ItemKind::Text => self.text,
            ItemKind::Photo => self.photo,
            ItemKind::Video => self.video,
            ItemKind::Document => self.document,
            ItemKind::Audio => self.audio,
            ItemKind::Voice => self.voice,
            ItemKind::Sticker => self.sticker,
            ItemKind::Animation => self.animation,
        }
    }

    fn slot(&mut self, kind: ItemKind) -> &mut u64 {
        match kind {
            ItemKind::Text => &mut self.text,
            ItemKind::Photo => &mut self.photo,
            ItemKind::Video => &mut self.video,
            ItemKind::Document => &mut self.document,
            ItemKind::Audio => &mut self.audio,
            ItemKind::Voice => &mut self.voice,
            ItemKind::Sticker => &mut self.sticker,
            ItemKind::Animation => &mut self.animation,
        }
    }
}

/// Record of one issued share token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareGrant {
    pub sharer_id: UserId,
    pub sharer_name: String,
    pub shared_at: DateTime<Utc>,
}

/// A named, creator-owned ordered collection of items.
///
/// `item_keys` is append-only insertion order and doubles as the pagination
/// order. Only `creator_id` may edit or delete the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub name: String,
    pub description: String,
    pub teacher_name: String,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_ref: Option<String>,
    #[serde(default)]
    pub item_keys: Vec<String>,
    #[serde(default)]
    pub share_grants: HashMap<String, ShareGrant>,
    #[serde(default)]
    pub kind_counts: KindCounts,
}

/// Process-wide usage counters. Mutated on every view and ingestion, never
/// deleted, flushed periodically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub item_views: HashMap<String, u64>,
    #[serde(default)]
    pub user_views: HashMap<UserId, u64>,
    #[serde(default)]
    pub batch_views: HashMap<String, u64>,
    #[serde(default)]
    pub kind_totals: KindCounts,
}

/// Last-seen identity of a user, upserted on every inbound interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub last_seen: DateTime<Utc>,
}
