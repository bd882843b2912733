//! Subscriber fan-out for new batch content.
//!
//! One detached task per subscriber: a failure to reach one recipient is
//! logged and never affects the others, and the submitter's acknowledgement
//! never waits on any of them. Best-effort, no retries, no ordering
//! guarantee across subscribers.

use std::sync::Arc;

use tracing::{debug, warn};

use courier_store::ContentStore;
use courier_types::{ItemContent, OutboundContent, StoredItem, UserId};

use crate::transport::Transport;

/// Payload sequence for one subscriber: the item with a notice naming the
/// batch, plus a separate notice line for stickers (which carry no caption).
fn notification_payloads(batch: &str, item: &StoredItem) -> Vec<OutboundContent> {
    let kind = item.content.kind().as_str();
    let notice = format!("New {kind} in batch '{batch}'");
    match &item.content {
        ItemContent::Sticker { .. } => vec![
            OutboundContent::from_item(&item.content, None),
            OutboundContent::text(notice),
        ],
        _ => vec![OutboundContent::from_item(&item.content, Some(&notice))],
    }
}

/// Push the new item to every subscriber of `batch`, excluding the
/// submitter. Returns after spawning; the sends run independently.
pub(crate) fn spawn_fanout(
    store: &Arc<ContentStore>,
    transport: &Arc<dyn Transport>,
    batch: &str,
    item: &StoredItem,
) {
    let subscribers: Vec<UserId> = store
        .subscribers(batch)
        .into_iter()
        .filter(|id| *id != item.owner_id)
        .collect();
    if subscribers.is_empty() {
        return;
    }
    debug!(batch, count = subscribers.len(), "notifying subscribers");

    let payloads = notification_payloads(batch, item);
    for subscriber in subscribers {
        let transport = Arc::clone(transport);
        let payloads = payloads.clone();
        let batch = batch.to_string();
        tokio::spawn(async move {
            for payload in payloads {
                if let Err(e) = transport.send(subscriber, payload).await {
                    warn!(subscriber, batch, error = %e, "subscriber notification failed");
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use courier_types::ItemKind;

    use super::*;

    fn item(content: ItemContent) -> StoredItem {
        StoredItem {
            key: "msg-1-0".into(),
            owner_id: 1,
            owner_name: "Ada".into(),
            created_at: chrono::Utc::now(),
            batch: Some("Math101".into()),
            content,
        }
    }

    #[test]
    fn text_notification_is_one_payload_with_notice() {
        let payloads = notification_payloads(
            "Math101",
            &item(ItemContent::Text {
                text: "Chapter 1".into(),
            }),
        );
        assert_eq!(
            payloads,
            vec![OutboundContent::text(
                "New text in batch 'Math101'\n\nChapter 1"
            )]
        );
    }

    #[test]
    fn sticker_notification_adds_separate_notice() {
        let payloads = notification_payloads(
            "Math101",
            &item(ItemContent::Sticker {
                media_ref: "s1".into(),
            }),
        );
        assert_eq!(payloads.len(), 2);
        assert!(matches!(
            &payloads[0],
            OutboundContent::Media {
                kind: ItemKind::Sticker,
                caption: None,
                ..
            }
        ));
        assert_eq!(
            payloads[1],
            OutboundContent::text("New sticker in batch 'Math101'")
        );
    }
}
