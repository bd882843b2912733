//! Self-expiring content delivery.
//!
//! A view request sends the item to the viewer, records every message id
//! involved (the triggering message included), then arms a detached timer.
//! When the timer fires, each recorded id is deleted independently; failures
//! are logged per id and never stop the remaining deletions. There is no
//! cancellation path: once armed, a delivery always retracts, even if the
//! owning batch has been deleted in the meantime.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use courier_types::{ItemContent, MessageId, OutboundContent, StoredItem, UserId};

use crate::error::Result;
use crate::transport::Transport;

/// Payload sequence for one ephemeral view: the content itself with an
/// attribution-and-expiry footer, stickers followed by a separate footer
/// line since they cannot carry captions.
fn view_payloads(item: &StoredItem, ttl: Duration) -> Vec<OutboundContent> {
    let minutes = ttl.as_secs().div_ceil(60);
    let footer = format!(
        "From: {}\nThis content disappears in {minutes} minutes",
        item.owner_name
    );
    match &item.content {
        ItemContent::Text { text } => vec![OutboundContent::text(format!("{text}\n\n{footer}"))],
        ItemContent::Sticker { .. } => vec![
            OutboundContent::from_item(&item.content, None),
            OutboundContent::text(footer),
        ],
        _ => {
            // For media the footer rides along as (part of) the caption.
            match OutboundContent::from_item(&item.content, None) {
                OutboundContent::Media {
                    kind,
                    media_ref,
                    caption,
                } => {
                    let caption = match caption {
                        Some(caption) => format!("{caption}\n\n{footer}"),
                        None => footer,
                    };
                    vec![OutboundContent::Media {
                        kind,
                        media_ref,
                        caption: Some(caption),
                    }]
                }
                text => vec![text],
            }
        }
    }
}

/// Deliver an already-fetched item to `viewer` and arm its retraction.
/// Returns every message id recorded for deletion.
pub(crate) async fn deliver(
    transport: &Arc<dyn Transport>,
    viewer: UserId,
    item: &StoredItem,
    trigger: Option<MessageId>,
    ttl: Duration,
) -> Result<Vec<MessageId>> {
    let mut recorded: Vec<MessageId> = Vec::new();
    for payload in view_payloads(item, ttl) {
        let receipt = transport.send(viewer, payload).await?;
        recorded.push(receipt.message_id);
    }
    if let Some(trigger) = trigger {
        recorded.push(trigger);
    }

    debug!(viewer, item = %item.key, messages = recorded.len(), "ephemeral delivery armed");
    let transport = Arc::clone(transport);
    let ids = recorded.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        for message_id in ids {
            if let Err(e) = transport.delete(viewer, message_id).await {
                warn!(viewer, message_id, error = %e, "retraction failed");
            }
        }
    });

    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn item(content: ItemContent) -> StoredItem {
        StoredItem {
            key: "msg-1-0".into(),
            owner_id: 1,
            owner_name: "Ada".into(),
            created_at: Utc::now(),
            batch: None,
            content,
        }
    }

    #[test]
    fn text_view_carries_footer() {
        let payloads = view_payloads(
            &item(ItemContent::Text {
                text: "Chapter 1".into(),
            }),
            Duration::from_secs(300),
        );
        assert_eq!(
            payloads,
            vec![OutboundContent::text(
                "Chapter 1\n\nFrom: Ada\nThis content disappears in 5 minutes"
            )]
        );
    }

    #[test]
    fn media_footer_extends_existing_caption() {
        let payloads = view_payloads(
            &item(ItemContent::Photo {
                media_ref: "p1".into(),
                caption: Some("diagram".into()),
            }),
            Duration::from_secs(300),
        );
        match &payloads[0] {
            OutboundContent::Media { caption, .. } => {
                let caption = caption.as_deref().unwrap();
                assert!(caption.starts_with("diagram\n\n"));
                assert!(caption.contains("disappears in 5 minutes"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn sticker_view_is_two_messages() {
        let payloads = view_payloads(
            &item(ItemContent::Sticker {
                media_ref: "s1".into(),
            }),
            Duration::from_secs(300),
        );
        assert_eq!(payloads.len(), 2);
    }
}
