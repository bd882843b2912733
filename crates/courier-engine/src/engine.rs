//! The engine facade: every operation a handler can perform, over one shared
//! [`ContentStore`] and one [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::info;

use courier_store::{ContentStore, StoreError};
use courier_types::{InboundEvent, MessageId, UserId};

use crate::error::Result;
use crate::transport::Transport;
use crate::{ephemeral, notify, render};

/// Fixed time-to-live of an ephemeral delivery.
const RETRACTION_TTL: Duration = Duration::from_secs(300);

pub struct Engine {
    store: Arc<ContentStore>,
    transport: Arc<dyn Transport>,
    retraction_ttl: Duration,
}

impl Engine {
    pub fn new(store: Arc<ContentStore>, transport: Arc<dyn Transport>) -> Self {
        Engine {
            store,
            transport,
            retraction_ttl: RETRACTION_TTL,
        }
    }

    /// Override the retraction TTL. Test hook; production keeps the default.
    pub fn with_retraction_ttl(mut self, ttl: Duration) -> Self {
        self.retraction_ttl = ttl;
        self
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Record inbound content and return the acknowledgement for the
    /// submitter. Batch content additionally triggers subscriber fan-out,
    /// which the acknowledgement never waits on.
    pub fn handle_inbound(&self, event: InboundEvent) -> Result<String> {
        self.store.upsert_profile(
            event.sender_id,
            &event.sender_name,
            event.username.as_deref(),
        );

        let ack = match &event.target_batch {
            Some(batch_name) => {
                let (canonical, item) = self.store.record_batch_item(
                    batch_name,
                    event.sender_id,
                    &event.sender_name,
                    event.content.clone(),
                )?;
                notify::spawn_fanout(&self.store, &self.transport, &canonical, &item);
                let total = self.store.get_batch(&canonical)?.item_keys.len();
                format!(
                    "Added {} item to batch '{canonical}' ({total} items). Send more or finish when done.",
                    item.content.kind().as_str(),
                )
            }
            None => {
                let item = self.store.record_item(
                    event.sender_id,
                    &event.sender_name,
                    event.content.clone(),
                );
                format!(
                    "Saved {} item as {}.",
                    item.content.kind().as_str(),
                    item.key
                )
            }
        };
        self.store.spawn_flush();
        Ok(ack)
    }

    // ------------------------------------------------------------------
    // Ephemeral viewing
    // ------------------------------------------------------------------

    /// Deliver an item to its viewer and arm retraction of everything sent,
    /// plus the triggering message if one is given. Returns the recorded
    /// message ids.
    pub async fn view_item(
        &self,
        viewer: UserId,
        item_key: &str,
        trigger: Option<MessageId>,
    ) -> Result<Vec<MessageId>> {
        let item = self.store.record_view(item_key, viewer)?;
        self.store.spawn_flush();
        let recorded =
            ephemeral::deliver(&self.transport, viewer, &item, trigger, self.retraction_ttl)
                .await?;
        Ok(recorded)
    }

    // ------------------------------------------------------------------
    // Batch management
    // ------------------------------------------------------------------

    pub fn create_batch(
        &self,
        name: &str,
        teacher_name: &str,
        description: &str,
        creator_id: UserId,
    ) -> Result<String> {
        let batch = self
            .store
            .create_batch(name, teacher_name, description, creator_id)?;
        self.store.spawn_flush();
        info!(batch = %batch.name, creator_id, "batch created");
        Ok(format!(
            "Batch '{}' created. Teacher: {}.",
            batch.name, batch.teacher_name
        ))
    }

    pub fn delete_batch(&self, name: &str, requester: UserId) -> Result<String> {
        let batch = self.store.delete_batch(name, requester)?;
        self.store.spawn_flush();
        info!(batch = %batch.name, requester, items = batch.item_keys.len(), "batch deleted");
        Ok(format!(
            "Batch '{}' and its {} items have been deleted.",
            batch.name,
            batch.item_keys.len()
        ))
    }

    pub fn edit_description(&self, name: &str, requester: UserId, text: &str) -> Result<String> {
        let batch = self.store.set_description(name, requester, text)?;
        self.store.spawn_flush();
        Ok(format!("Batch '{}' updated.", batch.name))
    }

    pub fn edit_teacher(&self, name: &str, requester: UserId, teacher: &str) -> Result<String> {
        let batch = self.store.set_teacher(name, requester, teacher)?;
        self.store.spawn_flush();
        Ok(format!(
            "Batch '{}' updated. New teacher: {}.",
            batch.name, batch.teacher_name
        ))
    }

    pub fn set_banner(&self, name: &str, requester: UserId, media_ref: &str) -> Result<String> {
        let batch = self.store.set_banner(name, requester, media_ref)?;
        self.store.spawn_flush();
        Ok(format!("Banner set for batch '{}'.", batch.name))
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn subscribe(&self, user_id: UserId, batch_name: &str) -> Result<String> {
        self.store.subscribe(user_id, batch_name)?;
        self.store.spawn_flush();
        let canonical = self.store.resolve_batch_key(batch_name);
        Ok(format!("Subscribed to batch '{canonical}' notifications."))
    }

    pub fn unsubscribe(&self, user_id: UserId, batch_name: &str) -> Result<String> {
        let canonical = self.store.resolve_batch_key(batch_name);
        self.store.unsubscribe(user_id, batch_name);
        self.store.spawn_flush();
        Ok(format!("Unsubscribed from batch '{canonical}'."))
    }

    // ------------------------------------------------------------------
    // Read views
    // ------------------------------------------------------------------

    /// Batch overview, cached until the batch next changes or the cache TTL
    /// lapses. The cache key embeds `last_updated`, so edits miss the stale
    /// entry instead of serving it.
    pub fn batch_overview(&self, name: &str) -> Result<String> {
        let batch = self.store.get_batch(name)?;
        let cache_key = format!(
            "overview:{}:{}",
            batch.name,
            batch.last_updated.timestamp_micros()
        );
        if let Some(view) = self.store.cached_view(&cache_key) {
            return Ok(view);
        }
        let view = render::batch_overview(&batch, self.store.batch_views(&batch.name));
        self.store.store_view(cache_key, view.clone());
        Ok(view)
    }

    /// One page of a batch's contents (insertion order, zero-based page).
    /// Counts as a view of the batch.
    pub fn batch_page(&self, name: &str, page: usize) -> Result<String> {
        let batch = self.store.get_batch(name)?;
        self.store.record_batch_view(&batch.name);
        self.store.spawn_flush();
        let items: Vec<_> = batch
            .item_keys
            .iter()
            .filter_map(|key| self.store.get_item(key).ok())
            .collect();
        Ok(render::batch_page(&batch, &items, page))
    }

    pub fn list_batches(&self) -> String {
        render::batch_listing(&self.store.list_batches())
    }

    pub fn profile(&self, user_id: UserId) -> String {
        let profile = self.store.get_profile(user_id);
        let subscriptions: Vec<(String, usize)> = self
            .store
            .subscriptions_of(user_id)
            .into_iter()
            .map(|name| {
                let items = self
                    .store
                    .get_batch(&name)
                    .map(|batch| batch.item_keys.len())
                    .unwrap_or(0);
                (name, items)
            })
            .collect();
        let total_views = self
            .store
            .stats()
            .user_views
            .get(&user_id)
            .copied()
            .unwrap_or(0);
        render::profile_summary(user_id, profile.as_ref(), &subscriptions, total_views)
    }

    pub fn top_items(&self, limit: usize) -> String {
        render::top_items_summary(&self.store.top_items(limit))
    }

    pub fn top_users(&self, limit: usize) -> String {
        render::top_users_summary(&self.store.top_users(limit))
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub fn search_items(&self, query: &str) -> String {
        render::item_results(&self.store.search_items(query))
    }

    pub fn search_batches(&self, query: &str) -> String {
        render::batch_results(&self.store.search_batches(query))
    }

    pub fn search_by_teacher(&self, query: &str) -> String {
        render::batch_results(&self.store.search_by_teacher(query))
    }

    /// Items of a batch created on the given day, `YYYY-MM-DD`.
    pub fn search_by_date(&self, batch_name: &str, date: &str) -> Result<String> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            StoreError::InvalidInput("dates use the YYYY-MM-DD format, e.g. 2024-03-20".into())
        })?;
        let items = self.store.items_on_date(batch_name, date)?;
        Ok(render::item_results(&items))
    }

    // ------------------------------------------------------------------
    // Sharing
    // ------------------------------------------------------------------

    /// Mint a share token for a batch and describe it for the sharer. The
    /// transport layer wraps the token into its own deep-link format.
    pub fn share_batch(
        &self,
        name: &str,
        sharer_id: UserId,
        sharer_name: &str,
    ) -> Result<String> {
        let (token, batch) = self.store.issue_share(name, sharer_id, sharer_name)?;
        self.store.spawn_flush();
        Ok(format!(
            "Share batch '{}'\nTeacher: {}\nItems: {}\n\nShare token:\n{token}",
            batch.name,
            batch.teacher_name,
            batch.item_keys.len()
        ))
    }

    /// Resolve a share token into the batch overview, noting who shared it.
    pub fn open_share(&self, token: &str) -> Result<String> {
        let (batch, grant) = self.store.redeem_share(token)?;
        let mut out = self.batch_overview(&batch.name)?;
        if let Some(grant) = grant {
            out = format!(
                "Shared with you by {} on {}\n\n{out}",
                grant.sharer_name,
                grant.shared_at.format("%B %d, %Y at %I:%M %p")
            );
        }
        Ok(out)
    }
}
