//! Subscription registry: per-batch sets of subscriber identities.

use chrono::Utc;

use courier_types::UserId;

use crate::error::{Result, StoreError};
use crate::store::resolve_in;
use crate::{ContentStore, Doc};

impl ContentStore {
    /// Subscribe a user to a batch. Idempotent: repeat calls keep the
    /// original subscription timestamp.
    pub fn subscribe(&self, user_id: UserId, batch_name: &str) -> Result<()> {
        let mut inner = self.lock();
        let canonical = resolve_in(&inner, batch_name);
        if !inner.batches.contains_key(&canonical) {
            return Err(StoreError::BatchNotFound(batch_name.to_string()));
        }
        let subscribers = inner.subscriptions.entry(canonical).or_default();
        if subscribers.contains_key(&user_id) {
            return Ok(());
        }
        subscribers.insert(user_id, Utc::now());
        inner.mark_dirty(Doc::Subscriptions);
        Ok(())
    }

    /// Unsubscribe a user. A non-subscriber (or unknown batch) is a no-op.
    pub fn unsubscribe(&self, user_id: UserId, batch_name: &str) {
        let mut inner = self.lock();
        let canonical = resolve_in(&inner, batch_name);
        let Some(subscribers) = inner.subscriptions.get_mut(&canonical) else {
            return;
        };
        if subscribers.remove(&user_id).is_none() {
            return;
        }
        if subscribers.is_empty() {
            inner.subscriptions.remove(&canonical);
        }
        inner.mark_dirty(Doc::Subscriptions);
    }

    pub fn is_subscribed(&self, user_id: UserId, batch_name: &str) -> bool {
        let inner = self.lock();
        let canonical = resolve_in(&inner, batch_name);
        inner
            .subscriptions
            .get(&canonical)
            .is_some_and(|subscribers| subscribers.contains_key(&user_id))
    }

    /// Subscriber ids for a batch, in stable (ascending id) order.
    pub fn subscribers(&self, batch_name: &str) -> Vec<UserId> {
        let inner = self.lock();
        let canonical = resolve_in(&inner, batch_name);
        let mut ids: Vec<UserId> = inner
            .subscriptions
            .get(&canonical)
            .map(|subscribers| subscribers.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Batch names a user is subscribed to, sorted for stable display.
    pub fn subscriptions_of(&self, user_id: UserId) -> Vec<String> {
        let inner = self.lock();
        let mut names: Vec<String> = inner
            .subscriptions
            .iter()
            .filter(|(_, subscribers)| subscribers.contains_key(&user_id))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
