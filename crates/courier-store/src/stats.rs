//! Usage statistics and user profiles.

use chrono::Utc;

use courier_types::{StoredItem, UserId, UserProfile};

use crate::error::{Result, StoreError};
use crate::{ContentStore, Doc};

impl ContentStore {
    /// Count one view of an item: bumps the item counter, the viewer's
    /// counter, and — for batch-scoped items — the owning batch's counter.
    /// Returns the viewed item so delivery can reuse the lookup.
    pub fn record_view(&self, item_key: &str, viewer: UserId) -> Result<StoredItem> {
        let mut inner = self.lock();
        let Some(item) = inner
            .items
            .get(item_key)
            .or_else(|| inner.batch_items.get(item_key))
            .cloned()
        else {
            return Err(StoreError::NotFound);
        };

        *inner.stats.item_views.entry(item.key.clone()).or_insert(0) += 1;
        *inner.stats.user_views.entry(viewer).or_insert(0) += 1;
        if let Some(batch) = &item.batch {
            *inner.stats.batch_views.entry(batch.clone()).or_insert(0) += 1;
        }
        inner.mark_dirty(Doc::Stats);
        Ok(item)
    }

    /// Count one view of a batch listing.
    pub fn record_batch_view(&self, batch_name: &str) {
        let mut inner = self.lock();
        let canonical = crate::store::resolve_in(&inner, batch_name);
        if !inner.batches.contains_key(&canonical) {
            return;
        }
        *inner.stats.batch_views.entry(canonical).or_insert(0) += 1;
        inner.mark_dirty(Doc::Stats);
    }

    pub fn batch_views(&self, batch_name: &str) -> u64 {
        let inner = self.lock();
        let canonical = crate::store::resolve_in(&inner, batch_name);
        inner.stats.batch_views.get(&canonical).copied().unwrap_or(0)
    }

    /// Most-viewed items that still exist, highest first.
    pub fn top_items(&self, limit: usize) -> Vec<(StoredItem, u64)> {
        let inner = self.lock();
        let mut ranked: Vec<(&String, &u64)> = inner.stats.item_views.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        ranked
            .into_iter()
            .filter_map(|(key, views)| {
                inner
                    .items
                    .get(key)
                    .or_else(|| inner.batch_items.get(key))
                    .map(|item| (item.clone(), *views))
            })
            .take(limit)
            .collect()
    }

    /// Most active viewers, highest first.
    pub fn top_users(&self, limit: usize) -> Vec<(UserId, u64)> {
        let inner = self.lock();
        let mut ranked: Vec<(UserId, u64)> = inner
            .stats
            .user_views
            .iter()
            .map(|(id, views)| (*id, *views))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(limit);
        ranked
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    /// Upsert the sender's profile; called on every inbound interaction.
    pub fn upsert_profile(&self, user_id: UserId, display_name: &str, username: Option<&str>) {
        let mut inner = self.lock();
        inner.profiles.insert(
            user_id,
            UserProfile {
                display_name: display_name.to_string(),
                username: username.map(str::to_string),
                last_seen: Utc::now(),
            },
        );
        inner.mark_dirty(Doc::Profiles);
    }

    pub fn get_profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.lock().profiles.get(&user_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use courier_types::ItemContent;

    use super::*;
    use crate::testutil::eager_store;

    fn text(text: &str) -> ItemContent {
        ItemContent::Text { text: text.into() }
    }

    #[test]
    fn view_bumps_item_user_and_batch_counters() {
        let (store, _dir) = eager_store();
        store.create_batch("Math101", "Smith", "", 1).unwrap();
        let (_, item) = store
            .record_batch_item("Math101", 1, "Ada", text("Chapter 1"))
            .unwrap();

        store.record_view(&item.key, 42).unwrap();
        store.record_view(&item.key, 42).unwrap();

        let stats = store.stats();
        assert_eq!(stats.item_views.get(&item.key), Some(&2));
        assert_eq!(stats.user_views.get(&42), Some(&2));
        assert_eq!(stats.batch_views.get("Math101"), Some(&2));
    }

    #[test]
    fn standalone_view_leaves_batch_counters_alone() {
        let (store, _dir) = eager_store();
        let item = store.record_item(1, "Ada", text("note"));
        store.record_view(&item.key, 42).unwrap();
        assert!(store.stats().batch_views.is_empty());
    }

    #[test]
    fn view_of_missing_item_touches_nothing() {
        let (store, _dir) = eager_store();
        assert!(matches!(
            store.record_view("msg-0-0", 42),
            Err(StoreError::NotFound)
        ));
        let stats = store.stats();
        assert!(stats.item_views.is_empty());
        assert!(stats.user_views.is_empty());
    }

    #[test]
    fn leaderboards_rank_by_views() {
        let (store, _dir) = eager_store();
        let a = store.record_item(1, "Ada", text("a"));
        let b = store.record_item(1, "Ada", text("b"));

        store.record_view(&a.key, 10).unwrap();
        store.record_view(&b.key, 10).unwrap();
        store.record_view(&b.key, 11).unwrap();

        let top = store.top_items(10);
        assert_eq!(top[0].0.key, b.key);
        assert_eq!(top[0].1, 2);
        assert_eq!(top[1].0.key, a.key);

        let users = store.top_users(1);
        assert_eq!(users, vec![(10, 2)]);
    }

    #[test]
    fn profile_upsert_overwrites() {
        let (store, _dir) = eager_store();
        store.upsert_profile(7, "Ada", None);
        store.upsert_profile(7, "Ada L", Some("ada"));
        let profile = store.get_profile(7).unwrap();
        assert_eq!(profile.display_name, "Ada L");
        assert_eq!(profile.username.as_deref(), Some("ada"));
    }
}
