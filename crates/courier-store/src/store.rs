//! Item and batch operations on [`ContentStore`].

use chrono::Utc;

use courier_types::{Batch, ItemContent, ShareGrant, ShareToken, StoredItem, UserId};

use crate::error::{Result, StoreError};
use crate::{ContentStore, Doc, StoreInner};

/// Case-insensitive batch-name resolution against the current table.
/// Returns the first match's original-cased key, or the folded input when
/// nothing matches — callers must still check existence.
pub(crate) fn resolve_in(inner: &StoreInner, name: &str) -> String {
    let folded = name.to_lowercase();
    inner
        .batches
        .keys()
        .find(|key| key.to_lowercase() == folded)
        .cloned()
        .unwrap_or(folded)
}

impl ContentStore {
    // ------------------------------------------------------------------
    // Identity resolution
    // ------------------------------------------------------------------

    /// Resolve a user-typed batch name to the canonical stored key.
    pub fn resolve_batch_key(&self, name: &str) -> String {
        resolve_in(&self.lock(), name)
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    /// Store a standalone item. Standalone items are never deleted.
    pub fn record_item(&self, owner_id: UserId, owner_name: &str, content: ItemContent) -> StoredItem {
        let item = StoredItem {
            key: self.next_key(),
            owner_id,
            owner_name: owner_name.to_string(),
            created_at: Utc::now(),
            batch: None,
            content,
        };
        let mut inner = self.lock();
        inner.stats.kind_totals.bump(item.content.kind());
        inner.items.insert(item.key.clone(), item.clone());
        inner.mark_dirty(Doc::Items);
        inner.mark_dirty(Doc::Stats);
        item
    }

    /// Store an item into a batch: appends the key to the batch's ordered
    /// item list, bumps its per-kind counter and refreshes `last_updated`.
    /// Returns the canonical batch name alongside the stored item so the
    /// caller can trigger subscriber fan-out.
    pub fn record_batch_item(
        &self,
        batch_name: &str,
        owner_id: UserId,
        owner_name: &str,
        content: ItemContent,
    ) -> Result<(String, StoredItem)> {
        let key = self.next_key();
        let mut inner = self.lock();
        let canonical = resolve_in(&inner, batch_name);
        if !inner.batches.contains_key(&canonical) {
            return Err(StoreError::BatchNotFound(batch_name.to_string()));
        }

        let item = StoredItem {
            key,
            owner_id,
            owner_name: owner_name.to_string(),
            created_at: Utc::now(),
            batch: Some(canonical.clone()),
            content,
        };
        let kind = item.content.kind();

        let batch = inner
            .batches
            .get_mut(&canonical)
            .expect("batch checked above");
        batch.item_keys.push(item.key.clone());
        batch.kind_counts.bump(kind);
        batch.last_updated = item.created_at;

        inner.stats.kind_totals.bump(kind);
        inner.batch_items.insert(item.key.clone(), item.clone());
        inner.mark_dirty(Doc::BatchItems);
        inner.mark_dirty(Doc::Batches);
        inner.mark_dirty(Doc::Stats);
        Ok((canonical, item))
    }

    /// Fetch an item by key, checking the standalone table first and the
    /// batch-scoped table second.
    pub fn get_item(&self, key: &str) -> Result<StoredItem> {
        let inner = self.lock();
        inner
            .items
            .get(key)
            .or_else(|| inner.batch_items.get(key))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    pub fn create_batch(
        &self,
        name: &str,
        teacher_name: &str,
        description: &str,
        creator_id: UserId,
    ) -> Result<Batch> {
        let name = name.trim();
        let teacher_name = teacher_name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("batch name is required".into()));
        }
        if teacher_name.is_empty() {
            return Err(StoreError::InvalidInput("teacher name is required".into()));
        }

        let mut inner = self.lock();
        let canonical = resolve_in(&inner, name);
        if inner.batches.contains_key(&canonical) {
            return Err(StoreError::DuplicateBatch(canonical));
        }

        let now = Utc::now();
        let batch = Batch {
            name: name.to_string(),
            description: description.trim().to_string(),
            teacher_name: teacher_name.to_string(),
            creator_id,
            created_at: now,
            last_updated: now,
            banner_ref: None,
            item_keys: Vec::new(),
            share_grants: Default::default(),
            kind_counts: Default::default(),
        };
        inner.batches.insert(batch.name.clone(), batch.clone());
        inner.mark_dirty(Doc::Batches);
        Ok(batch)
    }

    /// Delete a batch, its items and its subscriptions in one step under the
    /// store lock. Creator-only. Returns the removed batch.
    pub fn delete_batch(&self, name: &str, requester: UserId) -> Result<Batch> {
        let mut inner = self.lock();
        let canonical = resolve_in(&inner, name);
        let Some(batch) = inner.batches.get(&canonical) else {
            return Err(StoreError::BatchNotFound(name.to_string()));
        };
        if batch.creator_id != requester {
            return Err(StoreError::Forbidden);
        }

        let batch = inner
            .batches
            .remove(&canonical)
            .expect("batch checked above");
        for key in &batch.item_keys {
            inner.batch_items.remove(key);
        }
        inner.subscriptions.remove(&canonical);
        inner.mark_dirty(Doc::Batches);
        inner.mark_dirty(Doc::BatchItems);
        inner.mark_dirty(Doc::Subscriptions);
        Ok(batch)
    }

    pub fn set_description(&self, name: &str, requester: UserId, description: &str) -> Result<Batch> {
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(StoreError::InvalidInput("description cannot be empty".into()));
        }
        self.edit_batch(name, requester, |batch| batch.description = description)
    }

    pub fn set_teacher(&self, name: &str, requester: UserId, teacher_name: &str) -> Result<Batch> {
        let teacher_name = teacher_name.trim().to_string();
        if teacher_name.is_empty() {
            return Err(StoreError::InvalidInput("teacher name cannot be empty".into()));
        }
        self.edit_batch(name, requester, |batch| batch.teacher_name = teacher_name)
    }

    pub fn set_banner(&self, name: &str, requester: UserId, media_ref: &str) -> Result<Batch> {
        let media_ref = media_ref.trim().to_string();
        if media_ref.is_empty() {
            return Err(StoreError::InvalidInput("banner reference cannot be empty".into()));
        }
        self.edit_batch(name, requester, |batch| batch.banner_ref = Some(media_ref))
    }

    fn edit_batch(
        &self,
        name: &str,
        requester: UserId,
        apply: impl FnOnce(&mut Batch),
    ) -> Result<Batch> {
        let mut inner = self.lock();
        let canonical = resolve_in(&inner, name);
        let Some(batch) = inner.batches.get_mut(&canonical) else {
            return Err(StoreError::BatchNotFound(name.to_string()));
        };
        if batch.creator_id != requester {
            return Err(StoreError::Forbidden);
        }
        apply(batch);
        batch.last_updated = Utc::now();
        let batch = batch.clone();
        inner.mark_dirty(Doc::Batches);
        Ok(batch)
    }

    pub fn get_batch(&self, name: &str) -> Result<Batch> {
        let inner = self.lock();
        let canonical = resolve_in(&inner, name);
        inner
            .batches
            .get(&canonical)
            .cloned()
            .ok_or_else(|| StoreError::BatchNotFound(name.to_string()))
    }

    /// All batches, most content first (the listing order users see).
    pub fn list_batches(&self) -> Vec<Batch> {
        let inner = self.lock();
        let mut batches: Vec<Batch> = inner.batches.values().cloned().collect();
        batches.sort_by(|a, b| {
            b.item_keys
                .len()
                .cmp(&a.item_keys.len())
                .then_with(|| a.name.cmp(&b.name))
        });
        batches
    }

    // ------------------------------------------------------------------
    // Share tokens
    // ------------------------------------------------------------------

    /// Issue a share token for a batch and record the grant on it.
    pub fn issue_share(
        &self,
        name: &str,
        sharer_id: UserId,
        sharer_name: &str,
    ) -> Result<(String, Batch)> {
        let mut inner = self.lock();
        let canonical = resolve_in(&inner, name);
        let Some(batch) = inner.batches.get_mut(&canonical) else {
            return Err(StoreError::BatchNotFound(name.to_string()));
        };

        let token = ShareToken::new(&canonical, sharer_id).encode();
        batch.share_grants.insert(
            token.clone(),
            ShareGrant {
                sharer_id,
                sharer_name: sharer_name.to_string(),
                shared_at: Utc::now(),
            },
        );
        let batch = batch.clone();
        inner.mark_dirty(Doc::Batches);
        Ok((token, batch))
    }

    /// Resolve a share token back to its batch. The grant is present unless
    /// the token was minted by another process life with a since-lost batch
    /// state; a missing grant still resolves the batch.
    pub fn redeem_share(&self, token: &str) -> Result<(Batch, Option<ShareGrant>)> {
        let decoded = ShareToken::decode(token)
            .map_err(|e| StoreError::InvalidInput(e.to_string()))?;
        let inner = self.lock();
        let canonical = resolve_in(&inner, &decoded.batch);
        let Some(batch) = inner.batches.get(&canonical) else {
            return Err(StoreError::BatchNotFound(decoded.batch));
        };
        let grant = batch.share_grants.get(token).cloned();
        Ok((batch.clone(), grant))
    }
}

#[cfg(test)]
mod tests {
    use courier_types::{ItemContent, ItemKind};

    use super::*;
    use crate::testutil::eager_store;

    fn text(text: &str) -> ItemContent {
        ItemContent::Text { text: text.into() }
    }

    #[test]
    fn resolver_is_case_insensitive_and_stable() {
        let (store, _dir) = eager_store();
        store.create_batch("Math101", "Smith", "", 1).unwrap();
        assert_eq!(store.resolve_batch_key("math101"), "Math101");
        assert_eq!(store.resolve_batch_key("MATH101"), "Math101");
        assert_eq!(store.resolve_batch_key("Math101"), "Math101");
        // Unknown names pass through folded; callers check existence.
        assert_eq!(store.resolve_batch_key("UnKnown"), "unknown");
    }

    #[test]
    fn duplicate_batch_is_rejected_case_insensitively() {
        let (store, _dir) = eager_store();
        store.create_batch("Math101", "Smith", "", 1).unwrap();
        let err = store.create_batch("MATH101", "Jones", "", 2).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateBatch(name) if name == "Math101"));
    }

    #[test]
    fn empty_name_or_teacher_is_invalid() {
        let (store, _dir) = eager_store();
        assert!(matches!(
            store.create_batch("  ", "Smith", "", 1),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.create_batch("Math101", "", "", 1),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn append_grows_keys_and_advances_last_updated() {
        let (store, _dir) = eager_store();
        let created = store.create_batch("Math101", "Smith", "", 1).unwrap();

        let (canonical, item) = store
            .record_batch_item("math101", 1, "Ada", text("Chapter 1"))
            .unwrap();
        assert_eq!(canonical, "Math101");
        assert_eq!(item.batch.as_deref(), Some("Math101"));

        let batch = store.get_batch("Math101").unwrap();
        assert_eq!(batch.item_keys, vec![item.key.clone()]);
        assert_eq!(batch.kind_counts.get(ItemKind::Text), 1);
        assert!(batch.last_updated >= created.last_updated);

        let (_, second) = store
            .record_batch_item("Math101", 1, "Ada", text("Chapter 2"))
            .unwrap();
        let batch = store.get_batch("Math101").unwrap();
        assert_eq!(batch.item_keys.len(), 2);
        assert_eq!(batch.item_keys[1], second.key);
    }

    #[test]
    fn batch_item_into_missing_batch_fails() {
        let (store, _dir) = eager_store();
        let err = store
            .record_batch_item("ghost", 1, "Ada", text("x"))
            .unwrap_err();
        assert!(matches!(err, StoreError::BatchNotFound(_)));
    }

    #[test]
    fn only_creator_may_edit() {
        let (store, _dir) = eager_store();
        store.create_batch("Math101", "Smith", "old", 1).unwrap();

        let err = store.set_description("Math101", 2, "new").unwrap_err();
        assert!(matches!(err, StoreError::Forbidden));
        assert_eq!(store.get_batch("Math101").unwrap().description, "old");

        let batch = store.set_description("Math101", 1, "new").unwrap();
        assert_eq!(batch.description, "new");
    }

    #[test]
    fn delete_cascades_items_and_subscriptions() {
        let (store, _dir) = eager_store();
        store.create_batch("Math101", "Smith", "", 1).unwrap();
        let (_, item) = store
            .record_batch_item("Math101", 1, "Ada", text("Chapter 1"))
            .unwrap();
        store.subscribe(42, "Math101").unwrap();

        // Not the creator: nothing changes.
        assert!(matches!(
            store.delete_batch("Math101", 99),
            Err(StoreError::Forbidden)
        ));
        assert!(store.get_item(&item.key).is_ok());

        store.delete_batch("math101", 1).unwrap();
        assert!(matches!(store.get_item(&item.key), Err(StoreError::NotFound)));
        assert!(matches!(
            store.get_batch("math101"),
            Err(StoreError::BatchNotFound(_))
        ));
        assert!(store.subscribers("Math101").is_empty());
    }

    #[test]
    fn standalone_items_survive_batch_deletion() {
        let (store, _dir) = eager_store();
        let standalone = store.record_item(1, "Ada", text("keep me"));
        store.create_batch("Math101", "Smith", "", 1).unwrap();
        store.delete_batch("Math101", 1).unwrap();
        assert!(store.get_item(&standalone.key).is_ok());
    }

    #[test]
    fn share_token_redeems_through_resolver() {
        let (store, _dir) = eager_store();
        store.create_batch("Phys_2024_A", "Bohr", "", 1).unwrap();
        let (token, _) = store.issue_share("phys_2024_a", 7, "Niels").unwrap();

        let (batch, grant) = store.redeem_share(&token).unwrap();
        assert_eq!(batch.name, "Phys_2024_A");
        let grant = grant.unwrap();
        assert_eq!(grant.sharer_id, 7);
        assert_eq!(grant.sharer_name, "Niels");
    }

    #[test]
    fn share_token_dangles_after_deletion() {
        let (store, _dir) = eager_store();
        store.create_batch("Math101", "Smith", "", 1).unwrap();
        let (token, _) = store.issue_share("Math101", 7, "Niels").unwrap();
        store.delete_batch("Math101", 1).unwrap();
        assert!(matches!(
            store.redeem_share(&token),
            Err(StoreError::BatchNotFound(_))
        ));
    }

    #[test]
    fn list_batches_orders_by_content_then_name() {
        let (store, _dir) = eager_store();
        store.create_batch("Beta", "T", "", 1).unwrap();
        store.create_batch("Alpha", "T", "", 1).unwrap();
        store.create_batch("Gamma", "T", "", 1).unwrap();
        store
            .record_batch_item("Gamma", 1, "Ada", text("x"))
            .unwrap();

        let names: Vec<String> = store.list_batches().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);
    }
}
