//! Case-insensitive substring search over items and batches.

use chrono::NaiveDate;

use courier_types::{Batch, ItemContent, StoredItem};

use crate::error::{Result, StoreError};
use crate::store::resolve_in;
use crate::ContentStore;

fn contains_fold(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn item_matches(item: &StoredItem, needle: &str) -> bool {
    match &item.content {
        ItemContent::Text { text } => contains_fold(text, needle),
        ItemContent::Photo { caption, .. }
        | ItemContent::Video { caption, .. }
        | ItemContent::Animation { caption, .. } => {
            caption.as_deref().is_some_and(|c| contains_fold(c, needle))
        }
        ItemContent::Document {
            file_name, caption, ..
        } => {
            file_name.as_deref().is_some_and(|f| contains_fold(f, needle))
                || caption.as_deref().is_some_and(|c| contains_fold(c, needle))
        }
        ItemContent::Audio { title, .. } => {
            title.as_deref().is_some_and(|t| contains_fold(t, needle))
        }
        ItemContent::Voice { .. } | ItemContent::Sticker { .. } => false,
    }
}

impl ContentStore {
    /// Search standalone items by text, caption, title or file name.
    pub fn search_items(&self, query: &str) -> Vec<StoredItem> {
        let needle = query.to_lowercase();
        let inner = self.lock();
        let mut found: Vec<StoredItem> = inner
            .items
            .values()
            .filter(|item| item_matches(item, &needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found
    }

    /// Search batches by name, description or teacher name.
    pub fn search_batches(&self, query: &str) -> Vec<Batch> {
        let needle = query.to_lowercase();
        let inner = self.lock();
        let mut found: Vec<Batch> = inner
            .batches
            .values()
            .filter(|batch| {
                contains_fold(&batch.name, &needle)
                    || contains_fold(&batch.description, &needle)
                    || contains_fold(&batch.teacher_name, &needle)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Batches taught by a matching teacher, most content first.
    pub fn search_by_teacher(&self, query: &str) -> Vec<Batch> {
        let needle = query.to_lowercase();
        let inner = self.lock();
        let mut found: Vec<Batch> = inner
            .batches
            .values()
            .filter(|batch| contains_fold(&batch.teacher_name, &needle))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.item_keys
                .len()
                .cmp(&a.item_keys.len())
                .then_with(|| a.name.cmp(&b.name))
        });
        found
    }

    /// Items of one batch created on a given calendar day (UTC), in the
    /// batch's insertion order.
    pub fn items_on_date(&self, batch_name: &str, date: NaiveDate) -> Result<Vec<StoredItem>> {
        let inner = self.lock();
        let canonical = resolve_in(&inner, batch_name);
        let Some(batch) = inner.batches.get(&canonical) else {
            return Err(StoreError::BatchNotFound(batch_name.to_string()));
        };
        Ok(batch
            .item_keys
            .iter()
            .filter_map(|key| inner.batch_items.get(key))
            .filter(|item| item.created_at.date_naive() == date)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use courier_types::ItemContent;

    use super::*;
    use crate::testutil::eager_store;

    #[test]
    fn item_search_covers_text_caption_and_file_name() {
        let (store, _dir) = eager_store();
        store.record_item(
            1,
            "Ada",
            ItemContent::Text {
                text: "Thermodynamics intro".into(),
            },
        );
        store.record_item(
            1,
            "Ada",
            ItemContent::Document {
                media_ref: "f1".into(),
                file_name: Some("thermo-notes.pdf".into()),
                caption: None,
            },
        );
        store.record_item(
            1,
            "Ada",
            ItemContent::Photo {
                media_ref: "p1".into(),
                caption: Some("unrelated".into()),
            },
        );

        assert_eq!(store.search_items("THERMO").len(), 2);
        assert_eq!(store.search_items("unrelated").len(), 1);
        assert!(store.search_items("nothing").is_empty());
    }

    #[test]
    fn batch_search_covers_name_description_teacher() {
        let (store, _dir) = eager_store();
        store
            .create_batch("Math101", "Smith", "algebra basics", 1)
            .unwrap();
        store
            .create_batch("Bio202", "Darwin", "evolution", 1)
            .unwrap();

        assert_eq!(store.search_batches("math").len(), 1);
        assert_eq!(store.search_batches("ALGEBRA").len(), 1);
        assert_eq!(store.search_batches("darwin").len(), 1);
        assert!(store.search_batches("chemistry").is_empty());

        let by_teacher = store.search_by_teacher("smi");
        assert_eq!(by_teacher.len(), 1);
        assert_eq!(by_teacher[0].name, "Math101");
    }

    #[test]
    fn date_search_matches_todays_items() {
        let (store, _dir) = eager_store();
        store.create_batch("Math101", "Smith", "", 1).unwrap();
        store
            .record_batch_item(
                "Math101",
                1,
                "Ada",
                ItemContent::Text {
                    text: "today".into(),
                },
            )
            .unwrap();

        let today = Utc::now().date_naive();
        assert_eq!(store.items_on_date("math101", today).unwrap().len(), 1);
        let yesterday = today.pred_opt().unwrap();
        assert!(store.items_on_date("Math101", yesterday).unwrap().is_empty());
        assert!(store.items_on_date("ghost", today).is_err());
    }
}
