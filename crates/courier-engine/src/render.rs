//! Plain-text renderings of read views.
//!
//! The transport layer owns buttons and rich formatting; the engine hands it
//! ready-to-send text.

use chrono::{DateTime, Utc};

use courier_types::{Batch, ItemKind, StoredItem, UserId, UserProfile};

/// Items per page when listing a batch's contents.
pub(crate) const PAGE_SIZE: usize = 8;

const PREVIEW_LEN: usize = 30;

fn stamp(at: DateTime<Utc>) -> String {
    at.format("%B %d, %Y at %I:%M %p").to_string()
}

pub(crate) fn batch_overview(batch: &Batch, views: u64) -> String {
    let mut out = String::new();
    out.push_str("Batch Information\n\n");
    out.push_str(&format!("Name: {}\n", batch.name));
    out.push_str(&format!("Teacher: {}\n", batch.teacher_name));
    let description = if batch.description.is_empty() {
        "No description"
    } else {
        &batch.description
    };
    out.push_str(&format!("Description: {description}\n"));
    out.push_str(&format!("Created on: {}\n", stamp(batch.created_at)));
    out.push_str(&format!("Last updated: {}\n", stamp(batch.last_updated)));
    out.push_str(&format!("Total items: {}\n", batch.item_keys.len()));
    out.push_str(&format!("Views: {views}\n"));

    let typed: Vec<String> = ItemKind::ALL
        .iter()
        .filter_map(|kind| {
            let count = batch.kind_counts.get(*kind);
            (count > 0).then(|| format!("  {}: {count}", kind.as_str()))
        })
        .collect();
    if !typed.is_empty() {
        out.push_str("Item kinds:\n");
        out.push_str(&typed.join("\n"));
        out.push('\n');
    }
    out
}

/// One page of a batch's items in insertion order. `page` is zero-based and
/// clamped to the last page.
pub(crate) fn batch_page(batch: &Batch, items: &[StoredItem], page: usize) -> String {
    let total_pages = items.len().div_ceil(PAGE_SIZE).max(1);
    let page = page.min(total_pages - 1);
    let start = page * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(items.len());

    let mut out = format!(
        "Items in '{}'\nTeacher: {}\nTotal items: {}\nPage {} of {}\n\n",
        batch.name,
        batch.teacher_name,
        items.len(),
        page + 1,
        total_pages,
    );
    if items.is_empty() {
        out.push_str("This batch is empty.\n");
        return out;
    }
    for item in &items[start..end] {
        out.push_str(&format!(
            "{} [{}] {} (by {})\n",
            item.key,
            item.content.kind().as_str(),
            item.content.preview(PREVIEW_LEN),
            item.owner_name,
        ));
    }
    out
}

pub(crate) fn batch_listing(batches: &[Batch]) -> String {
    if batches.is_empty() {
        return "No batches created yet.".into();
    }
    let mut out = String::from("Available batches\n\n");
    for batch in batches {
        out.push_str(&format!(
            "{} ({} items) - teacher {}\n",
            batch.name,
            batch.item_keys.len(),
            batch.teacher_name,
        ));
    }
    out
}

pub(crate) fn profile_summary(
    user_id: UserId,
    profile: Option<&UserProfile>,
    subscriptions: &[(String, usize)],
    total_views: u64,
) -> String {
    let mut out = format!("User profile\n\nUser id: {user_id}\n");
    if let Some(profile) = profile {
        out.push_str(&format!("Name: {}\n", profile.display_name));
        if let Some(username) = &profile.username {
            out.push_str(&format!("Username: @{username}\n"));
        }
    }
    if subscriptions.is_empty() {
        out.push_str("\nNo subscribed batches.\n");
    } else {
        out.push_str(&format!("\nSubscribed batches ({}):\n", subscriptions.len()));
        for (name, items) in subscriptions {
            out.push_str(&format!("  {name} ({items} items)\n"));
        }
    }
    if total_views > 0 {
        out.push_str(&format!("\nTotal views: {total_views}\n"));
    }
    out
}

pub(crate) fn top_items_summary(ranked: &[(StoredItem, u64)]) -> String {
    if ranked.is_empty() {
        return "No item views recorded yet.".into();
    }
    let mut out = String::from("Most viewed items\n\n");
    for (position, (item, views)) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} - {views} views\n",
            position + 1,
            item.content.preview(PREVIEW_LEN),
        ));
    }
    out
}

pub(crate) fn top_users_summary(ranked: &[(UserId, u64)]) -> String {
    if ranked.is_empty() {
        return "No user activity recorded yet.".into();
    }
    let mut out = String::from("Most active users\n\n");
    for (position, (user_id, views)) in ranked.iter().enumerate() {
        out.push_str(&format!("{}. user {user_id} - {views} views\n", position + 1));
    }
    out
}

pub(crate) fn item_results(items: &[StoredItem]) -> String {
    if items.is_empty() {
        return "No items found.".into();
    }
    let mut out = format!("Found {} items:\n\n", items.len());
    for item in items {
        out.push_str(&format!(
            "{} [{}] {}\n",
            item.key,
            item.content.kind().as_str(),
            item.content.preview(PREVIEW_LEN),
        ));
    }
    out
}

pub(crate) fn batch_results(batches: &[Batch]) -> String {
    if batches.is_empty() {
        return "No matching batches found.".into();
    }
    let mut out = String::from("Matching batches:\n\n");
    for batch in batches {
        out.push_str(&format!(
            "{} (teacher {}, {} items)\n",
            batch.name,
            batch.teacher_name,
            batch.item_keys.len(),
        ));
    }
    out
}
