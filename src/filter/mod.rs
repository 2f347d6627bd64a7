//! Keyword filtering of scraped items.
//!
//! Pure and deterministic: no I/O, no shared state. Matching is
//! case-insensitive substring containment against the item title; terms are
//! tried in set order and the first match wins.

use crate::models::AuctionItem;

/// Partition `items` into kept and rejected. Each rejection carries the term
/// (in its original casing) that matched. An empty filter set keeps
/// everything and does no work.
pub fn apply(
    items: Vec<AuctionItem>,
    filters: &[String],
) -> (Vec<AuctionItem>, Vec<(AuctionItem, String)>) {
    let active: Vec<(&str, String)> = filters
        .iter()
        .filter(|f| !f.is_empty())
        .map(|f| (f.as_str(), f.to_lowercase()))
        .collect();

    if active.is_empty() {
        return (items, Vec::new());
    }

    let mut kept = Vec::new();
    let mut rejected = Vec::new();

    for item in items {
        let title_lower = item.title.as_deref().unwrap_or("").to_lowercase();
        let matched = active
            .iter()
            .find(|(_, term)| !title_lower.is_empty() && title_lower.contains(term.as_str()))
            .map(|(original, _)| original.to_string());

        match matched {
            Some(term) => rejected.push((item, term)),
            None => kept.push(item),
        }
    }

    (kept, rejected)
}
