// 🔎 Search Filter - pure functions over a registry snapshot

use crate::registration::FalconRegistration;

/// Case-insensitive substring match of `query` against names only.
///
/// An empty query returns the input unchanged. Input order is kept.
pub fn filter(records: &[FalconRegistration], query: &str) -> Vec<FalconRegistration> {
    if query.is_empty() {
        return records.to_vec();
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Registration order (oldest first)
    #[default]
    Created,
    /// Most recently registered first
    Newest,
    /// Alphabetical, ignoring case
    Name,
}

/// Reorder a snapshot for display. `records` must be in registration order,
/// as returned by `RegistryStore::list`.
pub fn sort(records: &[FalconRegistration], order: SortOrder) -> Vec<FalconRegistration> {
    let mut sorted = records.to_vec();
    match order {
        SortOrder::Created => {}
        SortOrder::Newest => sorted.reverse(),
        SortOrder::Name => sorted.sort_by_key(|r| r.name.to_lowercase()),
    }
    sorted
}
