//! List composition: sorting, tag filtering, and search.
//!
//! Thin functions over [`WalkStore`] reads so list surfaces share one
//! filtering vocabulary. Tag filtering runs in memory on an already-loaded
//! list; sorting and search push down to the store.

use crate::error::Result;
use crate::store::WalkStore;
use crate::types::{SortOrder, Tag, Walk};

/// All saved walks in the given order.
pub fn sorted_walks(store: &WalkStore, order: SortOrder) -> Result<Vec<Walk>> {
    store.walks(order)
}

/// Keep walks sharing at least one tag with the selection.
///
/// An empty selection means no filter is applied: the list comes back
/// unchanged. A non-empty selection matching nothing returns an empty vec;
/// the caller decides whether to offer clearing the filter.
pub fn filter_by_tags(walks: Vec<Walk>, selected: &[Tag]) -> Vec<Walk> {
    if selected.is_empty() {
        return walks;
    }
    walks
        .into_iter()
        .filter(|walk| walk.has_any_tag(selected))
        .collect()
}

/// Full-text search over walk names, descriptions, and tags.
pub fn search(store: &WalkStore, query: &str, order: SortOrder) -> Result<Vec<Walk>> {
    store.search(query, order)
}
