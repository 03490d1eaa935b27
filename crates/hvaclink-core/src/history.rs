// ── Device history log ──
//
// Accumulates pages of the history endpoint. Page 1 starts a new log (for
// a possibly new search); later pages append.

use std::sync::{Arc, PoisonError, RwLock};

use hvaclink_api::models::HistoryPage;

use crate::model::{HistoryEntry, Pagination};

#[derive(Debug, Default)]
struct HistoryState {
    search: String,
    entries: Vec<HistoryEntry>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Default)]
pub struct HistoryLog {
    state: RwLock<HistoryState>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a fetched page.
    pub fn apply_page(&self, search: &str, page: HistoryPage) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if page.pagination.page <= 1 || state.search != search {
            state.entries = page.metadata;
            state.search = search.to_owned();
        } else {
            state.entries.extend(page.metadata);
        }
        state.pagination = Some(page.pagination);
    }

    pub fn entries(&self) -> Arc<[HistoryEntry]> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::from(state.entries.as_slice())
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pagination
    }

    pub fn search(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .search
            .clone()
    }

    /// The page to fetch next, if the backend reported one.
    pub fn next_page(&self) -> Option<u32> {
        self.pagination()
            .filter(|p| p.has_next_page)
            .map(|p| p.page.saturating_add(1))
    }

    pub fn has_more(&self) -> bool {
        self.next_page().is_some()
    }

    pub fn clear(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = HistoryState::default();
    }
}
