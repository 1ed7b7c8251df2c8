//! Filter/search engine for the bookmark view.
//!
//! Derives the visible bookmark list from the raw snapshot and a [`FilterState`],
//! in a fixed order:
//!
//! 1. search (delegated to the store's table scan when the query is non-blank)
//! 2. category selector (`favorites`, `recent`, `all` or a concrete id)
//! 3. tag conjunction (every selected tag must be present)
//! 4. newest-first sort by `created_at`, truncated for `recent`
//!
//! The derivation is deterministic: the sort is stable, so equal timestamps
//! keep the order of the input snapshot.

use tracing::{debug, warn};

use crate::types::bookmark::Bookmark;
use crate::types::errors::BookmarkError;
use crate::types::filter::{CategoryFilter, FilterState};

/// Default number of bookmarks shown for the `recent` selector.
pub const RECENT_LIMIT: usize = 20;

/// Lowercases and trims a raw search term.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Case-insensitive match of an already-normalized term against a bookmark.
///
/// Checks substrings of title, URL, notes and each tag, plus a prefix match on
/// the individual words of the title.
pub fn matches_search(bookmark: &Bookmark, term: &str) -> bool {
    let title = bookmark.title.to_lowercase();
    if title.contains(term) || bookmark.url.to_lowercase().contains(term) {
        return true;
    }
    if let Some(notes) = &bookmark.notes {
        if notes.to_lowercase().contains(term) {
            return true;
        }
    }
    if bookmark.tags.iter().any(|tag| tag.to_lowercase().contains(term)) {
        return true;
    }
    title.split_whitespace().any(|word| word.starts_with(term))
}

/// Full scan of `bookmarks` for `term`. A blank term keeps everything.
pub fn search_in(bookmarks: &[Bookmark], term: &str) -> Vec<Bookmark> {
    let term = normalize_term(term);
    if term.is_empty() {
        return bookmarks.to_vec();
    }
    bookmarks
        .iter()
        .filter(|b| matches_search(b, &term))
        .cloned()
        .collect()
}

/// Stateless derivation of the visible list, parameterised by the recent limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterEngine {
    recent_limit: usize,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(RECENT_LIMIT)
    }
}

impl FilterEngine {
    pub fn new(recent_limit: usize) -> Self {
        Self { recent_limit }
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    /// Runs all four stages.
    ///
    /// `search` performs the store round-trip for a non-blank query. If it fails
    /// the failure is logged and the working set degrades to empty.
    pub fn derive<F>(&self, raw: &[Bookmark], filter: &FilterState, search: F) -> Vec<Bookmark>
    where
        F: FnOnce(&str) -> Result<Vec<Bookmark>, BookmarkError>,
    {
        let working = if filter.has_search() {
            match search(filter.search_query.trim()) {
                Ok(results) => {
                    debug!(
                        query = %filter.search_query,
                        results = results.len(),
                        "search returned"
                    );
                    results
                }
                Err(e) => {
                    warn!(query = %filter.search_query, error = %e, "search failed, showing no results");
                    Vec::new()
                }
            }
        } else {
            raw.to_vec()
        };
        self.refine(working, filter)
    }

    /// Stages 2–4: category, tags, sort and recent truncation.
    pub fn refine(&self, mut working: Vec<Bookmark>, filter: &FilterState) -> Vec<Bookmark> {
        match &filter.category {
            CategoryFilter::Favorites => working.retain(|b| b.is_favorite),
            CategoryFilter::Category(id) => working.retain(|b| &b.category == id),
            CategoryFilter::All | CategoryFilter::Recent => {}
        }

        if !filter.tags.is_empty() {
            working.retain(|b| filter.tags.iter().all(|tag| b.has_tag(tag)));
        }

        working.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if filter.category == CategoryFilter::Recent {
            working.truncate(self.recent_limit);
        }
        working
    }
}
