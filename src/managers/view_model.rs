//! View model for the bookmark screen.
//!
//! Owns the filter state, holds the live bookmark subscription for the current
//! user and re-derives the visible list whenever a snapshot arrives or a filter
//! input changes. Mutations go through thin wrappers that validate input and
//! annotate store errors with the action that failed.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::managers::bookmark_manager::BookmarkManagerTrait;
use crate::managers::feed_hub::Subscription;
use crate::services::filter_engine::FilterEngine;
use crate::services::link_format::{sanitize_title, sanitize_url};
use crate::types::bookmark::{Bookmark, BookmarkDraft, BookmarkPatch};
use crate::types::errors::{BookmarkAction, BookmarkActionError, BookmarkError};
use crate::types::filter::{CategoryFilter, FilterState};
use crate::types::settings::FeedSettings;
use crate::types::user::UserProfile;

/// Lifecycle of the bookmark feed for the selected user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Unsubscribed,
    /// Subscribed, first snapshot not yet applied.
    Subscribing,
    Live,
}

struct PendingQuery {
    query: String,
    deadline: Instant,
}

pub struct BookmarkViewModel<M> {
    manager: Arc<M>,
    engine: FilterEngine,
    debounce: Duration,
    user_id: Option<String>,
    subscription: Option<Subscription<Bookmark>>,
    state: FeedState,
    bookmarks: Vec<Bookmark>,
    visible: Vec<Bookmark>,
    filter: FilterState,
    pending: Option<PendingQuery>,
    raw_loading: bool,
    searching: bool,
}

impl<M: BookmarkManagerTrait> BookmarkViewModel<M> {
    pub fn new(manager: Arc<M>, settings: &FeedSettings) -> Self {
        Self {
            manager,
            engine: FilterEngine::new(settings.recent_limit),
            debounce: Duration::from_millis(settings.search_debounce_ms),
            user_id: None,
            subscription: None,
            state: FeedState::Unsubscribed,
            bookmarks: Vec::new(),
            visible: Vec::new(),
            filter: FilterState::default(),
            pending: None,
            raw_loading: false,
            searching: false,
        }
    }

    // ─── Session ───

    /// Switches the feed to another user.
    ///
    /// The previous subscription is torn down and all data cleared before the
    /// new one is opened, so nothing from the old user survives the switch.
    /// `None` or a blank id leaves the model unsubscribed.
    pub fn select_user(&mut self, user_id: Option<&str>) {
        if let Some(previous) = self.subscription.take() {
            previous.unsubscribe();
        }
        self.bookmarks.clear();
        self.visible.clear();
        self.pending = None;
        self.raw_loading = false;
        self.searching = false;
        self.state = FeedState::Unsubscribed;
        self.user_id = None;

        let Some(user_id) = user_id.map(str::trim).filter(|u| !u.is_empty()) else {
            debug!("no user selected, feed stays unsubscribed");
            return;
        };

        self.state = FeedState::Subscribing;
        self.raw_loading = true;
        match self.manager.subscribe(user_id) {
            Ok(subscription) => {
                info!(user_id, "bookmark feed subscribed");
                self.user_id = Some(user_id.to_string());
                self.subscription = Some(subscription);
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to subscribe to bookmarks");
                self.state = FeedState::Unsubscribed;
                self.raw_loading = false;
            }
        }
    }

    pub fn select_profile(&mut self, profile: &UserProfile) {
        self.select_user(Some(&profile.user_id));
    }

    /// Applies a pending snapshot if one is ready. Never waits.
    pub fn poll_snapshot(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.try_next() {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    fn apply_snapshot(&mut self, snapshot: Vec<Bookmark>) {
        debug!(count = snapshot.len(), "bookmark snapshot received");
        self.bookmarks = snapshot;
        self.raw_loading = false;
        self.state = FeedState::Live;
        self.refilter();
    }

    fn feed_closed(&mut self) {
        warn!(user_id = ?self.user_id, "bookmark feed closed");
        self.subscription = None;
        self.raw_loading = false;
        self.state = FeedState::Unsubscribed;
    }

    // ─── Filter state ───

    /// Applies a search query immediately and drops any debounced one.
    pub fn set_search_query(&mut self, query: &str) {
        self.pending = None;
        self.filter.search_query = query.to_string();
        self.refilter();
    }

    /// Records a query as typed. It takes effect once [`Self::settle_search`]
    /// has waited out the debounce window.
    pub fn type_search_query(&mut self, query: &str) {
        self.pending = Some(PendingQuery {
            query: query.to_string(),
            deadline: Instant::now() + self.debounce,
        });
    }

    pub fn pending_search(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.query.as_str())
    }

    pub fn set_selected_category(&mut self, category: impl Into<CategoryFilter>) {
        self.filter.category = category.into();
        self.refilter();
    }

    pub fn set_selected_tags(&mut self, tags: Vec<String>) {
        self.filter.tags = tags;
        self.refilter();
    }

    /// Adds the tag to the selection, or removes it if already selected.
    pub fn toggle_tag(&mut self, tag: &str) {
        match self.filter.tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.filter.tags.remove(index);
            }
            None => self.filter.tags.push(tag.to_string()),
        }
        self.refilter();
    }

    /// Replaces the whole filter state at once.
    pub fn set_filter(&mut self, filter: FilterState) {
        self.pending = None;
        self.filter = filter;
        self.refilter();
    }

    /// Re-derives the visible list from the raw set.
    ///
    /// With an active query the list is left as is and a store search is
    /// marked pending; [`Self::refresh_search`] or [`Self::search_now`] runs it.
    fn refilter(&mut self) {
        if self.filter.has_search() {
            self.searching = true;
            return;
        }
        self.searching = false;
        self.visible = self.engine.refine(self.bookmarks.clone(), &self.filter);
    }

    fn finish_search(&mut self, result: Result<Vec<Bookmark>, BookmarkError>) {
        self.visible = self.engine.derive(&self.bookmarks, &self.filter, |_| result);
        self.searching = false;
    }

    /// Runs a pending store search on the calling thread.
    ///
    /// Returns `false` if no search was pending.
    pub fn search_now(&mut self) -> bool {
        if !self.searching {
            return false;
        }
        let user_id = self.user_id.clone().unwrap_or_default();
        let result = self
            .manager
            .search_bookmarks(&user_id, self.filter.search_query.trim());
        self.finish_search(result);
        true
    }

    /// Applies new feed settings. The next derivation uses the new recent
    /// limit; the debounce applies to queries typed from now on.
    pub fn reconfigure(&mut self, settings: &FeedSettings) {
        self.engine = FilterEngine::new(settings.recent_limit);
        self.debounce = Duration::from_millis(settings.search_debounce_ms);
        info!(
            recent_limit = settings.recent_limit,
            debounce_ms = settings.search_debounce_ms,
            "feed settings applied"
        );
        self.refilter();
    }

    // ─── Accessors ───

    /// True while the raw feed has not delivered yet or a store search is
    /// pending or running.
    pub fn is_loading(&self) -> bool {
        self.raw_loading || self.searching
    }

    pub fn visible(&self) -> &[Bookmark] {
        &self.visible
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Every tag used by the current raw set, sorted and deduplicated.
    pub fn tag_names(&self) -> Vec<String> {
        self.bookmarks
            .iter()
            .flat_map(|b| b.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ─── Mutations ───

    fn active_user(&self, action: BookmarkAction) -> Result<&str, BookmarkActionError> {
        self.user_id
            .as_deref()
            .ok_or_else(|| BookmarkActionError::new(action, BookmarkError::Unauthenticated))
    }

    pub fn add_bookmark(&self, draft: BookmarkDraft) -> Result<String, BookmarkActionError> {
        let action = BookmarkAction::Add;
        let user_id = self.active_user(action)?;
        sanitize_title(&draft.title).map_err(|e| BookmarkActionError::new(action, e))?;
        sanitize_url(&draft.url).map_err(|e| BookmarkActionError::new(action, e))?;
        self.manager.add_bookmark(user_id, draft).map_err(|e| {
            error!(user_id, error = %e, "error adding bookmark");
            BookmarkActionError::new(action, e)
        })
    }

    pub fn update_bookmark(&self, id: &str, patch: BookmarkPatch) -> Result<(), BookmarkActionError> {
        let action = BookmarkAction::Update;
        let user_id = self.active_user(action)?;
        if let Some(title) = patch.title.as_deref() {
            sanitize_title(title).map_err(|e| BookmarkActionError::new(action, e))?;
        }
        if let Some(url) = patch.url.as_deref() {
            sanitize_url(url).map_err(|e| BookmarkActionError::new(action, e))?;
        }
        self.manager.update_bookmark(user_id, id, patch).map_err(|e| {
            error!(user_id, bookmark_id = id, error = %e, "error updating bookmark");
            BookmarkActionError::new(action, e)
        })
    }

    pub fn delete_bookmark(&self, id: &str) -> Result<(), BookmarkActionError> {
        let action = BookmarkAction::Delete;
        let user_id = self.active_user(action)?;
        self.manager.remove_bookmark(user_id, id).map_err(|e| {
            error!(user_id, bookmark_id = id, error = %e, "error deleting bookmark");
            BookmarkActionError::new(action, e)
        })
    }

    /// Records an open. Failures are logged and never reach the caller.
    pub fn handle_bookmark_click(&self, id: &str) {
        let Some(user_id) = self.user_id.as_deref() else {
            warn!(bookmark_id = id, "click ignored, no user selected");
            return;
        };
        if let Err(e) = self.manager.increment_click(user_id, id) {
            warn!(user_id, bookmark_id = id, error = %e, "failed to record bookmark click");
        }
    }
}

impl<M: BookmarkManagerTrait + Send + Sync + 'static> BookmarkViewModel<M> {
    /// Waits for the next pushed snapshot and applies it, rerunning the
    /// active search against the new data.
    ///
    /// Returns `false` when there is no subscription or the feed has closed.
    pub async fn next_snapshot(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        match subscription.next().await {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                self.refresh_search().await;
                true
            }
            None => {
                self.feed_closed();
                false
            }
        }
    }

    /// Sleeps until the debounce deadline of the last typed query, then
    /// applies it and runs the search. Returns `false` if nothing was pending.
    pub async fn settle_search(&mut self) -> bool {
        let Some(pending) = self.pending.take() else {
            return false;
        };
        tokio::time::sleep_until(pending.deadline).await;
        self.filter.search_query = pending.query;
        self.refilter();
        self.refresh_search().await;
        true
    }

    /// Runs a pending store search on the blocking pool. `is_loading()`
    /// stays true until it has been applied.
    ///
    /// Returns `false` if no search was pending.
    pub async fn refresh_search(&mut self) -> bool {
        if !self.searching {
            return false;
        }
        let manager = Arc::clone(&self.manager);
        let user_id = self.user_id.clone().unwrap_or_default();
        let term = self.filter.search_query.trim().to_string();
        debug!(query = %term, "search started");
        let result = tokio::task::spawn_blocking(move || manager.search_bookmarks(&user_id, &term))
            .await
            .unwrap_or_else(|e| Err(BookmarkError::DatabaseError(format!("search task failed: {}", e))));
        self.finish_search(result);
        true
    }
}
