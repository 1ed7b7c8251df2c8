//! Tests for the bookmark view model: feed lifecycle, user switching, filter
//! re-derivation, debounced search and mutation error translation.

use std::sync::Arc;
use std::time::Duration;

use shelfmark::database::Database;
use shelfmark::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use shelfmark::managers::feed_hub::{FeedHub, Subscription};
use shelfmark::managers::view_model::{BookmarkViewModel, FeedState};
use shelfmark::types::bookmark::{Bookmark, BookmarkDraft, BookmarkPatch};
use shelfmark::types::errors::BookmarkError;
use shelfmark::types::filter::CategoryFilter;
use shelfmark::types::settings::FeedSettings;
use shelfmark::types::user::UserProfile;

fn settings(debounce_ms: u64) -> FeedSettings {
    FeedSettings {
        recent_limit: 20,
        search_debounce_ms: debounce_ms,
    }
}

fn setup() -> (Arc<BookmarkManager>, BookmarkViewModel<BookmarkManager>) {
    let store = Arc::new(BookmarkManager::new(Arc::new(
        Database::open_in_memory().expect("open_in_memory failed"),
    )));
    let vm = BookmarkViewModel::new(store.clone(), &settings(20));
    (store, vm)
}

fn titles(bookmarks: &[Bookmark]) -> Vec<&str> {
    bookmarks.iter().map(|b| b.title.as_str()).collect()
}

/// Store whose every write fails, to observe error translation.
struct BrokenStore {
    feed: FeedHub<Bookmark>,
}

impl BrokenStore {
    fn new() -> Self {
        Self {
            feed: FeedHub::new("broken"),
        }
    }

    fn offline<T>() -> Result<T, BookmarkError> {
        Err(BookmarkError::DatabaseError("offline".to_string()))
    }
}

impl BookmarkManagerTrait for BrokenStore {
    fn subscribe(&self, user_id: &str) -> Result<Subscription<Bookmark>, BookmarkError> {
        Ok(self.feed.subscribe(user_id, Vec::new()))
    }
    fn list_bookmarks(&self, _: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        Self::offline()
    }
    fn get_bookmark(&self, _: &str, _: &str) -> Result<Bookmark, BookmarkError> {
        Self::offline()
    }
    fn add_bookmark(&self, _: &str, _: BookmarkDraft) -> Result<String, BookmarkError> {
        Self::offline()
    }
    fn update_bookmark(&self, _: &str, _: &str, _: BookmarkPatch) -> Result<(), BookmarkError> {
        Self::offline()
    }
    fn remove_bookmark(&self, _: &str, _: &str) -> Result<(), BookmarkError> {
        Self::offline()
    }
    fn increment_click(&self, _: &str, _: &str) -> Result<(), BookmarkError> {
        Self::offline()
    }
    fn search_bookmarks(&self, _: &str, _: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        Self::offline()
    }
}

// ─── Feed lifecycle ───

#[tokio::test]
async fn test_select_user_goes_live_after_first_snapshot() {
    let (store, mut vm) = setup();
    store.add_bookmark("u1", BookmarkDraft::new("Example", "example.com")).unwrap();

    assert_eq!(vm.state(), FeedState::Unsubscribed);
    vm.select_user(Some("u1"));
    assert_eq!(vm.state(), FeedState::Subscribing);
    assert!(vm.is_loading());

    assert!(vm.next_snapshot().await);
    assert_eq!(vm.state(), FeedState::Live);
    assert!(!vm.is_loading());
    assert_eq!(titles(vm.visible()), vec!["Example"]);
    assert_eq!(vm.visible()[0].url, "https://example.com");
}

#[tokio::test]
async fn test_mutations_arrive_through_the_feed() {
    let (_store, mut vm) = setup();
    vm.select_user(Some("u1"));
    vm.next_snapshot().await;

    let id = vm.add_bookmark(BookmarkDraft::new("Fresh", "fresh.io")).unwrap();
    assert!(vm.visible().is_empty(), "view changes only when the push is applied");
    assert!(vm.next_snapshot().await);
    assert_eq!(vm.visible()[0].id, id);

    vm.handle_bookmark_click(&id);
    vm.next_snapshot().await;
    assert_eq!(vm.bookmarks()[0].click_count, 1);

    vm.delete_bookmark(&id).unwrap();
    vm.next_snapshot().await;
    assert!(vm.visible().is_empty());
}

#[test]
fn test_switching_users_drops_previous_data() {
    let (store, mut vm) = setup();
    store.add_bookmark("alice", BookmarkDraft::new("Alice's", "a.io")).unwrap();
    store.add_bookmark("bob", BookmarkDraft::new("Bob's", "b.io")).unwrap();

    vm.select_user(Some("alice"));
    vm.poll_snapshot();
    assert_eq!(titles(vm.visible()), vec!["Alice's"]);

    vm.select_profile(&UserProfile::new("bob"));
    assert!(vm.visible().is_empty());
    assert!(vm.bookmarks().is_empty());
    assert_eq!(vm.user_id(), Some("bob"));

    vm.poll_snapshot();
    assert_eq!(titles(vm.visible()), vec!["Bob's"]);

    store.add_bookmark("alice", BookmarkDraft::new("Late", "late.io")).unwrap();
    assert!(!vm.poll_snapshot(), "old user's pushes must not reach the view");
}

#[test]
fn test_signing_out_unsubscribes() {
    let (store, mut vm) = setup();
    vm.select_user(Some("u1"));
    vm.poll_snapshot();
    vm.select_user(None);

    assert_eq!(vm.state(), FeedState::Unsubscribed);
    assert_eq!(vm.user_id(), None);
    store.add_bookmark("u1", BookmarkDraft::new("A", "a.io")).unwrap();
    assert!(!vm.poll_snapshot());
}

// ─── Filters ───

#[test]
fn test_filter_setters_rederive_immediately() {
    let (store, mut vm) = setup();
    store
        .add_bookmark("u1", BookmarkDraft::new("Work A", "a.io").with_category("work").with_tags(["work", "urgent"]))
        .unwrap();
    store
        .add_bookmark("u1", BookmarkDraft::new("Work B", "b.io").with_category("work").with_tags(["work"]).favorite())
        .unwrap();
    store
        .add_bookmark("u1", BookmarkDraft::new("Home", "c.io").with_category("home"))
        .unwrap();
    vm.select_user(Some("u1"));
    vm.poll_snapshot();
    assert_eq!(vm.visible().len(), 3);

    vm.set_selected_category("work");
    assert_eq!(titles(vm.visible()), vec!["Work B", "Work A"]);

    vm.toggle_tag("urgent");
    assert_eq!(titles(vm.visible()), vec!["Work A"]);

    vm.set_selected_category(CategoryFilter::Favorites);
    assert!(vm.visible().is_empty());

    vm.set_selected_tags(Vec::new());
    assert_eq!(titles(vm.visible()), vec!["Work B"]);

    assert_eq!(vm.tag_names(), vec!["urgent".to_string(), "work".to_string()]);
}

#[tokio::test]
async fn test_search_query_uses_store_search() {
    let (store, mut vm) = setup();
    store.add_bookmark("u1", BookmarkDraft::new("GitHub", "github.com")).unwrap();
    store.add_bookmark("u1", BookmarkDraft::new("Gitignore Guide", "docs.io")).unwrap();
    store.add_bookmark("u1", BookmarkDraft::new("Recipes", "food.io")).unwrap();
    vm.select_user(Some("u1"));
    vm.poll_snapshot();
    assert!(!vm.is_loading());

    vm.set_search_query("git");
    assert!(vm.is_loading(), "search is in flight until refreshed");
    assert_eq!(vm.visible().len(), 3, "previous list stays while searching");

    assert!(vm.refresh_search().await);
    assert!(!vm.is_loading());
    assert_eq!(titles(vm.visible()), vec!["Gitignore Guide", "GitHub"]);

    vm.set_search_query("");
    assert!(!vm.is_loading());
    assert_eq!(vm.visible().len(), 3);
}

#[tokio::test]
async fn test_new_snapshot_reruns_active_search() {
    let (store, mut vm) = setup();
    store.add_bookmark("u1", BookmarkDraft::new("Rust Book", "rust.io")).unwrap();
    vm.select_user(Some("u1"));
    vm.next_snapshot().await;
    vm.set_search_query("rust");
    vm.refresh_search().await;
    assert_eq!(titles(vm.visible()), vec!["Rust Book"]);

    store.add_bookmark("u1", BookmarkDraft::new("Rust Nomicon", "nomicon.io")).unwrap();
    assert!(vm.next_snapshot().await);
    assert!(!vm.is_loading());
    assert_eq!(titles(vm.visible()), vec!["Rust Nomicon", "Rust Book"]);
}

#[test]
fn test_search_now_runs_pending_search_inline() {
    let (store, mut vm) = setup();
    store.add_bookmark("u1", BookmarkDraft::new("GitHub", "github.com")).unwrap();
    vm.select_user(Some("u1"));
    vm.poll_snapshot();

    assert!(!vm.search_now(), "nothing pending without a query");
    vm.set_search_query("hub");
    assert!(vm.is_loading());
    assert!(vm.search_now());
    assert!(!vm.is_loading());
    assert_eq!(titles(vm.visible()), vec!["GitHub"]);
}

#[test]
fn test_reconfigure_applies_new_recent_limit() {
    let (store, mut vm) = setup();
    for n in 0..4 {
        store.add_bookmark("u1", BookmarkDraft::new(&format!("B{}", n), "a.io")).unwrap();
    }
    vm.select_user(Some("u1"));
    vm.poll_snapshot();
    vm.set_selected_category(CategoryFilter::Recent);
    assert_eq!(vm.visible().len(), 4);

    vm.reconfigure(&FeedSettings {
        recent_limit: 2,
        search_debounce_ms: 0,
    });
    assert_eq!(vm.visible().len(), 2);
}

#[tokio::test]
async fn test_typed_query_applies_after_debounce() {
    let (store, mut vm) = setup();
    store.add_bookmark("u1", BookmarkDraft::new("Rust Book", "rust.io")).unwrap();
    store.add_bookmark("u1", BookmarkDraft::new("Go Tour", "go.io")).unwrap();
    vm.select_user(Some("u1"));
    vm.next_snapshot().await;

    vm.type_search_query("ru");
    vm.type_search_query("rust");
    assert_eq!(vm.pending_search(), Some("rust"));
    assert_eq!(vm.visible().len(), 2, "typing alone does not filter");

    let started = tokio::time::Instant::now();
    assert!(vm.settle_search().await);
    assert!(started.elapsed() >= Duration::from_millis(15));
    assert_eq!(titles(vm.visible()), vec!["Rust Book"]);
    assert_eq!(vm.filter().search_query, "rust");

    assert!(!vm.settle_search().await);
}

#[test]
fn test_immediate_query_cancels_pending_one() {
    let (_store, mut vm) = setup();
    vm.type_search_query("stale");
    vm.set_search_query("fresh");
    assert_eq!(vm.pending_search(), None);
    assert_eq!(vm.filter().search_query, "fresh");
}

// ─── Mutations ───

#[test]
fn test_validation_happens_before_the_store() {
    let store = Arc::new(BrokenStore::new());
    let mut vm = BookmarkViewModel::new(store, &settings(0));
    vm.select_user(Some("u1"));

    let err = vm.add_bookmark(BookmarkDraft::new("", "a.io")).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.to_string(), "Failed to add bookmark: Title is required");

    let patch = BookmarkPatch {
        url: Some(" ".to_string()),
        ..BookmarkPatch::default()
    };
    let err = vm.update_bookmark("b1", patch).unwrap_err();
    assert_eq!(err.to_string(), "Failed to update bookmark: URL is required");
}

#[test]
fn test_backend_failures_are_annotated() {
    let store = Arc::new(BrokenStore::new());
    let mut vm = BookmarkViewModel::new(store, &settings(0));
    vm.select_user(Some("u1"));

    let err = vm.add_bookmark(BookmarkDraft::new("A", "a.io")).unwrap_err();
    assert!(!err.is_validation());
    assert_eq!(err.to_string(), "Failed to add bookmark: Bookmark database error: offline");

    let err = vm.delete_bookmark("b1").unwrap_err();
    assert_eq!(err.to_string(), "Failed to delete bookmark: Bookmark database error: offline");

    vm.handle_bookmark_click("b1");
}

#[test]
fn test_failed_search_degrades_to_empty() {
    let store = Arc::new(BrokenStore::new());
    let mut vm = BookmarkViewModel::new(store, &settings(0));
    vm.select_user(Some("u1"));
    vm.poll_snapshot();
    vm.set_search_query("anything");
    assert!(vm.is_loading());
    assert!(vm.search_now());
    assert!(vm.visible().is_empty());
    assert!(!vm.is_loading());
}

#[test]
fn test_update_through_view_model() {
    let (store, mut vm) = setup();
    let id = store.add_bookmark("u1", BookmarkDraft::new("Old", "a.io")).unwrap();
    vm.select_user(Some("u1"));
    vm.poll_snapshot();

    let patch = BookmarkPatch {
        title: Some("New".to_string()),
        ..BookmarkPatch::default()
    };
    vm.update_bookmark(&id, patch).unwrap();
    vm.poll_snapshot();
    assert_eq!(titles(vm.visible()), vec!["New"]);

    let missing = vm
        .update_bookmark("missing", BookmarkPatch::default())
        .unwrap_err();
    assert_eq!(
        missing.to_string(),
        "Failed to update bookmark: Bookmark not found: missing"
    );
}
