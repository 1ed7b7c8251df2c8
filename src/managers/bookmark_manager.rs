//! Bookmark Manager for shelfmark.
//!
//! Implements `BookmarkManagerTrait`: per-user CRUD, click tracking, search and
//! live snapshot feeds for bookmarks, backed by SQLite via `rusqlite`.
//!
//! Category, tag and import/export operations are implemented on the same
//! [`BookmarkManager`] in their own modules; they share its connection and feeds.

use std::sync::Arc;

use rusqlite::{params, types::Type, Connection, OptionalExtension};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::Database;
use crate::managers::category_manager::category_exists;
use crate::managers::feed_hub::{FeedHub, Subscription};
use crate::managers::tag_manager::apply_tag_delta;
use crate::services::filter_engine::search_in;
use crate::services::link_format::{
    favicon_url, normalize_notes, normalize_tags, sanitize_title, sanitize_url,
};
use crate::types::bookmark::{Bookmark, BookmarkDraft, BookmarkPatch, Category, Tag};
use crate::types::errors::BookmarkError;
use crate::types::timestamp::Timestamp;

const SELECT_BOOKMARK: &str = "SELECT id, title, url, category, tags, notes, favicon, image_url, \
     is_favorite, click_count, position, created_at, updated_at FROM bookmarks";

/// Trait defining bookmark management operations.
pub trait BookmarkManagerTrait {
    /// Live feed of the user's full bookmark collection, newest first.
    fn subscribe(&self, user_id: &str) -> Result<Subscription<Bookmark>, BookmarkError>;
    fn list_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, BookmarkError>;
    fn get_bookmark(&self, user_id: &str, id: &str) -> Result<Bookmark, BookmarkError>;
    fn add_bookmark(&self, user_id: &str, draft: BookmarkDraft) -> Result<String, BookmarkError>;
    fn update_bookmark(&self, user_id: &str, id: &str, patch: BookmarkPatch) -> Result<(), BookmarkError>;
    fn remove_bookmark(&self, user_id: &str, id: &str) -> Result<(), BookmarkError>;
    fn increment_click(&self, user_id: &str, id: &str) -> Result<(), BookmarkError>;
    fn search_bookmarks(&self, user_id: &str, term: &str) -> Result<Vec<Bookmark>, BookmarkError>;
}

/// Bookmark store backed by a shared SQLite database.
pub struct BookmarkManager {
    pub(crate) db: Arc<Database>,
    pub(crate) bookmark_feed: FeedHub<Bookmark>,
    pub(crate) category_feed: FeedHub<Category>,
    pub(crate) tag_feed: FeedHub<Tag>,
}

pub(crate) fn db_err(e: rusqlite::Error) -> BookmarkError {
    BookmarkError::DatabaseError(e.to_string())
}

/// Rejects blank user ids before any SQL runs.
pub(crate) fn require_user(user_id: &str) -> Result<&str, BookmarkError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(BookmarkError::Unauthenticated);
    }
    Ok(user_id)
}

/// Reads a single `Bookmark` row into a struct.
fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
    let tags_json: String = row.get(4)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Bookmark {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        category: row.get(3)?,
        tags,
        notes: row.get(5)?,
        favicon: row.get(6)?,
        image_url: row.get(7)?,
        is_favorite: row.get(8)?,
        click_count: row.get(9)?,
        position: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Loads the user's bookmarks ordered newest first; `position` breaks ties.
pub(crate) fn load_bookmarks(conn: &Connection, user_id: &str) -> Result<Vec<Bookmark>, BookmarkError> {
    let mut stmt = conn
        .prepare(&format!(
            "{} WHERE user_id = ?1 ORDER BY created_at DESC, position DESC",
            SELECT_BOOKMARK
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![user_id], row_to_bookmark)
        .map_err(db_err)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(db_err)?);
    }
    Ok(results)
}

pub(crate) fn fetch_bookmark(
    conn: &Connection,
    user_id: &str,
    id: &str,
) -> Result<Option<Bookmark>, BookmarkError> {
    conn.query_row(
        &format!("{} WHERE user_id = ?1 AND id = ?2", SELECT_BOOKMARK),
        params![user_id, id],
        row_to_bookmark,
    )
    .optional()
    .map_err(db_err)
}

/// Inserts or fully overwrites a bookmark row keyed by `(user_id, id)`.
pub(crate) fn upsert_bookmark(conn: &Connection, user_id: &str, bookmark: &Bookmark) -> Result<(), BookmarkError> {
    let tags = serde_json::to_string(&bookmark.tags)
        .map_err(|e| BookmarkError::SerializationError(e.to_string()))?;
    conn.execute(
        "INSERT OR REPLACE INTO bookmarks (user_id, id, title, url, category, tags, notes, favicon, \
         image_url, is_favorite, click_count, position, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            user_id,
            bookmark.id,
            bookmark.title,
            bookmark.url,
            bookmark.category,
            tags,
            bookmark.notes,
            bookmark.favicon,
            bookmark.image_url,
            bookmark.is_favorite,
            bookmark.click_count,
            bookmark.position,
            bookmark.created_at,
            bookmark.updated_at,
        ],
    )
    .map_err(db_err)?;
    Ok(())
}

fn count_bookmarks(conn: &Connection, user_id: &str) -> Result<i32, BookmarkError> {
    conn.query_row(
        "SELECT COUNT(*) FROM bookmarks WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .map_err(db_err)
}

/// Rewrites `position` as 0..n following the current order.
pub(crate) fn repack_positions(conn: &Connection, user_id: &str) -> Result<(), BookmarkError> {
    let ids: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT id FROM bookmarks WHERE user_id = ?1 ORDER BY position, created_at")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![user_id], |row| row.get(0))
            .map_err(db_err)?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.map_err(db_err)?);
        }
        ids
    };
    for (position, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE bookmarks SET position = ?1 WHERE user_id = ?2 AND id = ?3",
            params![position as i32, user_id, id],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

/// Validates every field a patch touches, before any database access.
fn sanitize_patch(mut patch: BookmarkPatch) -> Result<BookmarkPatch, BookmarkError> {
    patch.title = patch.title.as_deref().map(sanitize_title).transpose()?;
    patch.url = patch.url.as_deref().map(sanitize_url).transpose()?;
    patch.category = patch.category.as_deref().map(|c| c.trim().to_string());
    patch.tags = patch.tags.as_deref().map(normalize_tags);
    patch.notes = patch.notes.map(|notes| normalize_notes(notes.as_deref()));
    Ok(patch)
}

fn apply_patch(bookmark: &mut Bookmark, patch: BookmarkPatch) {
    if let Some(title) = patch.title {
        bookmark.title = title;
    }
    if let Some(url) = patch.url {
        bookmark.url = url;
    }
    if let Some(category) = patch.category {
        bookmark.category = category;
    }
    if let Some(tags) = patch.tags {
        bookmark.tags = tags;
    }
    if let Some(notes) = patch.notes {
        bookmark.notes = notes;
    }
    if let Some(favicon) = patch.favicon {
        bookmark.favicon = favicon;
    }
    if let Some(image_url) = patch.image_url {
        bookmark.image_url = image_url;
    }
    if let Some(is_favorite) = patch.is_favorite {
        bookmark.is_favorite = is_favorite;
    }
}

/// Tags in `a` that are not in `b`.
fn tag_difference(a: &[String], b: &[String]) -> Vec<String> {
    a.iter().filter(|t| !b.contains(t)).cloned().collect()
}

impl BookmarkManager {
    /// Creates a new `BookmarkManager` over the shared database.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            bookmark_feed: FeedHub::new("bookmarks"),
            category_feed: FeedHub::new("categories"),
            tag_feed: FeedHub::new("tags"),
        }
    }

    /// Pushes a fresh bookmark snapshot to the user's subscribers, if any.
    ///
    /// A failed load is logged and published as an empty list.
    pub(crate) fn publish_bookmarks(&self, user_id: &str) {
        if !self.bookmark_feed.has_subscribers(user_id) {
            return;
        }
        let snapshot = self.list_bookmarks(user_id).unwrap_or_else(|e| {
            error!(user_id, error = %e, "failed to load bookmarks for feed");
            Vec::new()
        });
        debug!(user_id, count = snapshot.len(), "publishing bookmarks");
        self.bookmark_feed.publish(user_id, snapshot);
    }

    /// Convenience for operations that touch all three collections.
    pub(crate) fn publish_all(&self, user_id: &str) {
        self.publish_bookmarks(user_id);
        self.publish_categories(user_id);
        self.publish_tags(user_id);
    }
}

impl BookmarkManagerTrait for BookmarkManager {
    fn subscribe(&self, user_id: &str) -> Result<Subscription<Bookmark>, BookmarkError> {
        let user_id = require_user(user_id)?;
        info!(user_id, "subscribing to bookmarks");
        let current = self.list_bookmarks(user_id).unwrap_or_else(|e| {
            error!(user_id, error = %e, "error listening to bookmarks");
            Vec::new()
        });
        Ok(self.bookmark_feed.subscribe(user_id, current))
    }

    fn list_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        let user_id = require_user(user_id)?;
        let conn = self.db.connection();
        load_bookmarks(&conn, user_id)
    }

    fn get_bookmark(&self, user_id: &str, id: &str) -> Result<Bookmark, BookmarkError> {
        let user_id = require_user(user_id)?;
        let conn = self.db.connection();
        fetch_bookmark(&conn, user_id, id)?.ok_or_else(|| BookmarkError::NotFound(id.to_string()))
    }

    /// Adds a new bookmark. Returns the generated bookmark ID.
    fn add_bookmark(&self, user_id: &str, draft: BookmarkDraft) -> Result<String, BookmarkError> {
        let user_id = require_user(user_id)?;
        let title = sanitize_title(&draft.title)?;
        let url = sanitize_url(&draft.url)?;
        let tags = normalize_tags(&draft.tags);
        let favicon = draft
            .favicon
            .filter(|f| !f.trim().is_empty())
            .or_else(|| favicon_url(&url));
        let category = draft.category.trim().to_string();

        let id = Uuid::new_v4().to_string();
        let now = Timestamp::now();
        let has_tags = !tags.is_empty();
        {
            let mut conn = self.db.connection();
            let tx = conn.transaction().map_err(db_err)?;

            if category.is_empty() {
                debug!(user_id, "no category specified for new bookmark");
            } else if !category_exists(&tx, user_id, &category)? {
                warn!(user_id, category = %category, "category not found, keeping the reference");
            }

            let bookmark = Bookmark {
                id: id.clone(),
                title,
                url,
                category,
                tags,
                notes: normalize_notes(draft.notes.as_deref()),
                favicon,
                image_url: draft.image_url,
                is_favorite: draft.is_favorite,
                click_count: 0,
                position: count_bookmarks(&tx, user_id)?,
                created_at: now,
                updated_at: now,
            };
            upsert_bookmark(&tx, user_id, &bookmark)?;
            apply_tag_delta(&tx, user_id, &bookmark.tags, &[])?;
            tx.commit().map_err(db_err)?;
        }

        info!(user_id, bookmark_id = %id, "bookmark added");
        self.publish_bookmarks(user_id);
        if has_tags {
            self.publish_tags(user_id);
        }
        Ok(id)
    }

    /// Merges the patch into an existing bookmark and refreshes `updated_at`.
    fn update_bookmark(&self, user_id: &str, id: &str, patch: BookmarkPatch) -> Result<(), BookmarkError> {
        let user_id = require_user(user_id)?;
        let patch = sanitize_patch(patch)?;

        let tags_changed = {
            let mut conn = self.db.connection();
            let tx = conn.transaction().map_err(db_err)?;

            let mut bookmark = fetch_bookmark(&tx, user_id, id)?
                .ok_or_else(|| BookmarkError::NotFound(id.to_string()))?;
            let old_tags = bookmark.tags.clone();
            apply_patch(&mut bookmark, patch);
            bookmark.updated_at = Timestamp::now();
            upsert_bookmark(&tx, user_id, &bookmark)?;

            let added = tag_difference(&bookmark.tags, &old_tags);
            let removed = tag_difference(&old_tags, &bookmark.tags);
            apply_tag_delta(&tx, user_id, &added, &removed)?;
            tx.commit().map_err(db_err)?;
            !added.is_empty() || !removed.is_empty()
        };

        debug!(user_id, bookmark_id = id, tags_changed, "bookmark updated");
        self.publish_bookmarks(user_id);
        if tags_changed {
            self.publish_tags(user_id);
        }
        Ok(())
    }

    /// Removes a bookmark by ID. Removing an unknown ID is a no-op.
    fn remove_bookmark(&self, user_id: &str, id: &str) -> Result<(), BookmarkError> {
        let user_id = require_user(user_id)?;

        let removed = {
            let mut conn = self.db.connection();
            let tx = conn.transaction().map_err(db_err)?;
            match fetch_bookmark(&tx, user_id, id)? {
                None => None,
                Some(bookmark) => {
                    tx.execute(
                        "DELETE FROM bookmarks WHERE user_id = ?1 AND id = ?2",
                        params![user_id, id],
                    )
                    .map_err(db_err)?;
                    tx.execute(
                        "UPDATE bookmarks SET position = position - 1 WHERE user_id = ?1 AND position > ?2",
                        params![user_id, bookmark.position],
                    )
                    .map_err(db_err)?;
                    apply_tag_delta(&tx, user_id, &[], &bookmark.tags)?;
                    tx.commit().map_err(db_err)?;
                    Some(bookmark)
                }
            }
        };

        match removed {
            None => {
                debug!(user_id, bookmark_id = id, "remove of unknown bookmark ignored");
            }
            Some(bookmark) => {
                info!(user_id, bookmark_id = id, "bookmark removed");
                self.publish_bookmarks(user_id);
                if !bookmark.tags.is_empty() {
                    self.publish_tags(user_id);
                }
            }
        }
        Ok(())
    }

    fn increment_click(&self, user_id: &str, id: &str) -> Result<(), BookmarkError> {
        let user_id = require_user(user_id)?;
        let affected = self
            .db
            .connection()
            .execute(
                "UPDATE bookmarks SET click_count = click_count + 1, updated_at = ?1 \
                 WHERE user_id = ?2 AND id = ?3",
                params![Timestamp::now(), user_id, id],
            )
            .map_err(db_err)?;

        if affected == 0 {
            return Err(BookmarkError::NotFound(id.to_string()));
        }
        self.publish_bookmarks(user_id);
        Ok(())
    }

    /// Client-side scan over title, URL, notes and tags.
    fn search_bookmarks(&self, user_id: &str, term: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        let all = self.list_bookmarks(user_id)?;
        let results = search_in(&all, term);
        debug!(user_id, term, scanned = all.len(), matched = results.len(), "search");
        Ok(results)
    }
}
