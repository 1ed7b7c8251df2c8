//! Tag usage counters.
//!
//! Counts are maintained by deltas inside the same transaction as the bookmark
//! write that caused them. Increments use an SQLite upsert, so two writers
//! introducing the same new tag cannot both create the row. A counter that drops
//! to zero is deleted.

use std::collections::{BTreeSet, HashMap};

use rusqlite::{params, Connection};
use tracing::{debug, error};

use crate::managers::bookmark_manager::{db_err, load_bookmarks, require_user, BookmarkManager};
use crate::managers::feed_hub::Subscription;
use crate::types::bookmark::Tag;
use crate::types::errors::BookmarkError;

/// Trait defining tag listing operations.
pub trait TagManagerTrait {
    /// Live feed of the user's tag counters, most used first.
    fn subscribe_tags(&self, user_id: &str) -> Result<Subscription<Tag>, BookmarkError>;
    fn list_tags(&self, user_id: &str) -> Result<Vec<Tag>, BookmarkError>;
}

/// Applies `+1` for every tag in `added` and `-1` for every tag in `removed`.
pub(crate) fn apply_tag_delta(
    conn: &Connection,
    user_id: &str,
    added: &[String],
    removed: &[String],
) -> Result<(), BookmarkError> {
    for tag in added {
        conn.execute(
            "INSERT INTO tags (user_id, name, count) VALUES (?1, ?2, 1) \
             ON CONFLICT(user_id, name) DO UPDATE SET count = count + 1",
            params![user_id, tag],
        )
        .map_err(db_err)?;
    }
    for tag in removed {
        conn.execute(
            "UPDATE tags SET count = MAX(count - 1, 0) WHERE user_id = ?1 AND name = ?2",
            params![user_id, tag],
        )
        .map_err(db_err)?;
        conn.execute(
            "DELETE FROM tags WHERE user_id = ?1 AND name = ?2 AND count <= 0",
            params![user_id, tag],
        )
        .map_err(db_err)?;
    }
    Ok(())
}

/// Recomputes the counters for `names` from the stored bookmarks.
///
/// Returns how many counters were written or removed.
pub(crate) fn recount_tags(
    conn: &Connection,
    user_id: &str,
    names: &BTreeSet<String>,
) -> Result<usize, BookmarkError> {
    if names.is_empty() {
        return Ok(0);
    }
    let mut usage: HashMap<&str, i64> = HashMap::new();
    let bookmarks = load_bookmarks(conn, user_id)?;
    for bookmark in &bookmarks {
        for tag in &bookmark.tags {
            if names.contains(tag) {
                *usage.entry(tag.as_str()).or_insert(0) += 1;
            }
        }
    }

    for name in names {
        let written = match usage.get(name.as_str()) {
            Some(&count) => conn.execute(
                "INSERT INTO tags (user_id, name, count) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(user_id, name) DO UPDATE SET count = excluded.count",
                params![user_id, name, count],
            ),
            None => conn.execute(
                "DELETE FROM tags WHERE user_id = ?1 AND name = ?2",
                params![user_id, name],
            ),
        };
        written.map_err(db_err)?;
    }
    debug!(user_id, reconciled = names.len(), "tag counts reconciled");
    Ok(names.len())
}

fn load_tags(conn: &Connection, user_id: &str) -> Result<Vec<Tag>, BookmarkError> {
    let mut stmt = conn
        .prepare("SELECT name, count FROM tags WHERE user_id = ?1 ORDER BY count DESC, name")
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(Tag {
                name: row.get(0)?,
                count: row.get(1)?,
            })
        })
        .map_err(db_err)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(db_err)?);
    }
    Ok(results)
}

impl BookmarkManager {
    pub(crate) fn publish_tags(&self, user_id: &str) {
        if !self.tag_feed.has_subscribers(user_id) {
            return;
        }
        let snapshot = self.list_tags(user_id).unwrap_or_else(|e| {
            error!(user_id, error = %e, "failed to load tags for feed");
            Vec::new()
        });
        self.tag_feed.publish(user_id, snapshot);
    }
}

impl TagManagerTrait for BookmarkManager {
    fn subscribe_tags(&self, user_id: &str) -> Result<Subscription<Tag>, BookmarkError> {
        let user_id = require_user(user_id)?;
        let current = self.list_tags(user_id).unwrap_or_else(|e| {
            error!(user_id, error = %e, "error listening to tags");
            Vec::new()
        });
        Ok(self.tag_feed.subscribe(user_id, current))
    }

    fn list_tags(&self, user_id: &str) -> Result<Vec<Tag>, BookmarkError> {
        let user_id = require_user(user_id)?;
        let conn = self.db.connection();
        load_tags(&conn, user_id)
    }
}
