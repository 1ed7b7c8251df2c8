//! Category Manager for shelfmark.
//!
//! Implements `CategoryManagerTrait` on [`BookmarkManager`]: CRUD for per-user
//! categories plus the delete cascade, which either moves referencing bookmarks
//! to a replacement category or deletes them. A category is never removed while
//! bookmarks still point at it.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{error, info};
use uuid::Uuid;

use crate::managers::bookmark_manager::{
    db_err, load_bookmarks, repack_positions, require_user, BookmarkManager,
};
use crate::managers::feed_hub::Subscription;
use crate::managers::tag_manager::apply_tag_delta;
use crate::types::bookmark::{Category, CategoryDraft, CategoryPatch};
use crate::types::errors::BookmarkError;
use crate::types::timestamp::Timestamp;

/// Categories seeded for a user who has none: (name, icon).
pub const DEFAULT_CATEGORIES: [(&str, &str); 3] = [
    ("General", "general"),
    ("Work", "work"),
    ("Personal", "personal"),
];

/// Trait defining category management operations.
pub trait CategoryManagerTrait {
    fn subscribe_categories(&self, user_id: &str) -> Result<Subscription<Category>, BookmarkError>;
    fn list_categories(&self, user_id: &str) -> Result<Vec<Category>, BookmarkError>;
    fn add_category(&self, user_id: &str, draft: CategoryDraft) -> Result<String, BookmarkError>;
    fn update_category(&self, user_id: &str, id: &str, patch: CategoryPatch) -> Result<(), BookmarkError>;
    /// Deletes a category. Its bookmarks move to `replacement` when given,
    /// otherwise they are deleted too.
    fn delete_category(&self, user_id: &str, id: &str, replacement: Option<&str>) -> Result<(), BookmarkError>;
    /// Seeds the default categories when the user has none. Returns the new IDs.
    fn ensure_default_categories(&self, user_id: &str) -> Result<Vec<String>, BookmarkError>;
}

/// Checks whether a category with the given ID exists for the user.
pub(crate) fn category_exists(conn: &Connection, user_id: &str, id: &str) -> Result<bool, BookmarkError> {
    let count: i32 = conn
        .query_row(
            "SELECT COUNT(*) FROM categories WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
            |row| row.get(0),
        )
        .map_err(db_err)?;
    Ok(count > 0)
}

/// Inserts or fully overwrites a category row keyed by `(user_id, id)`.
pub(crate) fn upsert_category(conn: &Connection, user_id: &str, category: &Category) -> Result<(), BookmarkError> {
    conn.execute(
        "INSERT OR REPLACE INTO categories (user_id, id, name, icon, position) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, category.id, category.name, category.icon, category.position],
    )
    .map_err(db_err)?;
    Ok(())
}

pub(crate) fn load_categories(conn: &Connection, user_id: &str) -> Result<Vec<Category>, BookmarkError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, icon, position FROM categories WHERE user_id = ?1 ORDER BY position, name",
        )
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                icon: row.get(2)?,
                position: row.get(3)?,
            })
        })
        .map_err(db_err)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(db_err)?);
    }
    Ok(results)
}

fn next_category_position(conn: &Connection, user_id: &str) -> Result<i32, BookmarkError> {
    conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .map_err(db_err)
}

fn sanitize_name(name: &str) -> Result<String, BookmarkError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BookmarkError::Validation("Category name is required".to_string()));
    }
    Ok(name.to_string())
}

impl BookmarkManager {
    pub(crate) fn publish_categories(&self, user_id: &str) {
        if !self.category_feed.has_subscribers(user_id) {
            return;
        }
        let snapshot = self.list_categories(user_id).unwrap_or_else(|e| {
            error!(user_id, error = %e, "failed to load categories for feed");
            Vec::new()
        });
        self.category_feed.publish(user_id, snapshot);
    }
}

impl CategoryManagerTrait for BookmarkManager {
    fn subscribe_categories(&self, user_id: &str) -> Result<Subscription<Category>, BookmarkError> {
        let user_id = require_user(user_id)?;
        let current = self.list_categories(user_id).unwrap_or_else(|e| {
            error!(user_id, error = %e, "error listening to categories");
            Vec::new()
        });
        Ok(self.category_feed.subscribe(user_id, current))
    }

    fn list_categories(&self, user_id: &str) -> Result<Vec<Category>, BookmarkError> {
        let user_id = require_user(user_id)?;
        let conn = self.db.connection();
        load_categories(&conn, user_id)
    }

    /// Creates a new category at the end of the list. Returns the generated ID.
    fn add_category(&self, user_id: &str, draft: CategoryDraft) -> Result<String, BookmarkError> {
        let user_id = require_user(user_id)?;
        let name = sanitize_name(&draft.name)?;
        let id = Uuid::new_v4().to_string();
        {
            let conn = self.db.connection();
            let category = Category {
                id: id.clone(),
                name,
                icon: draft.icon,
                position: next_category_position(&conn, user_id)?,
            };
            upsert_category(&conn, user_id, &category)?;
        }
        info!(user_id, category_id = %id, "category added");
        self.publish_categories(user_id);
        Ok(id)
    }

    fn update_category(&self, user_id: &str, id: &str, patch: CategoryPatch) -> Result<(), BookmarkError> {
        let user_id = require_user(user_id)?;
        let name = patch.name.as_deref().map(sanitize_name).transpose()?;
        {
            let conn = self.db.connection();
            let mut category = conn
                .query_row(
                    "SELECT id, name, icon, position FROM categories WHERE user_id = ?1 AND id = ?2",
                    params![user_id, id],
                    |row| {
                        Ok(Category {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            icon: row.get(2)?,
                            position: row.get(3)?,
                        })
                    },
                )
                .optional()
                .map_err(db_err)?
                .ok_or_else(|| BookmarkError::CategoryNotFound(id.to_string()))?;

            if let Some(name) = name {
                category.name = name;
            }
            if let Some(icon) = patch.icon {
                category.icon = icon;
            }
            upsert_category(&conn, user_id, &category)?;
        }
        self.publish_categories(user_id);
        Ok(())
    }

    fn delete_category(&self, user_id: &str, id: &str, replacement: Option<&str>) -> Result<(), BookmarkError> {
        let user_id = require_user(user_id)?;
        let replacement = replacement.map(str::trim).filter(|r| !r.is_empty());
        if replacement == Some(id) {
            return Err(BookmarkError::Validation(
                "A category cannot replace itself".to_string(),
            ));
        }

        let affected = {
            let mut conn = self.db.connection();
            let tx = conn.transaction().map_err(db_err)?;

            if let Some(target) = replacement {
                if !category_exists(&tx, user_id, target)? {
                    return Err(BookmarkError::CategoryNotFound(target.to_string()));
                }
            }

            tx.execute(
                "DELETE FROM categories WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
            )
            .map_err(db_err)?;

            let referencing: Vec<_> = load_bookmarks(&tx, user_id)?
                .into_iter()
                .filter(|b| b.category == id)
                .collect();

            match replacement {
                Some(target) => {
                    tx.execute(
                        "UPDATE bookmarks SET category = ?1, updated_at = ?2 WHERE user_id = ?3 AND category = ?4",
                        params![target, Timestamp::now(), user_id, id],
                    )
                    .map_err(db_err)?;
                }
                None => {
                    for bookmark in &referencing {
                        tx.execute(
                            "DELETE FROM bookmarks WHERE user_id = ?1 AND id = ?2",
                            params![user_id, bookmark.id],
                        )
                        .map_err(db_err)?;
                        apply_tag_delta(&tx, user_id, &[], &bookmark.tags)?;
                    }
                    if !referencing.is_empty() {
                        repack_positions(&tx, user_id)?;
                    }
                }
            }
            tx.commit().map_err(db_err)?;
            referencing.len()
        };

        info!(
            user_id,
            category_id = id,
            bookmarks = affected,
            reassigned_to = replacement.unwrap_or("-"),
            "category deleted"
        );
        self.publish_all(user_id);
        Ok(())
    }

    fn ensure_default_categories(&self, user_id: &str) -> Result<Vec<String>, BookmarkError> {
        let user_id = require_user(user_id)?;
        let created = {
            let mut conn = self.db.connection();
            let tx = conn.transaction().map_err(db_err)?;
            if next_category_position(&tx, user_id)? > 0 {
                return Ok(Vec::new());
            }
            let mut created = Vec::with_capacity(DEFAULT_CATEGORIES.len());
            for (position, (name, icon)) in DEFAULT_CATEGORIES.iter().enumerate() {
                let category = Category {
                    id: Uuid::new_v4().to_string(),
                    name: name.to_string(),
                    icon: Some(icon.to_string()),
                    position: position as i32,
                };
                upsert_category(&tx, user_id, &category)?;
                created.push(category.id);
            }
            tx.commit().map_err(db_err)?;
            created
        };
        info!(user_id, count = created.len(), "default categories created");
        self.publish_categories(user_id);
        Ok(created)
    }
}
