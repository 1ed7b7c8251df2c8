//! Export and import of a user's bookmarks and categories.
//!
//! The document format is camelCase JSON:
//!
//! ```json
//! { "bookmarks": [...], "categories": [...], "exportDate": "2024-05-01T10:00:00.000Z" }
//! ```
//!
//! Import upserts by recorded id, so records sharing an id with existing data
//! overwrite it.

use std::collections::BTreeSet;

use chrono::{SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

use crate::managers::bookmark_manager::{
    db_err, fetch_bookmark, load_bookmarks, require_user, upsert_bookmark, BookmarkManager,
};
use crate::managers::category_manager::{category_exists, load_categories, upsert_category};
use crate::managers::tag_manager::recount_tags;
use crate::services::link_format::{normalize_notes, normalize_tags};
use crate::types::errors::BookmarkError;
use crate::types::export::{ExportSnapshot, ImportSummary};

pub trait ImportExportTrait {
    fn export_all(&self, user_id: &str) -> Result<ExportSnapshot, BookmarkError>;
    /// Pretty-printed JSON form of [`ImportExportTrait::export_all`].
    fn export_json(&self, user_id: &str) -> Result<String, BookmarkError>;
    fn import_all(&self, user_id: &str, snapshot: ExportSnapshot) -> Result<ImportSummary, BookmarkError>;
    fn import_json(&self, user_id: &str, json: &str) -> Result<ImportSummary, BookmarkError>;
}

fn ensure_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

impl ImportExportTrait for BookmarkManager {
    fn export_all(&self, user_id: &str) -> Result<ExportSnapshot, BookmarkError> {
        let user_id = require_user(user_id)?;
        let conn = self.db.connection();
        let snapshot = ExportSnapshot {
            bookmarks: load_bookmarks(&conn, user_id)?,
            categories: load_categories(&conn, user_id)?,
            export_date: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        };
        info!(
            user_id,
            bookmarks = snapshot.bookmarks.len(),
            categories = snapshot.categories.len(),
            "export complete"
        );
        Ok(snapshot)
    }

    fn export_json(&self, user_id: &str) -> Result<String, BookmarkError> {
        let snapshot = self.export_all(user_id)?;
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| BookmarkError::SerializationError(e.to_string()))
    }

    fn import_all(&self, user_id: &str, snapshot: ExportSnapshot) -> Result<ImportSummary, BookmarkError> {
        let user_id = require_user(user_id)?;
        let ExportSnapshot {
            mut bookmarks,
            mut categories,
            ..
        } = snapshot;

        let mut summary = ImportSummary::default();
        {
            let mut conn = self.db.connection();
            let tx = conn.transaction().map_err(db_err)?;

            for category in &mut categories {
                ensure_id(&mut category.id);
                category.name = category.name.trim().to_string();
                if category_exists(&tx, user_id, &category.id)? {
                    summary.overwritten += 1;
                }
                upsert_category(&tx, user_id, category)?;
            }
            summary.categories = categories.len();

            let mut touched: BTreeSet<String> = BTreeSet::new();
            for bookmark in &mut bookmarks {
                ensure_id(&mut bookmark.id);
                bookmark.tags = normalize_tags(&bookmark.tags);
                bookmark.notes = normalize_notes(bookmark.notes.as_deref());
                bookmark.click_count = bookmark.click_count.max(0);

                if let Some(previous) = fetch_bookmark(&tx, user_id, &bookmark.id)? {
                    summary.overwritten += 1;
                    touched.extend(previous.tags);
                }
                touched.extend(bookmark.tags.iter().cloned());
                upsert_bookmark(&tx, user_id, bookmark)?;
            }
            summary.bookmarks = bookmarks.len();

            summary.tags_reconciled = recount_tags(&tx, user_id, &touched)?;
            tx.commit().map_err(db_err)?;
        }

        info!(
            user_id,
            categories = summary.categories,
            bookmarks = summary.bookmarks,
            overwritten = summary.overwritten,
            "import complete"
        );
        self.publish_all(user_id);
        Ok(summary)
    }

    fn import_json(&self, user_id: &str, json: &str) -> Result<ImportSummary, BookmarkError> {
        let snapshot: ExportSnapshot = serde_json::from_str(json)
            .map_err(|e| BookmarkError::SerializationError(e.to_string()))?;
        self.import_all(user_id, snapshot)
    }
}
