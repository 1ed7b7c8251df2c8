use serde::{Deserialize, Serialize};

use super::bookmark::{Bookmark, Category};

/// Transportable snapshot of one user's bookmarks and categories.
///
/// Missing arrays decode as empty; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSnapshot {
    pub bookmarks: Vec<Bookmark>,
    pub categories: Vec<Category>,
    /// ISO-8601 time the snapshot was taken.
    pub export_date: Option<String>,
}

/// Counts reported after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub categories: usize,
    pub bookmarks: usize,
    pub overwritten: usize,
    pub tags_reconciled: usize,
}
