use serde::{Deserialize, Serialize};

use super::timestamp::Timestamp;

/// Represents a saved bookmark.
///
/// Field names follow the camelCase export format so a snapshot document can be
/// decoded straight into this type. Every field has a default, which lets
/// partially-filled imported records through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Category id, or empty when unassigned.
    pub category: String,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub favicon: Option<String>,
    pub image_url: Option<String>,
    pub is_favorite: bool,
    pub click_count: i64,
    /// Legacy ordering hint; reads sort by `created_at`.
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Bookmark {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Fields supplied by the caller when creating a bookmark.
///
/// `id`, timestamps, `position` and `click_count` are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkDraft {
    pub title: String,
    pub url: String,
    pub category: String,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub favicon: Option<String>,
    pub image_url: Option<String>,
    pub is_favorite: bool,
}

impl BookmarkDraft {
    pub fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn favorite(mut self) -> Self {
        self.is_favorite = true;
        self
    }
}

/// Partial update for an existing bookmark. `None` leaves a field untouched.
///
/// Nullable fields use a nested option: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookmarkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub favicon: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    pub is_favorite: Option<bool>,
}

impl BookmarkPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Distinguishes an explicit `null` (clear) from a missing key (leave alone).
fn nullable<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Represents a user-defined category for grouping bookmarks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Symbolic icon name, e.g. `general` or `work`.
    pub icon: Option<String>,
    pub position: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDraft {
    pub name: String,
    pub icon: Option<String>,
}

impl CategoryDraft {
    pub fn new(name: &str, icon: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            icon: icon.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub icon: Option<Option<String>>,
}

/// Denormalized usage counter for a tag name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub count: i64,
}
