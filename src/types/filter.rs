use std::fmt;

use serde::{Deserialize, Serialize};

/// Category selector driving the second filter stage.
///
/// Serialises to the plain selector string: `"all"`, `"favorites"`,
/// `"recent"` or a concrete category id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Favorites,
    Recent,
    Category(String),
}

impl CategoryFilter {
    /// Parses a selector. Empty input selects everything.
    pub fn parse(selector: &str) -> Self {
        match selector.trim() {
            "" | "all" => CategoryFilter::All,
            "favorites" => CategoryFilter::Favorites,
            "recent" => CategoryFilter::Recent,
            id => CategoryFilter::Category(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Favorites => "favorites",
            CategoryFilter::Recent => "recent",
            CategoryFilter::Category(id) => id,
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(selector: &str) -> Self {
        Self::parse(selector)
    }
}

impl From<String> for CategoryFilter {
    fn from(selector: String) -> Self {
        Self::parse(&selector)
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        filter.as_str().to_string()
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tuple (search query, selected category, selected tags).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterState {
    pub search_query: String,
    #[serde(rename = "selectedCategory")]
    pub category: CategoryFilter,
    #[serde(rename = "selectedTags")]
    pub tags: Vec<String>,
}

impl FilterState {
    pub fn has_search(&self) -> bool {
        !self.search_query.trim().is_empty()
    }
}
