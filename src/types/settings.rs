use serde::{Deserialize, Serialize};

/// Top-level shelfmark settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShelfSettings {
    pub storage: StorageSettings,
    pub feed: FeedSettings,
    pub logging: LoggingSettings,
}

/// Where the bookmark database lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    /// Explicit database file. `None` means the platform data directory.
    pub database_path: Option<String>,
}

/// Tuning for the live bookmark view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedSettings {
    /// How many bookmarks the "recent" selector keeps.
    pub recent_limit: usize,
    /// Quiet period before a typed search query is applied.
    pub search_debounce_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            recent_limit: 20,
            search_debounce_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `SHELFMARK_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
