//! App Core for shelfmark.
//!
//! Wires the database, the shared bookmark store, the settings engine and the
//! view model that the RPC layer drives.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::database::connection::Database;
use crate::managers::bookmark_manager::BookmarkManager;
use crate::managers::view_model::BookmarkViewModel;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Central application struct.
pub struct App {
    pub db: Arc<Database>,
    pub bookmarks: Arc<BookmarkManager>,
    pub settings_engine: SettingsEngine,
    pub view: BookmarkViewModel<BookmarkManager>,
}

impl App {
    /// Opens the database at `db_path` with settings from the platform config path.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_settings(db_path, SettingsEngine::new(None))
    }

    /// Opens the database named by the settings, or the platform default.
    pub fn from_settings(settings_engine: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings_engine = settings_engine;
        load_or_default(&mut settings_engine);
        let db_path = settings_engine.database_path();
        Self::open(&db_path, settings_engine)
    }

    pub fn with_settings(
        db_path: &str,
        settings_engine: SettingsEngine,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings_engine = settings_engine;
        load_or_default(&mut settings_engine);
        Self::open(Path::new(db_path), settings_engine)
    }

    fn open(db_path: &Path, settings_engine: SettingsEngine) -> Result<Self, Box<dyn std::error::Error>> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create data directory: {}", e))?;
        }
        let db = Arc::new(Database::open(db_path)?);
        let bookmarks = Arc::new(BookmarkManager::new(db.clone()));
        let view = BookmarkViewModel::new(bookmarks.clone(), &settings_engine.get_settings().feed);
        info!(path = %db_path.display(), "shelfmark database opened");

        Ok(Self {
            db,
            bookmarks,
            settings_engine,
            view,
        })
    }

    /// Shutdown sequence: drop the live feed of the current user.
    pub fn shutdown(&mut self) {
        self.view.select_user(None);
    }
}

/// Settings that fail to load are logged and replaced by defaults.
fn load_or_default(settings_engine: &mut SettingsEngine) {
    if let Err(e) = settings_engine.load() {
        warn!(
            path = settings_engine.get_config_path(),
            error = %e,
            "failed to load settings, using defaults"
        );
    }
}
