//! Per-OS locations for the settings file and the bookmark database.
//!
//! - **Linux**: `$XDG_CONFIG_HOME/shelfmark` and `$XDG_DATA_HOME/shelfmark`,
//!   falling back to `~/.config` and `~/.local/share`
//! - **macOS**: `~/Library/Application Support/Shelfmark` for both
//! - **Windows**: `%APPDATA%\Shelfmark` for both

use std::env;
use std::path::PathBuf;

/// File name of the bookmark database inside [`get_data_dir`].
pub const DATABASE_FILE: &str = "shelfmark.db";

/// File name of the settings document inside [`get_config_dir`].
pub const SETTINGS_FILE: &str = "settings.json";

#[cfg(not(target_os = "windows"))]
fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// `$var/shelfmark` when the XDG variable is set, else `~/<fallback>/shelfmark`.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    match env::var(var) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join("shelfmark"),
        _ => fallback
            .iter()
            .fold(home_dir(), |path, part| path.join(part))
            .join("shelfmark"),
    }
}

#[cfg(target_os = "macos")]
fn app_support_dir() -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join("Shelfmark")
}

#[cfg(target_os = "windows")]
fn app_support_dir() -> PathBuf {
    let appdata = env::var("APPDATA")
        .unwrap_or_else(|_| String::from("C:\\Users\\Default\\AppData\\Roaming"));
    PathBuf::from(appdata).join("Shelfmark")
}

pub fn get_config_dir() -> PathBuf {
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    {
        app_support_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_CONFIG_HOME", &[".config"])
    }
}

pub fn get_data_dir() -> PathBuf {
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    {
        app_support_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_DATA_HOME", &[".local", "share"])
    }
}

/// Default location of the bookmark database.
pub fn default_database_path() -> PathBuf {
    get_data_dir().join(DATABASE_FILE)
}

/// Default location of the settings file.
pub fn default_settings_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILE)
}
