//! Schema migrations for the shelfmark SQLite database.
//!
//! Uses a `schema_version` table to track which migrations have been applied.
//! Each migration runs exactly once and is recorded with a timestamp.

use rusqlite::{params, Connection};

use crate::types::timestamp::Timestamp;

type Migration = fn(&Connection) -> Result<(), rusqlite::Error>;

/// Ordered migrations: version, description, body.
const MIGRATIONS: &[(i32, &str, Migration)] = &[
    (1, "Initial schema: bookmarks, categories, tags", migration_v1),
    (2, "Add image_url to bookmarks, lookup indexes", migration_v2),
];

/// Highest version in [`MIGRATIONS`].
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Highest applied version, or 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT IFNULL(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .unwrap_or(0)
}

/// Applies every migration newer than the recorded version. Idempotent.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let applied = get_schema_version(conn);
    for &(version, description, migrate) in MIGRATIONS.iter().filter(|m| m.0 > applied) {
        migrate(conn)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
            params![version, Timestamp::now(), description],
        )?;
    }
    Ok(())
}

/// V1: Create the per-user collections.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS categories (
            user_id TEXT NOT NULL,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            icon TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, id)
        );

        CREATE TABLE IF NOT EXISTS bookmarks (
            user_id TEXT NOT NULL,
            id TEXT NOT NULL,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '[]',
            notes TEXT,
            favicon TEXT,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            click_count INTEGER NOT NULL DEFAULT 0,
            position INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (user_id, id)
        );

        CREATE TABLE IF NOT EXISTS tags (
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            count INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, name)
        );
        ",
    )
}

/// V2: Thumbnail column for bookmarks created before it existed, plus indexes.
fn migration_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    if conn.prepare("SELECT image_url FROM bookmarks LIMIT 0").is_err() {
        conn.execute_batch("ALTER TABLE bookmarks ADD COLUMN image_url TEXT;")?;
    }
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_bookmarks_user_created ON bookmarks(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_bookmarks_user_category ON bookmarks(user_id, category);
        ",
    )
}
