//! Unit tests for the shelfmark database layer (connection + migrations).

use rusqlite::Connection;
use shelfmark::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use shelfmark::database::Database;
use tempfile::TempDir;

fn object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = ?1 AND name = ?2",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

#[test]
fn test_open_in_memory_succeeds() {
    assert!(Database::open_in_memory().is_ok());
}

#[test]
fn test_migrations_create_all_tables() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();
    for table in ["bookmarks", "categories", "tags", "schema_version"] {
        assert!(object_exists(&conn, "table", table), "Table '{}' should exist", table);
    }
}

#[test]
fn test_migrations_create_indexes() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();
    for index in ["idx_bookmarks_user_created", "idx_bookmarks_user_category"] {
        assert!(object_exists(&conn, "index", index), "Index '{}' should exist", index);
    }
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    assert_eq!(get_schema_version(&db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();
    assert!(run_all(&conn).is_ok(), "Running migrations twice should succeed");
    let versions: i32 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(versions, CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_v1_database_gains_image_url_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at INTEGER NOT NULL, description TEXT NOT NULL);
         INSERT INTO schema_version VALUES (1, 0, 'initial');
         CREATE TABLE bookmarks (
             user_id TEXT NOT NULL, id TEXT NOT NULL, title TEXT NOT NULL, url TEXT NOT NULL,
             category TEXT NOT NULL DEFAULT '', tags TEXT NOT NULL DEFAULT '[]', notes TEXT, favicon TEXT,
             is_favorite INTEGER NOT NULL DEFAULT 0, click_count INTEGER NOT NULL DEFAULT 0,
             position INTEGER NOT NULL DEFAULT 0, created_at INTEGER NOT NULL, updated_at INTEGER NOT NULL,
             PRIMARY KEY (user_id, id));",
    )
    .unwrap();

    run_all(&conn).expect("upgrade should succeed");
    assert!(conn.prepare("SELECT image_url FROM bookmarks").is_ok());
    assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_open_file_database_persists() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("shelf.db");
    {
        let db = Database::open(&db_path).expect("open with file path should succeed");
        db.connection()
            .execute(
                "INSERT INTO categories (user_id, id, name, icon, position) VALUES ('u', 'c1', 'Work', 'work', 0)",
                [],
            )
            .unwrap();
    }
    assert!(db_path.exists());

    let reopened = Database::open(&db_path).unwrap();
    let name: String = reopened
        .connection()
        .query_row("SELECT name FROM categories WHERE user_id = 'u' AND id = 'c1'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "Work");
}

#[test]
fn test_primary_keys_partition_by_user() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    let insert = "INSERT INTO tags (user_id, name, count) VALUES (?1, 'rust', 1)";
    conn.execute(insert, ["alice"]).unwrap();
    conn.execute(insert, ["bob"]).unwrap();
    assert!(conn.execute(insert, ["alice"]).is_err(), "same user and name must collide");
}
