//! RPC method handler for the shelfmark JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested. `handle_method`
//! dispatches a method call to the bookmark store or the view model held by
//! [`App`]. Per-user calls act on the user chosen with `session.select_user`.

use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::app::App;
use crate::managers::bookmark_manager::BookmarkManagerTrait;
use crate::managers::category_manager::CategoryManagerTrait;
use crate::managers::import_export::ImportExportTrait;
use crate::managers::tag_manager::TagManagerTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::{BookmarkDraft, BookmarkPatch, CategoryDraft, CategoryPatch};
use crate::types::errors::BookmarkError;
use crate::types::export::ExportSnapshot;
use crate::types::filter::FilterState;
use crate::types::user::UserProfile;

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| format!("invalid {}: {}", what, e))
}

fn encode<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// The user selected for this session.
fn current_user(app: &App) -> Result<String, String> {
    app.view
        .user_id()
        .map(str::to_string)
        .ok_or_else(|| BookmarkError::Unauthenticated.to_string())
}

/// Applies any pushed snapshot and runs a pending search before replying.
fn refresh_feed(app: &mut App) {
    app.view.poll_snapshot();
    app.view.search_now();
}

fn feed_view(app: &App) -> Result<Value, String> {
    Ok(json!({
        "bookmarks": encode(&app.view.visible())?,
        "loading": app.view.is_loading(),
        "filter": encode(app.view.filter())?,
        "tags": app.view.tag_names(),
    }))
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with a user-facing message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Session ───
        "session.select_user" => {
            let profile: Option<UserProfile> = match params.get("profile") {
                Some(p) if !p.is_null() => Some(decode(p.clone(), "profile")?),
                _ => None,
            };
            let user_id = profile
                .map(|p| p.user_id)
                .or_else(|| params.get("userId").and_then(|v| v.as_str()).map(str::to_string));

            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.view.select_user(user_id.as_deref());
            refresh_feed(&mut a);
            Ok(json!({
                "userId": a.view.user_id(),
                "live": a.view.user_id().is_some(),
                "bookmarks": a.view.bookmarks().len(),
            }))
        }

        // ─── Bookmarks ───
        "bookmark.add" => {
            let draft: BookmarkDraft = decode(params.clone(), "bookmark")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let id = a.view.add_bookmark(draft).map_err(|e| e.to_string())?;
            refresh_feed(&mut a);
            Ok(json!({"id": id}))
        }
        "bookmark.update" => {
            let id = str_param(params, "id")?;
            let patch: BookmarkPatch = decode(params.get("patch").cloned().unwrap_or(json!({})), "patch")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.view.update_bookmark(id, patch).map_err(|e| e.to_string())?;
            refresh_feed(&mut a);
            Ok(json!({"ok": true}))
        }
        "bookmark.delete" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.view.delete_bookmark(id).map_err(|e| e.to_string())?;
            refresh_feed(&mut a);
            Ok(json!({"ok": true}))
        }
        "bookmark.click" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.view.handle_bookmark_click(id);
            refresh_feed(&mut a);
            Ok(json!({"ok": true}))
        }
        "bookmark.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let bookmarks = a.bookmarks.list_bookmarks(&user).map_err(|e| e.to_string())?;
            encode(&bookmarks)
        }
        "bookmark.search" => {
            let query = str_param(params, "query")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let bookmarks = a.bookmarks.search_bookmarks(&user, query).map_err(|e| e.to_string())?;
            encode(&bookmarks)
        }
        "bookmark.get" => {
            let id = str_param(params, "id")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let bookmark = a.bookmarks.get_bookmark(&user, id).map_err(|e| e.to_string())?;
            encode(&bookmark)
        }

        // ─── Categories ───
        "category.add" => {
            let draft: CategoryDraft = decode(params.clone(), "category")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let id = a.bookmarks.add_category(&user, draft).map_err(|e| e.to_string())?;
            Ok(json!({"id": id}))
        }
        "category.update" => {
            let id = str_param(params, "id")?;
            let patch: CategoryPatch = decode(params.get("patch").cloned().unwrap_or(json!({})), "patch")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            a.bookmarks.update_category(&user, id, patch).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "category.delete" => {
            let id = str_param(params, "id")?;
            let replacement = params.get("replacement").and_then(|v| v.as_str());
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            a.bookmarks
                .delete_category(&user, id, replacement)
                .map_err(|e| e.to_string())?;
            refresh_feed(&mut a);
            Ok(json!({"ok": true}))
        }
        "category.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let categories = a.bookmarks.list_categories(&user).map_err(|e| e.to_string())?;
            encode(&categories)
        }
        "category.ensure_defaults" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let created = a.bookmarks.ensure_default_categories(&user).map_err(|e| e.to_string())?;
            Ok(json!({"created": created}))
        }

        // ─── Tags ───
        "tag.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let tags = a.bookmarks.list_tags(&user).map_err(|e| e.to_string())?;
            encode(&tags)
        }

        // ─── Feed ───
        "feed.set_filter" => {
            let filter: FilterState = decode(params.clone(), "filter")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.view.poll_snapshot();
            a.view.set_filter(filter);
            a.view.search_now();
            feed_view(&a)
        }
        "feed.visible" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            refresh_feed(&mut a);
            feed_view(&a)
        }

        // ─── Import / export ───
        "data.export" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let snapshot = a.bookmarks.export_all(&user).map_err(|e| e.to_string())?;
            encode(&snapshot)
        }
        "data.import" => {
            let document = params.get("snapshot").cloned().unwrap_or_else(|| params.clone());
            let snapshot: ExportSnapshot = decode(document, "snapshot")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let user = current_user(&a)?;
            let summary = a.bookmarks.import_all(&user, snapshot).map_err(|e| e.to_string())?;
            refresh_feed(&mut a);
            encode(&summary)
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            encode(a.settings_engine.get_settings())
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            if key.starts_with("feed.") {
                let feed = a.settings_engine.get_settings().feed.clone();
                a.view.reconfigure(&feed);
                refresh_feed(&mut a);
            }
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
