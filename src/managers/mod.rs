// shelfmark state managers
// The bookmark store (bookmarks, categories, tags, import/export), its live
// feeds and the view model that sits on top of them.

pub mod bookmark_manager;
pub mod category_manager;
pub mod feed_hub;
pub mod import_export;
pub mod tag_manager;
pub mod view_model;
