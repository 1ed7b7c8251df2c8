//! Property-based tests for export/import.
//!
//! Exporting one user's data and importing it into an empty user reproduces
//! the same bookmarks and categories, field for field.

use std::sync::Arc;

use proptest::prelude::*;
use shelfmark::database::Database;
use shelfmark::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use shelfmark::managers::category_manager::CategoryManagerTrait;
use shelfmark::managers::import_export::ImportExportTrait;
use shelfmark::managers::tag_manager::TagManagerTrait;
use shelfmark::types::bookmark::{BookmarkDraft, BookmarkPatch, CategoryDraft};

#[derive(Debug, Clone)]
struct Entry {
    title: String,
    host: String,
    tags: Vec<String>,
    notes: Option<String>,
    favorite: bool,
    category: Option<usize>,
    clicks: u8,
}

fn arb_entry() -> impl Strategy<Value = Entry> {
    (
        "[A-Za-z][A-Za-z0-9 ]{0,20}",
        "[a-z]{3,10}\\.(com|org|io)",
        proptest::collection::vec("[a-z]{1,6}", 0..4),
        proptest::option::of("[a-z ]{1,30}"),
        any::<bool>(),
        proptest::option::of(0usize..3),
        0u8..4,
    )
        .prop_map(|(title, host, tags, notes, favorite, category, clicks)| Entry {
            title,
            host,
            tags,
            notes,
            favorite,
            category,
            clicks,
        })
}

fn arb_categories() -> impl Strategy<Value = Vec<(String, Option<String>)>> {
    proptest::collection::vec(
        ("[A-Z][a-z]{2,10}", proptest::option::of("[a-z]{3,8}")),
        0..4,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn export_then_import_into_empty_user_is_identical(
        categories in arb_categories(),
        entries in proptest::collection::vec(arb_entry(), 0..12),
    ) {
        let manager = BookmarkManager::new(Arc::new(
            Database::open_in_memory().expect("Failed to open in-memory database"),
        ));

        let category_ids: Vec<String> = categories
            .iter()
            .map(|(name, icon)| manager.add_category("alice", CategoryDraft::new(name, icon.as_deref())).unwrap())
            .collect();

        for entry in &entries {
            let mut draft = BookmarkDraft::new(&entry.title, &entry.host).with_tags(entry.tags.clone());
            if let Some(ix) = entry.category.filter(|ix| *ix < category_ids.len()) {
                draft = draft.with_category(&category_ids[ix]);
            }
            if entry.favorite {
                draft = draft.favorite();
            }
            let id = manager.add_bookmark("alice", draft).unwrap();
            if entry.notes.is_some() {
                let patch = BookmarkPatch {
                    notes: Some(entry.notes.clone()),
                    ..BookmarkPatch::default()
                };
                manager.update_bookmark("alice", &id, patch).unwrap();
            }
            for _ in 0..entry.clicks {
                manager.increment_click("alice", &id).unwrap();
            }
        }

        let exported = manager.export_json("alice").unwrap();
        let summary = manager.import_json("bob", &exported).unwrap();
        prop_assert_eq!(summary.bookmarks, entries.len());
        prop_assert_eq!(summary.categories, categories.len());
        prop_assert_eq!(summary.overwritten, 0);

        let original = manager.export_all("alice").unwrap();
        let copy = manager.export_all("bob").unwrap();
        prop_assert_eq!(&copy.bookmarks, &original.bookmarks);
        prop_assert_eq!(&copy.categories, &original.categories);
        prop_assert_eq!(manager.list_tags("bob").unwrap(), manager.list_tags("alice").unwrap());
    }
}
