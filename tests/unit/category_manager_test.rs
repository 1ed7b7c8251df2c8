//! Unit tests for category CRUD, default seeding and the delete cascade.

use std::sync::Arc;

use shelfmark::database::Database;
use shelfmark::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use shelfmark::managers::category_manager::{CategoryManagerTrait, DEFAULT_CATEGORIES};
use shelfmark::managers::tag_manager::TagManagerTrait;
use shelfmark::types::bookmark::{BookmarkDraft, CategoryDraft, CategoryPatch, Tag};
use shelfmark::types::errors::BookmarkError;

fn manager() -> BookmarkManager {
    BookmarkManager::new(Arc::new(Database::open_in_memory().expect("open_in_memory failed")))
}

fn add_in(mgr: &BookmarkManager, title: &str, category: &str, tags: &[&str]) -> String {
    mgr.add_bookmark(
        "u1",
        BookmarkDraft::new(title, "https://example.com")
            .with_category(category)
            .with_tags(tags.iter().copied()),
    )
    .unwrap()
}

#[test]
fn test_add_and_list_in_position_order() {
    let mgr = manager();
    let work = mgr.add_category("u1", CategoryDraft::new("  Work ", Some("work"))).unwrap();
    let home = mgr.add_category("u1", CategoryDraft::new("Home", None)).unwrap();

    let listed = mgr.list_categories("u1").unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!((listed[0].id.as_str(), listed[0].name.as_str(), listed[0].position), (work.as_str(), "Work", 0));
    assert_eq!((listed[1].id.as_str(), listed[1].position), (home.as_str(), 1));
    assert_eq!(listed[0].icon.as_deref(), Some("work"));
    assert_eq!(listed[1].icon, None);
}

#[test]
fn test_add_requires_name() {
    let mgr = manager();
    assert_eq!(
        mgr.add_category("u1", CategoryDraft::new("   ", None)),
        Err(BookmarkError::Validation("Category name is required".to_string()))
    );
}

#[test]
fn test_update_name_and_clear_icon() {
    let mgr = manager();
    let id = mgr.add_category("u1", CategoryDraft::new("Work", Some("work"))).unwrap();
    let patch = CategoryPatch {
        name: Some("Office".to_string()),
        icon: Some(None),
    };
    mgr.update_category("u1", &id, patch).unwrap();

    let listed = mgr.list_categories("u1").unwrap();
    assert_eq!(listed[0].name, "Office");
    assert_eq!(listed[0].icon, None);
}

#[test]
fn test_update_unknown_category() {
    let mgr = manager();
    assert_eq!(
        mgr.update_category("u1", "nope", CategoryPatch::default()),
        Err(BookmarkError::CategoryNotFound("nope".to_string()))
    );
}

#[test]
fn test_delete_without_replacement_removes_bookmarks_and_tag_counts() {
    let mgr = manager();
    let doomed = mgr.add_category("u1", CategoryDraft::new("Doomed", None)).unwrap();
    let kept = mgr.add_category("u1", CategoryDraft::new("Kept", None)).unwrap();

    add_in(&mgr, "One", &doomed, &["a", "shared"]);
    add_in(&mgr, "Two", &doomed, &["a"]);
    add_in(&mgr, "Three", &doomed, &["b"]);
    let survivor = add_in(&mgr, "Four", &kept, &["shared"]);

    mgr.delete_category("u1", &doomed, None).unwrap();

    let remaining = mgr.list_bookmarks("u1").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, survivor);
    assert_eq!(remaining[0].position, 0);
    assert_eq!(
        mgr.list_tags("u1").unwrap(),
        vec![Tag {
            name: "shared".to_string(),
            count: 1
        }]
    );
    assert!(mgr.list_categories("u1").unwrap().iter().all(|c| c.id != doomed));
}

#[test]
fn test_delete_with_replacement_moves_bookmarks() {
    let mgr = manager();
    let old = mgr.add_category("u1", CategoryDraft::new("Old", None)).unwrap();
    let new = mgr.add_category("u1", CategoryDraft::new("New", None)).unwrap();
    let a = add_in(&mgr, "A", &old, &["t"]);
    let b = add_in(&mgr, "B", &old, &[]);
    let before = mgr.get_bookmark("u1", &a).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));

    mgr.delete_category("u1", &old, Some(new.as_str())).unwrap();

    for id in [&a, &b] {
        assert_eq!(mgr.get_bookmark("u1", id).unwrap().category, new);
    }
    assert!(mgr.get_bookmark("u1", &a).unwrap().updated_at > before.updated_at);
    assert_eq!(mgr.list_tags("u1").unwrap()[0].count, 1);
    assert_eq!(mgr.list_categories("u1").unwrap().len(), 1);
}

#[test]
fn test_delete_rejects_missing_or_self_replacement() {
    let mgr = manager();
    let cat = mgr.add_category("u1", CategoryDraft::new("Cat", None)).unwrap();
    let bm = add_in(&mgr, "A", &cat, &[]);

    assert_eq!(
        mgr.delete_category("u1", &cat, Some("ghost")),
        Err(BookmarkError::CategoryNotFound("ghost".to_string()))
    );
    assert!(matches!(
        mgr.delete_category("u1", &cat, Some(cat.as_str())),
        Err(BookmarkError::Validation(_))
    ));

    assert_eq!(mgr.list_categories("u1").unwrap().len(), 1);
    assert_eq!(mgr.get_bookmark("u1", &bm).unwrap().category, cat);
}

#[test]
fn test_ensure_default_categories_seeds_once() {
    let mgr = manager();
    let created = mgr.ensure_default_categories("u1").unwrap();
    assert_eq!(created.len(), DEFAULT_CATEGORIES.len());

    let names: Vec<String> = mgr
        .list_categories("u1")
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["General", "Work", "Personal"]);

    assert!(mgr.ensure_default_categories("u1").unwrap().is_empty());
    assert_eq!(mgr.list_categories("u1").unwrap().len(), 3);
}

#[test]
fn test_ensure_default_categories_skips_users_with_categories() {
    let mgr = manager();
    mgr.add_category("u1", CategoryDraft::new("Mine", None)).unwrap();
    assert!(mgr.ensure_default_categories("u1").unwrap().is_empty());
    assert_eq!(mgr.ensure_default_categories("u2").unwrap().len(), 3);
}
