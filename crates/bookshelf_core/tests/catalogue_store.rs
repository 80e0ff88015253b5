use bookshelf_core::{BookDraft, BookSort, BookValidationError, Catalogue, CatalogueError};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

#[test]
fn list_all_on_empty_store_is_empty() {
    let catalogue = Catalogue::open_in_memory().unwrap();

    assert!(catalogue.list_all().unwrap().is_empty());
    assert_eq!(catalogue.count().unwrap(), 0);
}

#[test]
fn add_then_list_contains_exactly_one_new_record() {
    let catalogue = Catalogue::open_in_memory().unwrap();
    catalogue.add(&BookDraft::new("Emma", "Jane Austen")).unwrap();

    let added = catalogue.add(&BookDraft::new("Dune", "Herbert")).unwrap();
    let books = catalogue.list_all().unwrap();

    assert_eq!(books.len(), 2);
    let matching: Vec<_> = books.iter().filter(|book| book.id == added.id).collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].title, "Dune");
    assert_eq!(matching[0].author, "Herbert");
    assert_eq!(books[1], added);
}

#[test]
fn add_with_empty_title_fails_and_leaves_store_unchanged() {
    let catalogue = Catalogue::open_in_memory().unwrap();

    let err = catalogue.add(&BookDraft::new("", "X")).unwrap_err();
    assert!(matches!(
        err,
        CatalogueError::Validation(BookValidationError::MissingTitle)
    ));
    assert!(catalogue.list_all().unwrap().is_empty());
}

#[test]
fn list_all_preserves_insertion_order() {
    let catalogue = Catalogue::open_in_memory().unwrap();
    for title in ["Zeta", "Alpha", "Mu"] {
        catalogue.add(&BookDraft::new(title, "Author")).unwrap();
    }

    let titles: Vec<_> = catalogue
        .list_all()
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(titles, ["Zeta", "Alpha", "Mu"]);

    let by_title: Vec<_> = catalogue
        .list_sorted(BookSort::Title)
        .unwrap()
        .into_iter()
        .map(|book| book.title)
        .collect();
    assert_eq!(by_title, ["Alpha", "Mu", "Zeta"]);
}

#[test]
fn concurrent_adds_produce_unique_ids() {
    let catalogue = Arc::new(Catalogue::open_in_memory().unwrap());
    let threads = 8;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|worker| {
            let catalogue = Arc::clone(&catalogue);
            thread::spawn(move || {
                (0..per_thread)
                    .map(|index| {
                        catalogue
                            .add(&BookDraft::new(format!("Book {worker}-{index}"), "Author"))
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut returned_ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(returned_ids.insert(id), "duplicate id returned: {id}");
        }
    }

    let stored = catalogue.list_all().unwrap();
    assert_eq!(stored.len(), threads * per_thread);
    let stored_ids: HashSet<_> = stored.iter().map(|book| book.id).collect();
    assert_eq!(stored_ids, returned_ids);
}

#[test]
fn records_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bookshelf.db");

    let added = {
        let catalogue = Catalogue::open(&path).unwrap();
        catalogue.add(&BookDraft::new("Dune", "Herbert")).unwrap()
    };

    let reopened = Catalogue::open(&path).unwrap();
    assert_eq!(reopened.list_all().unwrap(), vec![added]);
}

#[test]
fn update_get_and_delete_report_not_found_for_unknown_ids() {
    let catalogue = Catalogue::open_in_memory().unwrap();
    let missing = Uuid::new_v4();

    assert!(matches!(
        catalogue.get(missing),
        Err(CatalogueError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        catalogue.update(missing, &BookDraft::new("T", "A")),
        Err(CatalogueError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        catalogue.delete(missing),
        Err(CatalogueError::NotFound(id)) if id == missing
    ));
}

#[test]
fn update_replaces_fields_and_invalid_update_changes_nothing() {
    let catalogue = Catalogue::open_in_memory().unwrap();
    let added = catalogue.add(&BookDraft::new("Dune", "Herbert")).unwrap();

    let updated = catalogue
        .update(added.id, &BookDraft::new("Dune Messiah", "Frank Herbert"))
        .unwrap();
    assert_eq!(updated.id, added.id);
    assert_eq!(updated.created_at, added.created_at);
    assert_eq!(updated.title, "Dune Messiah");

    let err = catalogue
        .update(added.id, &BookDraft::new("", "Frank Herbert"))
        .unwrap_err();
    assert!(matches!(err, CatalogueError::Validation(_)));
    assert_eq!(catalogue.get(added.id).unwrap(), updated);
}

#[test]
fn delete_removes_book_from_listing() {
    let catalogue = Catalogue::open_in_memory().unwrap();
    let keep = catalogue.add(&BookDraft::new("Keep", "A")).unwrap();
    let removed = catalogue.add(&BookDraft::new("Drop", "B")).unwrap();

    assert_eq!(catalogue.delete(removed.id).unwrap(), removed);

    assert_eq!(catalogue.list_all().unwrap(), vec![keep]);
    assert_eq!(catalogue.count().unwrap(), 1);
}

#[test]
fn update_without_cover_keeps_stored_cover() {
    let catalogue = Catalogue::open_in_memory().unwrap();
    let draft = BookDraft {
        cover_filename: Some("9f8e7d.jpg".to_string()),
        ..BookDraft::new("Dune", "Herbert")
    };
    let added = catalogue.add(&draft).unwrap();

    let updated = catalogue
        .update(added.id, &BookDraft::new("Dune", "Frank Herbert"))
        .unwrap();
    assert_eq!(updated.cover_filename.as_deref(), Some("9f8e7d.jpg"));
}
