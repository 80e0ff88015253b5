use bookshelf_core::{Book, BookDraft, BookValidationError, Genre};
use uuid::Uuid;

#[test]
fn from_draft_trims_fields_and_defaults_genre() {
    let mut draft = BookDraft::new("  Dune ", " Frank Herbert ");
    draft.edition = "   ".to_string();
    let book = Book::from_draft(&draft).unwrap();

    assert!(!book.id.is_nil());
    assert_eq!(book.title, "Dune");
    assert_eq!(book.author, "Frank Herbert");
    assert_eq!(book.author_first, "frank");
    assert_eq!(book.edition, None);
    assert_eq!(book.hover_note, None);
    assert_eq!(book.genre, Genre::Other);
    assert!(book.created_at > 0);
}

#[test]
fn drafts_missing_required_fields_are_rejected() {
    assert_eq!(
        BookDraft::new("", "X").validate().unwrap_err(),
        BookValidationError::MissingTitle
    );
    assert_eq!(
        BookDraft::new("Title", "  ").validate().unwrap_err(),
        BookValidationError::MissingAuthor
    );
}

#[test]
fn unknown_genre_and_overlong_fields_are_rejected() {
    let draft = BookDraft {
        genre: "poetry".to_string(),
        ..BookDraft::new("Title", "Author")
    };
    assert_eq!(
        draft.validate().unwrap_err(),
        BookValidationError::UnknownGenre("poetry".to_string())
    );

    let draft = BookDraft::new("x".repeat(301), "Author");
    assert_eq!(
        draft.validate().unwrap_err(),
        BookValidationError::FieldTooLong {
            field: "title",
            max_chars: 300
        }
    );
}

#[test]
fn validation_messages_are_human_readable() {
    assert_eq!(BookValidationError::MissingTitle.to_string(), "title is required");
    assert_eq!(
        BookValidationError::FieldTooLong {
            field: "author",
            max_chars: 200
        }
        .to_string(),
        "author must be at most 200 characters"
    );
}

#[test]
fn apply_draft_keeps_identity_and_creation_time() {
    let mut book = Book::from_draft(&BookDraft::new("Old", "Old Author")).unwrap();
    let (id, created_at) = (book.id, book.created_at);

    let draft = BookDraft {
        genre: "fantasy".to_string(),
        ..BookDraft::new("New", "Ursula K. Le Guin")
    };
    book.apply_draft(&draft).unwrap();

    assert_eq!(book.id, id);
    assert_eq!(book.created_at, created_at);
    assert_eq!(book.title, "New");
    assert_eq!(book.author_first, "ursula");
    assert_eq!(book.genre, Genre::Fantasy);
}

#[test]
fn failed_apply_draft_leaves_book_untouched() {
    let mut book = Book::from_draft(&BookDraft::new("Keep", "Me")).unwrap();
    let before = book.clone();

    assert!(book.apply_draft(&BookDraft::new("", "Other")).is_err());
    assert_eq!(book, before);
}

#[test]
fn to_draft_roundtrips_through_validation() {
    let draft = BookDraft {
        edition: "Folio".to_string(),
        genre: "Dark Romance".to_string(),
        hover_note: "gift from Sam".to_string(),
        ..BookDraft::new("Title", "Author")
    };
    let book = Book::from_draft(&draft).unwrap();

    let back = book.to_draft();
    assert_eq!(back.genre, "dark_romance");
    assert_eq!(back.validate().unwrap(), draft.validate().unwrap());
}

#[test]
fn draft_without_cover_keeps_existing_cover() {
    let draft = BookDraft {
        cover_filename: Some("a1b2.jpg".to_string()),
        ..BookDraft::new("Dune", "Frank Herbert")
    };
    let mut book = Book::from_draft(&draft).unwrap();

    book.apply_draft(&BookDraft::new("Dune Messiah", "Frank Herbert"))
        .unwrap();
    assert_eq!(book.cover_filename.as_deref(), Some("a1b2.jpg"));

    let replacement = BookDraft {
        cover_filename: Some("c3d4.png".to_string()),
        ..book.to_draft()
    };
    book.apply_draft(&replacement).unwrap();
    assert_eq!(book.cover_filename.as_deref(), Some("c3d4.png"));
}

#[test]
fn cover_with_path_parts_is_rejected() {
    let draft = BookDraft {
        cover_filename: Some("../../etc/passwd".to_string()),
        ..BookDraft::new("Dune", "Frank Herbert")
    };
    assert_eq!(
        draft.validate().unwrap_err(),
        BookValidationError::InvalidCoverFilename
    );
}

#[test]
fn from_valid_rejects_nil_id() {
    let valid = BookDraft::new("Title", "Author").validate().unwrap();
    let err = Book::from_valid(Uuid::nil(), valid, 0).unwrap_err();
    assert_eq!(err, BookValidationError::NilId);
}

#[test]
fn serialization_uses_expected_wire_fields() {
    let id = Uuid::parse_str("11111111-2222-4333-8444-555555555555").unwrap();
    let draft = BookDraft {
        genre: "sci-fi".to_string(),
        ..BookDraft::new("Dune", "Frank Herbert")
    };
    let book = Book::from_valid(id, draft.validate().unwrap(), 1_700_000_000_000).unwrap();

    let json = serde_json::to_value(&book).unwrap();
    assert_eq!(json["id"], id.to_string());
    assert_eq!(json["genre"], "sci_fi");
    assert_eq!(json["author_first"], "frank");
    assert_eq!(json["edition"], serde_json::Value::Null);
    assert_eq!(json["cover_filename"], serde_json::Value::Null);
    assert_eq!(json["created_at"], 1_700_000_000_000_i64);

    let decoded: Book = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, book);
}

#[test]
fn deserialize_rejects_inconsistent_author_first() {
    let value = serde_json::json!({
        "id": "11111111-2222-4333-8444-555555555555",
        "title": "Dune",
        "author": "Frank Herbert",
        "author_first": "herbert",
        "edition": null,
        "genre": "sci_fi",
        "hover_note": null,
        "created_at": 1
    });

    let err = serde_json::from_value::<Book>(value).unwrap_err();
    assert!(
        err.to_string().contains("author_first"),
        "unexpected error: {err}"
    );
}
