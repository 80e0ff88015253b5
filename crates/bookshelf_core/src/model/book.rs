//! Book domain model.
//!
//! # Responsibility
//! - Define the canonical catalogue record and its user-facing draft shape.
//! - Own field normalization and validation rules for add/update flows.
//!
//! # Invariants
//! - `id` is a non-nil UUID, assigned once and never changed.
//! - `title` and `author` are trimmed and non-empty.
//! - `author_first` always mirrors `derive_author_first(author)`.
//! - `created_at` is set at creation and never changed.
//! - `cover_filename`, when present, is a bare file name with no path parts.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for a catalogue record.
pub type BookId = Uuid;

pub const TITLE_MAX_CHARS: usize = 300;
pub const AUTHOR_MAX_CHARS: usize = 200;
pub const EDITION_MAX_CHARS: usize = 200;
pub const HOVER_NOTE_MAX_CHARS: usize = 500;
pub const COVER_FILENAME_MAX_CHARS: usize = 100;

/// Fixed genre shelf used by the add/edit forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Romance,
    Romantasy,
    Fantasy,
    DarkRomance,
    ContemporaryRomance,
    Thriller,
    Mystery,
    Horror,
    SciFi,
    Historical,
    YoungAdult,
    NewAdult,
    NonFiction,
    #[default]
    Other,
}

impl Genre {
    /// All genres in form display order.
    pub const ALL: [Genre; 14] = [
        Genre::Romance,
        Genre::Romantasy,
        Genre::Fantasy,
        Genre::DarkRomance,
        Genre::ContemporaryRomance,
        Genre::Thriller,
        Genre::Mystery,
        Genre::Horror,
        Genre::SciFi,
        Genre::Historical,
        Genre::YoungAdult,
        Genre::NewAdult,
        Genre::NonFiction,
        Genre::Other,
    ];

    /// Storage/wire key, e.g. `sci_fi`.
    pub fn key(self) -> &'static str {
        match self {
            Genre::Romance => "romance",
            Genre::Romantasy => "romantasy",
            Genre::Fantasy => "fantasy",
            Genre::DarkRomance => "dark_romance",
            Genre::ContemporaryRomance => "contemporary_romance",
            Genre::Thriller => "thriller",
            Genre::Mystery => "mystery",
            Genre::Horror => "horror",
            Genre::SciFi => "sci_fi",
            Genre::Historical => "historical",
            Genre::YoungAdult => "young_adult",
            Genre::NewAdult => "new_adult",
            Genre::NonFiction => "non_fiction",
            Genre::Other => "other",
        }
    }

    /// Human-readable label, e.g. `Sci-Fi`.
    pub fn label(self) -> &'static str {
        match self {
            Genre::Romance => "Romance",
            Genre::Romantasy => "Romantasy",
            Genre::Fantasy => "Fantasy",
            Genre::DarkRomance => "Dark Romance",
            Genre::ContemporaryRomance => "Contemporary Romance",
            Genre::Thriller => "Thriller",
            Genre::Mystery => "Mystery",
            Genre::Horror => "Horror",
            Genre::SciFi => "Sci-Fi",
            Genre::Historical => "Historical",
            Genre::YoungAdult => "Young Adult",
            Genre::NewAdult => "New Adult",
            Genre::NonFiction => "Non-fiction",
            Genre::Other => "Other",
        }
    }

    /// Parses either the storage key or the display label, case-insensitively.
    pub fn parse(value: &str) -> Option<Genre> {
        let trimmed = value.trim();
        Genre::ALL.into_iter().find(|genre| {
            genre.key().eq_ignore_ascii_case(trimmed) || genre.label().eq_ignore_ascii_case(trimmed)
        })
    }
}

impl Display for Genre {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Validation failures for book drafts and records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    MissingTitle,
    MissingAuthor,
    FieldTooLong {
        field: &'static str,
        max_chars: usize,
    },
    UnknownGenre(String),
    NilId,
    AuthorFirstMismatch,
    InvalidCoverFilename,
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "title is required"),
            Self::MissingAuthor => write!(f, "author is required"),
            Self::FieldTooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::UnknownGenre(value) => write!(f, "unknown genre `{value}`"),
            Self::NilId => write!(f, "book id must not be nil"),
            Self::AuthorFirstMismatch => {
                write!(f, "author_first does not match the author name")
            }
            Self::InvalidCoverFilename => write!(f, "cover must be a plain file name"),
        }
    }
}

impl Error for BookValidationError {}

/// Unvalidated field set submitted for add/update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub edition: String,
    /// Genre key or label. Blank means `Genre::Other`.
    pub genre: String,
    pub hover_note: String,
    /// Stored cover file. `None` keeps the current cover on update.
    pub cover_filename: Option<String>,
}

impl BookDraft {
    /// Convenience constructor for the two required fields.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Normalizes and validates the draft.
    ///
    /// Blank optional fields become `None`; every text field is trimmed.
    pub fn validate(&self) -> Result<ValidBook, BookValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(BookValidationError::MissingTitle);
        }
        check_len("title", title, TITLE_MAX_CHARS)?;

        let author = self.author.trim();
        if author.is_empty() {
            return Err(BookValidationError::MissingAuthor);
        }
        check_len("author", author, AUTHOR_MAX_CHARS)?;

        let edition = non_blank(&self.edition);
        if let Some(value) = edition.as_deref() {
            check_len("edition", value, EDITION_MAX_CHARS)?;
        }

        let hover_note = non_blank(&self.hover_note);
        if let Some(value) = hover_note.as_deref() {
            check_len("hover note", value, HOVER_NOTE_MAX_CHARS)?;
        }

        let cover_filename = self.cover_filename.as_deref().and_then(non_blank);
        if let Some(value) = cover_filename.as_deref() {
            check_cover_filename(value)?;
        }

        let genre = if self.genre.trim().is_empty() {
            Genre::Other
        } else {
            Genre::parse(&self.genre)
                .ok_or_else(|| BookValidationError::UnknownGenre(self.genre.trim().to_string()))?
        };

        Ok(ValidBook {
            title: title.to_string(),
            author: author.to_string(),
            edition,
            genre,
            hover_note,
            cover_filename,
        })
    }
}

/// Normalized output of `BookDraft::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidBook {
    pub title: String,
    pub author: String,
    pub edition: Option<String>,
    pub genre: Genre,
    pub hover_note: Option<String>,
    pub cover_filename: Option<String>,
}

/// Canonical catalogue record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BookWire")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    /// Lowercased first token of `author`, used for author sorting.
    pub author_first: String,
    pub edition: Option<String>,
    pub genre: Genre,
    pub hover_note: Option<String>,
    /// File name under the covers directory.
    pub cover_filename: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Book {
    /// Validates a draft and creates a record with a fresh id.
    pub fn from_draft(draft: &BookDraft) -> Result<Self, BookValidationError> {
        Self::from_valid(Uuid::new_v4(), draft.validate()?, now_epoch_ms())
    }

    /// Builds a record from already-validated fields with a caller-chosen
    /// id and creation time.
    pub fn from_valid(
        id: BookId,
        valid: ValidBook,
        created_at: i64,
    ) -> Result<Self, BookValidationError> {
        if id.is_nil() {
            return Err(BookValidationError::NilId);
        }
        let author_first = derive_author_first(&valid.author);
        Ok(Self {
            id,
            title: valid.title,
            author: valid.author,
            author_first,
            edition: valid.edition,
            genre: valid.genre,
            hover_note: valid.hover_note,
            cover_filename: valid.cover_filename,
            created_at,
        })
    }

    /// Replaces mutable fields from a draft. `id` and `created_at` are kept,
    /// and so is the cover when the draft carries none.
    pub fn apply_draft(&mut self, draft: &BookDraft) -> Result<(), BookValidationError> {
        let valid = draft.validate()?;
        self.author_first = derive_author_first(&valid.author);
        self.title = valid.title;
        self.author = valid.author;
        self.edition = valid.edition;
        self.genre = valid.genre;
        self.hover_note = valid.hover_note;
        if valid.cover_filename.is_some() {
            self.cover_filename = valid.cover_filename;
        }
        Ok(())
    }

    /// Projects this record back into an editable draft.
    pub fn to_draft(&self) -> BookDraft {
        BookDraft {
            title: self.title.clone(),
            author: self.author.clone(),
            edition: self.edition.clone().unwrap_or_default(),
            genre: self.genre.key().to_string(),
            hover_note: self.hover_note.clone().unwrap_or_default(),
            cover_filename: self.cover_filename.clone(),
        }
    }

    /// Checks record-level invariants.
    pub fn validate(&self) -> Result<(), BookValidationError> {
        if self.id.is_nil() {
            return Err(BookValidationError::NilId);
        }
        if self.title.trim().is_empty() {
            return Err(BookValidationError::MissingTitle);
        }
        check_len("title", &self.title, TITLE_MAX_CHARS)?;
        if self.author.trim().is_empty() {
            return Err(BookValidationError::MissingAuthor);
        }
        check_len("author", &self.author, AUTHOR_MAX_CHARS)?;
        if let Some(value) = self.edition.as_deref() {
            check_len("edition", value, EDITION_MAX_CHARS)?;
        }
        if let Some(value) = self.hover_note.as_deref() {
            check_len("hover note", value, HOVER_NOTE_MAX_CHARS)?;
        }
        if let Some(value) = self.cover_filename.as_deref() {
            check_cover_filename(value)?;
        }
        if self.author_first != derive_author_first(&self.author) {
            return Err(BookValidationError::AuthorFirstMismatch);
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct BookWire {
    id: BookId,
    title: String,
    author: String,
    author_first: String,
    edition: Option<String>,
    genre: Genre,
    hover_note: Option<String>,
    #[serde(default)]
    cover_filename: Option<String>,
    created_at: i64,
}

impl TryFrom<BookWire> for Book {
    type Error = BookValidationError;

    fn try_from(wire: BookWire) -> Result<Self, Self::Error> {
        let book = Book {
            id: wire.id,
            title: wire.title,
            author: wire.author,
            author_first: wire.author_first,
            edition: wire.edition,
            genre: wire.genre,
            hover_note: wire.hover_note,
            cover_filename: wire.cover_filename,
            created_at: wire.created_at,
        };
        book.validate()?;
        Ok(book)
    }
}

/// Lowercased first whitespace-separated token of an author name.
///
/// Returns an empty string for blank input.
pub fn derive_author_first(author: &str) -> String {
    author
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default()
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn check_len(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), BookValidationError> {
    if value.chars().count() > max_chars {
        return Err(BookValidationError::FieldTooLong { field, max_chars });
    }
    Ok(())
}

/// Accepts names like `3f2a9c.jpg`: ASCII letters, digits, `.`, `-` and `_`,
/// not starting with a dot.
fn check_cover_filename(value: &str) -> Result<(), BookValidationError> {
    let plain = !value.starts_with('.')
        && value.len() <= COVER_FILENAME_MAX_CHARS
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_'));
    if plain {
        Ok(())
    } else {
        Err(BookValidationError::InvalidCoverFilename)
    }
}

#[cfg(test)]
mod tests {
    use super::{check_cover_filename, derive_author_first, Genre};

    #[test]
    fn author_first_takes_first_token_lowercased() {
        assert_eq!(derive_author_first("  Frank Herbert "), "frank");
        assert_eq!(derive_author_first("Tolkien"), "tolkien");
        assert_eq!(derive_author_first("   "), "");
    }

    #[test]
    fn genre_parse_accepts_key_and_label() {
        assert_eq!(Genre::parse("sci_fi"), Some(Genre::SciFi));
        assert_eq!(Genre::parse("Sci-Fi"), Some(Genre::SciFi));
        assert_eq!(Genre::parse(" dark romance "), Some(Genre::DarkRomance));
        assert_eq!(Genre::parse("poetry"), None);
    }

    #[test]
    fn genre_keys_are_unique() {
        let mut keys: Vec<_> = Genre::ALL.iter().map(|genre| genre.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Genre::ALL.len());
    }

    #[test]
    fn cover_filename_must_be_plain() {
        assert!(check_cover_filename("3f2a9c0d.jpg").is_ok());
        assert!(check_cover_filename("../etc/passwd").is_err());
        assert!(check_cover_filename("covers/a.png").is_err());
        assert!(check_cover_filename(".hidden").is_err());
        assert!(check_cover_filename(&"a".repeat(101)).is_err());
    }
}
