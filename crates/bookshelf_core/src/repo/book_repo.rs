//! Book repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `books` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Book::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Every list order ends with `seq`, so equal sort keys keep insertion order.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::book::{Book, BookId, BookValidationError, Genre};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const BOOK_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    author,
    author_first,
    edition,
    genre,
    hover_note,
    cover_filename,
    created_at
FROM books";

const REQUIRED_BOOK_COLUMNS: [&str; 10] = [
    "seq",
    "uuid",
    "title",
    "author",
    "author_first",
    "edition",
    "genre",
    "hover_note",
    "cover_filename",
    "created_at",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for book persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(BookValidationError),
    Db(DbError),
    NotFound(BookId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "book not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted book data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BookValidationError> for RepoError {
    fn from(value: BookValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Ordering applied to book listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookSort {
    /// Oldest first, exactly as records were added.
    #[default]
    Inserted,
    /// Most recently added first.
    Newest,
    Title,
    Genre,
    /// By author first name, then full author name.
    Author,
}

impl BookSort {
    /// Sorts offered by the collection page, with their query keys.
    pub const COLLECTION: [BookSort; 4] = [
        BookSort::Newest,
        BookSort::Title,
        BookSort::Genre,
        BookSort::Author,
    ];

    /// Maps a collection query key; unknown or empty keys fall back to `Newest`.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "title" => Self::Title,
            "genre" => Self::Genre,
            "author" => Self::Author,
            "inserted" => Self::Inserted,
            _ => Self::Newest,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Newest => "date",
            Self::Title => "title",
            Self::Genre => "genre",
            Self::Author => "author",
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            Self::Inserted => "seq ASC",
            Self::Newest => "created_at DESC, seq DESC",
            Self::Title => "title COLLATE NOCASE ASC, seq ASC",
            Self::Genre => "genre ASC, title COLLATE NOCASE ASC, seq ASC",
            Self::Author => {
                "author_first COLLATE NOCASE ASC, author COLLATE NOCASE ASC, seq ASC"
            }
        }
    }
}

/// Repository interface for book CRUD operations.
pub trait BookRepository {
    fn create_book(&self, book: &Book) -> RepoResult<BookId>;
    fn update_book(&self, book: &Book) -> RepoResult<()>;
    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>>;
    fn list_books(&self, sort: BookSort) -> RepoResult<Vec<Book>>;
    fn count_books(&self) -> RepoResult<u64>;
    fn delete_book(&self, id: BookId) -> RepoResult<()>;
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` is not the latest.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when the schema is incomplete.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection that already passed `try_new` once.
    pub(crate) fn from_checked(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn create_book(&self, book: &Book) -> RepoResult<BookId> {
        book.validate()?;

        self.conn.execute(
            "INSERT INTO books (
                uuid,
                title,
                author,
                author_first,
                edition,
                genre,
                hover_note,
                cover_filename,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                book.id.to_string(),
                book.title.as_str(),
                book.author.as_str(),
                book.author_first.as_str(),
                book.edition.as_deref(),
                book.genre.key(),
                book.hover_note.as_deref(),
                book.cover_filename.as_deref(),
                book.created_at,
            ],
        )?;

        Ok(book.id)
    }

    fn update_book(&self, book: &Book) -> RepoResult<()> {
        book.validate()?;

        let changed = self.conn.execute(
            "UPDATE books
             SET
                title = ?1,
                author = ?2,
                author_first = ?3,
                edition = ?4,
                genre = ?5,
                hover_note = ?6,
                cover_filename = ?7
             WHERE uuid = ?8;",
            params![
                book.title.as_str(),
                book.author.as_str(),
                book.author_first.as_str(),
                book.edition.as_deref(),
                book.genre.key(),
                book.hover_note.as_deref(),
                book.cover_filename.as_deref(),
                book.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(book.id));
        }

        Ok(())
    }

    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOK_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_book_row(row)?));
        }

        Ok(None)
    }

    fn list_books(&self, sort: BookSort) -> RepoResult<Vec<Book>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BOOK_SELECT_SQL} ORDER BY {};", sort.order_by()))?;
        let mut rows = stmt.query([])?;
        let mut books = Vec::new();

        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }

        Ok(books)
    }

    fn count_books(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative book count `{count}`")))
    }

    fn delete_book(&self, id: BookId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM books WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in books.uuid"))
    })?;

    let genre_text: String = row.get("genre")?;
    let genre = Genre::parse(&genre_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid genre `{genre_text}` in books.genre"))
    })?;

    let book = Book {
        id,
        title: row.get("title")?,
        author: row.get("author")?,
        author_first: row.get("author_first")?,
        edition: row.get("edition")?,
        genre,
        hover_note: row.get("hover_note")?,
        cover_filename: row.get("cover_filename")?,
        created_at: row.get("created_at")?,
    };
    book.validate()?;
    Ok(book)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "books")? {
        return Err(RepoError::MissingRequiredTable("books"));
    }

    for column in REQUIRED_BOOK_COLUMNS {
        if !table_has_column(conn, "books", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "books",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
