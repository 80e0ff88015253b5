//! Catalogue use-case service.
//!
//! # Responsibility
//! - Turn user drafts into validated records and persist them.
//! - Map repository failures into catalogue-level errors.
//!
//! # Invariants
//! - Writes are followed by a read-back; callers get the stored record.
//! - Validation happens before any repository write.

use crate::db::DbError;
use crate::model::book::{Book, BookDraft, BookId, BookValidationError};
use crate::repo::book_repo::{BookRepository, BookSort, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for catalogue use-cases.
#[derive(Debug)]
pub enum CatalogueError {
    /// Draft is missing required fields or has invalid values.
    Validation(BookValidationError),
    /// Target book does not exist.
    NotFound(BookId),
    /// Persistence-layer failure.
    Storage(RepoError),
    /// Write and read-back disagree.
    InconsistentState(&'static str),
}

impl Display for CatalogueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "book not found: {id}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent catalogue state: {details}"),
        }
    }
}

impl Error for CatalogueError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogueError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Storage(other),
        }
    }
}

impl From<DbError> for CatalogueError {
    fn from(value: DbError) -> Self {
        Self::Storage(RepoError::Db(value))
    }
}

impl From<BookValidationError> for CatalogueError {
    fn from(value: BookValidationError) -> Self {
        Self::Validation(value)
    }
}

impl CatalogueError {
    /// Short stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_failed",
            Self::InconsistentState(_) => "inconsistent_state",
        }
    }
}

pub type CatalogueResult<T> = Result<T, CatalogueError>;

/// Catalogue service facade over repository implementations.
pub struct CatalogueService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> CatalogueService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Validates the draft, assigns a new id and stores the record.
    pub fn add(&self, draft: &BookDraft) -> CatalogueResult<Book> {
        let book = Book::from_draft(draft)?;
        let id = self.repo.create_book(&book)?;
        self.repo
            .get_book(id)?
            .ok_or(CatalogueError::InconsistentState(
                "created book not found in read-back",
            ))
    }

    /// All books in insertion order.
    pub fn list_all(&self) -> CatalogueResult<Vec<Book>> {
        self.list_sorted(BookSort::Inserted)
    }

    pub fn list_sorted(&self, sort: BookSort) -> CatalogueResult<Vec<Book>> {
        Ok(self.repo.list_books(sort)?)
    }

    pub fn get(&self, id: BookId) -> CatalogueResult<Book> {
        self.repo.get_book(id)?.ok_or(CatalogueError::NotFound(id))
    }

    /// Replaces mutable fields of an existing book.
    ///
    /// Unknown ids report `NotFound` before the draft is validated. An invalid
    /// draft never reaches storage.
    pub fn update(&self, id: BookId, draft: &BookDraft) -> CatalogueResult<Book> {
        let mut book = self.get(id)?;
        book.apply_draft(draft)?;
        self.repo.update_book(&book)?;
        self.repo
            .get_book(id)?
            .ok_or(CatalogueError::InconsistentState(
                "updated book not found in read-back",
            ))
    }

    /// Removes a book and returns the record as it was before deletion.
    pub fn delete(&self, id: BookId) -> CatalogueResult<Book> {
        let book = self.get(id)?;
        self.repo.delete_book(id)?;
        Ok(book)
    }

    pub fn count(&self) -> CatalogueResult<u64> {
        Ok(self.repo.count_books()?)
    }
}
