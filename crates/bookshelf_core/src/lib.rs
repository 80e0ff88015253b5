//! Core domain logic for Bookshelf.
//! This crate is the single source of truth for catalogue invariants.

pub mod catalogue;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use catalogue::Catalogue;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{
    derive_author_first, Book, BookDraft, BookId, BookValidationError, Genre, ValidBook,
};
pub use repo::book_repo::{
    BookRepository, BookSort, RepoError, RepoResult, SqliteBookRepository,
};
pub use service::catalogue_service::{CatalogueError, CatalogueResult, CatalogueService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
