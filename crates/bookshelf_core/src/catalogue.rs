//! Shared catalogue store.
//!
//! # Responsibility
//! - Own the single catalogue connection for the whole process.
//! - Serialize access so concurrent adds cannot corrupt data or reuse ids.
//! - Emit metadata-only mutation log events.
//!
//! # Invariants
//! - The schema is checked once when the store is built.
//! - Every operation runs with the connection lock held.
//! - Log lines never contain user-entered text.

use crate::db::{open_db, open_db_in_memory};
use crate::model::book::{Book, BookDraft, BookId};
use crate::repo::book_repo::{BookSort, SqliteBookRepository};
use crate::service::catalogue_service::{CatalogueError, CatalogueResult, CatalogueService};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// Process-wide catalogue store. Share it behind an `Arc`.
pub struct Catalogue {
    conn: Mutex<Connection>,
}

impl Catalogue {
    /// Opens (or creates) the catalogue database file.
    pub fn open(path: impl AsRef<Path>) -> CatalogueResult<Self> {
        Self::from_connection(open_db(path)?)
    }

    /// Opens a throwaway in-memory catalogue.
    pub fn open_in_memory() -> CatalogueResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Wraps a connection returned by `db::open_db*`.
    ///
    /// Fails with `CatalogueError::Storage` when the schema is not the one
    /// this build expects.
    pub fn from_connection(conn: Connection) -> CatalogueResult<Self> {
        SqliteBookRepository::try_new(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Adds a book. Fails with `CatalogueError::Validation` and leaves the
    /// store unchanged when a required field is missing.
    pub fn add(&self, draft: &BookDraft) -> CatalogueResult<Book> {
        let started_at = Instant::now();
        let result = self.with_service(|service| service.add(draft));
        log_mutation("book_add", started_at, &result);
        result
    }

    /// Returns every book in insertion order.
    pub fn list_all(&self) -> CatalogueResult<Vec<Book>> {
        self.with_service(|service| service.list_all())
    }

    pub fn list_sorted(&self, sort: BookSort) -> CatalogueResult<Vec<Book>> {
        self.with_service(|service| service.list_sorted(sort))
    }

    pub fn get(&self, id: BookId) -> CatalogueResult<Book> {
        self.with_service(|service| service.get(id))
    }

    pub fn update(&self, id: BookId, draft: &BookDraft) -> CatalogueResult<Book> {
        let started_at = Instant::now();
        let result = self.with_service(|service| service.update(id, draft));
        log_mutation("book_update", started_at, &result);
        result
    }

    /// Deletes a book and returns the removed record.
    pub fn delete(&self, id: BookId) -> CatalogueResult<Book> {
        let started_at = Instant::now();
        let result = self.with_service(|service| service.delete(id));
        log_mutation("book_delete", started_at, &result);
        result
    }

    pub fn count(&self) -> CatalogueResult<u64> {
        self.with_service(|service| service.count())
    }

    fn with_service<T>(
        &self,
        op: impl FnOnce(&CatalogueService<SqliteBookRepository<'_>>) -> CatalogueResult<T>,
    ) -> CatalogueResult<T> {
        let conn = self.lock();
        op(&CatalogueService::new(SqliteBookRepository::from_checked(&conn)))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement cannot leave a half-applied write: SQLite
        // rolls back the open statement, so the connection stays usable.
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("event=catalogue_lock module=catalogue status=recovered");
            self.conn.clear_poison();
            poisoned.into_inner()
        })
    }
}

fn log_mutation<T>(event: &str, started_at: Instant, result: &CatalogueResult<T>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!("event={event} module=catalogue status=ok duration_ms={duration_ms}"),
        Err(err @ (CatalogueError::Validation(_) | CatalogueError::NotFound(_))) => debug!(
            "event={event} module=catalogue status=rejected duration_ms={duration_ms} error_code={}",
            err.code()
        ),
        Err(err) => error!(
            "event={event} module=catalogue status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::Catalogue;
    use crate::db::open_db_in_memory;
    use crate::model::book::BookDraft;
    use crate::service::catalogue_service::CatalogueError;
    use std::panic::{self, AssertUnwindSafe};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn catalogue_is_shareable_across_threads() {
        assert_send_sync::<Catalogue>();
    }

    #[test]
    fn poisoned_lock_is_recovered_with_data_intact() {
        let catalogue = Catalogue::open_in_memory().unwrap();
        let first = catalogue.add(&BookDraft::new("Dune", "Herbert")).unwrap();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = catalogue.conn.lock().unwrap();
            panic!("worker died while holding the catalogue lock");
        }));
        assert!(outcome.is_err());
        assert!(catalogue.conn.is_poisoned());

        let second = catalogue.add(&BookDraft::new("Emma", "Jane Austen")).unwrap();
        assert!(!catalogue.conn.is_poisoned());
        assert_eq!(catalogue.list_all().unwrap(), vec![first, second]);
    }

    #[test]
    fn unmigrated_connection_is_rejected_up_front() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("PRAGMA user_version = 0;").unwrap();

        assert!(matches!(
            Catalogue::from_connection(conn),
            Err(CatalogueError::Storage(_))
        ));
    }
}
