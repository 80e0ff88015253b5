//! Catalogue domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//!
//! # Invariants
//! - Every record is identified by a stable `BookId`.
//! - Records are removed by hard delete; there are no tombstones.

pub mod book;
