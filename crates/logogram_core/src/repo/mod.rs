//! Repository layer for grapheme persistence.
//!
//! # Responsibility
//! - Define the storage contract the grapheme store depends on.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Writes are insert-if-absent; the first writer for a key wins.
//! - Repository APIs return semantic errors (`InvalidData`) in addition to DB
//!   transport errors.

pub mod grapheme_repo;
