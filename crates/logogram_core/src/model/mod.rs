//! Domain model for graphemes, parameters and composed logograms.
//!
//! # Responsibility
//! - Define canonical data structures used by core logic.
//! - Keep persisted identity (`Grapheme`) apart from per-request layout
//!   (`Logogram`).
//!
//! # Invariants
//! - Every grapheme is identified by its normalized word key.
//! - Graphemes are never mutated after creation.

pub mod geometry;
pub mod grapheme;
pub mod logogram;
pub mod params;
