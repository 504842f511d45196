//! Archival sinks for rendered SVG artifacts.
//!
//! # Responsibility
//! - Persist standalone grapheme SVGs and composed logogram SVGs.
//!
//! # Invariants
//! - Archival failures never fail the request that produced the artifact.
//! - Re-archiving identical bytes under the same identifier is a no-op.

pub mod sink;
