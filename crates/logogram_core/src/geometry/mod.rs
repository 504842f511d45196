//! Deterministic geometry generation.
//!
//! # Responsibility
//! - Derive seeds from text keys.
//! - Turn a seed and a parameter vector into reproducible shapes.
//!
//! # Invariants
//! - Same seed + same parameters + same content units ⇒ identical geometry.

pub mod generator;
pub mod rng;
