//! Core use-case services.
//!
//! # Responsibility
//! - Own grapheme resolution (`grapheme_store`) and phrase layout
//!   (`composer`) on top of repository and archive contracts.
//! - Keep callers decoupled from storage details.

pub mod composer;
pub mod grapheme_store;
pub mod tokenize;
