//! Grapheme domain model.
//!
//! # Responsibility
//! - Define the persisted visual identity of one normalized word.
//! - Own key normalization and the derivation of identity fields.
//!
//! # Invariants
//! - `key` is trimmed and lower-cased.
//! - `seed`, `parameters` and `content_units` never change after creation.
//! - `geometry` equals `generate_geometry(seed, parameters, content_units)`.

use crate::geometry::generator::generate_geometry;
use crate::geometry::rng::hash_to_seed;
use crate::model::geometry::Geometry;
use crate::model::params::ParameterVector;
use serde::{Deserialize, Serialize};

const MAX_CONTENT_UNITS: u32 = 4;
const MAX_ARCHIVE_STEM_CHARS: usize = 48;

/// Canonical record for one word's glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grapheme {
    pub key: String,
    pub seed: u32,
    /// Generator cardinality input, derived from `key` alone.
    pub content_units: u32,
    /// Snapshot of the vector in effect when the record was first created.
    pub parameters: ParameterVector,
    pub geometry: Geometry,
    /// File name of the archived standalone SVG.
    pub archive_name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Grapheme {
    /// Derives a fresh record for `word`.
    ///
    /// The key is normalized here; `parameters` are clamped before use so the
    /// stored snapshot is exactly what the generator consumed.
    pub fn derive(word: &str, parameters: &ParameterVector, created_at: i64) -> Self {
        let key = normalize_key(word);
        let seed = hash_to_seed(&key);
        let content_units = content_units_for(&key);
        let parameters = parameters.clamped();
        let geometry = generate_geometry(seed, &parameters, content_units);
        let archive_name = archive_name_for(&key, seed);
        Self {
            key,
            seed,
            content_units,
            parameters,
            geometry,
            archive_name,
            created_at,
        }
    }

    /// Regenerates geometry from the identity fields.
    pub fn regenerate_geometry(&self) -> Geometry {
        generate_geometry(self.seed, &self.parameters, self.content_units)
    }

    /// Returns whether the stored geometry still matches regeneration.
    pub fn is_consistent(&self) -> bool {
        self.key == normalize_key(&self.key)
            && self.seed == hash_to_seed(&self.key)
            && self.geometry == self.regenerate_geometry()
    }
}

/// Case-folds and trims a word into its store key.
pub fn normalize_key(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Counts vowel groups as a cheap syllable estimate, clamped to `1..=4`.
pub fn content_units_for(key: &str) -> u32 {
    let mut groups = 0u32;
    let mut in_group = false;
    for ch in key.chars() {
        let vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !in_group {
            groups += 1;
        }
        in_group = vowel;
    }
    groups.clamp(1, MAX_CONTENT_UNITS)
}

/// Builds `<sanitized key>-<seed hex>.svg`.
///
/// The seed suffix keeps names unique when sanitization collapses two keys.
pub fn archive_name_for(key: &str, seed: u32) -> String {
    let stem: String = key
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .take(MAX_ARCHIVE_STEM_CHARS)
        .collect();
    let stem = if stem.is_empty() { "blank" } else { stem.as_str() };
    format!("{stem}-{seed:08x}.svg")
}
