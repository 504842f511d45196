//! Logogram domain model.
//!
//! # Responsibility
//! - Describe one composed rendering: layers, per-glyph placement, output.
//!
//! # Invariants
//! - A `Logogram` is immutable once built by the engine.
//! - Layers are ordered outermost first; `z_order` equals emission order.
//! - Placement is composition state only; it is never written to graphemes.

use crate::model::grapheme::Grapheme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for one generated logogram.
pub type LogogramId = Uuid;

/// Composition strategy selected by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    #[default]
    Single,
    Composite,
    Blend,
}

impl CompositionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Composite => "composite",
            Self::Blend => "blend",
        }
    }
}

impl Display for CompositionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "composite" => Ok(Self::Composite),
            "blend" => Ok(Self::Blend),
            other => Err(format!(
                "unsupported mode `{other}`; expected single|composite|blend"
            )),
        }
    }
}

/// Transform and opacity applied to a layer or a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub rotation_deg: f64,
    pub scale: f64,
    pub opacity: f64,
    pub z_order: usize,
}

impl Placement {
    pub fn identity(z_order: usize) -> Self {
        Self {
            rotation_deg: 0.0,
            scale: 1.0,
            opacity: 1.0,
            z_order,
        }
    }
}

/// One grapheme placed inside a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphPlacement {
    /// Key into `Composition::graphemes`.
    pub key: String,
    pub placement: Placement,
}

/// One layered group of glyphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub placement: Placement,
    pub glyphs: Vec<GlyphPlacement>,
}

/// Layout produced by the composer, before serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub mode: CompositionMode,
    /// All tokens in layer order; duplicates kept.
    pub tokens: Vec<String>,
    pub layers: Vec<Layer>,
    /// Shared center indicator radius; blend mode only.
    pub center_indicator: Option<f64>,
    /// Resolved graphemes keyed by normalized word.
    pub graphemes: BTreeMap<String, Grapheme>,
}

/// Rendered output of one generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct Logogram {
    pub id: LogogramId,
    pub phrase_text: String,
    pub composition: Composition,
    pub svg_document: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Where the SVG was archived; `None` when archival was skipped or failed.
    pub archive_path: Option<PathBuf>,
    /// True when the SVG and every grapheme it references were archived.
    pub archived: bool,
}

impl Logogram {
    pub fn tokens(&self) -> &[String] {
        &self.composition.tokens
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }
}
