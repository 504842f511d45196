//! Phrase composer.
//!
//! # Responsibility
//! - Tokenize phrases and resolve one grapheme per content word via the store.
//! - Lay the resolved graphemes out as single, composite or blend layers.
//!
//! # Invariants
//! - The visible logogram is an assembly of per-word grapheme shapes; layout
//!   never alters a grapheme, it only places it.
//! - Layout is a pure function of the tokens, mode and composition seed. The
//!   default seed is derived from the request content, so identical requests
//!   render identically.
//! - Layers are emitted outermost first; glyphs in token order.

use crate::geometry::rng::{hash_to_seed, SeedStream};
use crate::model::grapheme::Grapheme;
use crate::model::logogram::{Composition, CompositionMode, GlyphPlacement, Layer, Placement};
use crate::model::params::ParameterVector;
use crate::repo::grapheme_repo::GraphemeRepository;
use crate::service::grapheme_store::{GraphemeStore, StoreResult};
use crate::service::tokenize::{split_clauses, tokenize};
use std::collections::BTreeMap;

pub const COMPOSITE_ROTATION_STEP_DEG: f64 = 30.0;
pub const COMPOSITE_SCALE_DECAY: f64 = 0.82;
pub const COMPOSITE_OPACITY_DECAY: f64 = 0.15;
pub const COMPOSITE_MIN_OPACITY: f64 = 0.3;
pub const BLEND_ROTATION_DEG: f64 = 12.0;
pub const BLEND_MIN_OPACITY: f64 = 0.1;
pub const BLEND_MAX_OPACITY: f64 = 1.0;
pub const INDICATOR_MIN_RADIUS: f64 = 3.0;
pub const INDICATOR_RADIUS_RANGE: f64 = 7.0;

const GLYPH_SCALE_SPAN: f64 = 0.55;
const GLYPH_OPACITY_DECAY: f64 = 0.08;
const GLYPH_MIN_OPACITY: f64 = 0.5;
const GLYPH_JITTER_DEG: f64 = 12.0;
const SEED_FIELD_SEPARATOR: char = '\u{1f}';

/// One side of a blend request.
#[derive(Debug, Clone, Copy)]
pub struct BlendInput<'a> {
    pub phrase: &'a str,
    pub parameters: &'a ParameterVector,
}

/// Builds compositions on top of a grapheme store.
pub struct PhraseComposer<'s, R: GraphemeRepository> {
    store: &'s GraphemeStore<R>,
}

impl<'s, R: GraphemeRepository> PhraseComposer<'s, R> {
    pub fn new(store: &'s GraphemeStore<R>) -> Self {
        Self { store }
    }

    /// One layer holding every content word of `phrase`, concentric.
    pub fn compose_single(
        &self,
        phrase: &str,
        parameters: &ParameterVector,
        composition_seed: Option<u32>,
    ) -> StoreResult<Composition> {
        let tokens = tokenize(phrase);
        let mut graphemes = BTreeMap::new();
        self.resolve(&tokens, parameters, &mut graphemes)?;

        let seed = composition_seed
            .unwrap_or_else(|| default_seed(CompositionMode::Single, &[&tokens], ""));
        let mut stream = SeedStream::new(seed);
        let layer = Layer {
            placement: Placement::identity(0),
            glyphs: place_glyphs(&tokens, &mut stream),
        };

        Ok(Composition {
            mode: CompositionMode::Single,
            tokens,
            layers: vec![layer],
            center_indicator: None,
            graphemes,
        })
    }

    /// One layer per newline-delimited clause, rotated, shrunk and faded by
    /// clause index.
    pub fn compose_composite(
        &self,
        text: &str,
        parameters: &ParameterVector,
        composition_seed: Option<u32>,
    ) -> StoreResult<Composition> {
        let clause_tokens: Vec<Vec<String>> = split_clauses(text)
            .into_iter()
            .map(tokenize)
            .collect();
        let mut graphemes = BTreeMap::new();
        for tokens in &clause_tokens {
            self.resolve(tokens, parameters, &mut graphemes)?;
        }

        let seed = composition_seed.unwrap_or_else(|| {
            let groups: Vec<&Vec<String>> = clause_tokens.iter().collect();
            default_seed(CompositionMode::Composite, &groups, "")
        });
        let mut stream = SeedStream::new(seed);
        let layers = clause_tokens
            .iter()
            .enumerate()
            .map(|(index, tokens)| Layer {
                placement: composite_placement(index),
                glyphs: place_glyphs(tokens, &mut stream),
            })
            .collect();

        Ok(Composition {
            mode: CompositionMode::Composite,
            tokens: clause_tokens.into_iter().flatten().collect(),
            layers,
            center_indicator: None,
            graphemes,
        })
    }

    /// Two opposed-rotation layers weighted by `weight` in `[0, 1]`.
    ///
    /// Weight 0 shows `primary` alone at full strength; weight 1 shows
    /// `secondary` alone at full strength.
    pub fn compose_blend(
        &self,
        primary: BlendInput<'_>,
        secondary: BlendInput<'_>,
        weight: f64,
        composition_seed: Option<u32>,
    ) -> StoreResult<Composition> {
        let weight = if weight.is_nan() {
            0.0
        } else {
            weight.clamp(0.0, 1.0)
        };
        let primary_tokens = tokenize(primary.phrase);
        let secondary_tokens = tokenize(secondary.phrase);
        let mut graphemes = BTreeMap::new();
        self.resolve(&primary_tokens, primary.parameters, &mut graphemes)?;
        self.resolve(&secondary_tokens, secondary.parameters, &mut graphemes)?;

        let seed = composition_seed.unwrap_or_else(|| {
            default_seed(
                CompositionMode::Blend,
                &[&primary_tokens, &secondary_tokens],
                &format!("{weight:.6}"),
            )
        });
        let mut stream = SeedStream::new(seed);
        let (primary_opacity, secondary_opacity) = blend_opacities(weight);
        let layers = vec![
            Layer {
                placement: Placement {
                    rotation_deg: BLEND_ROTATION_DEG,
                    scale: 1.0,
                    opacity: primary_opacity,
                    z_order: 0,
                },
                glyphs: place_glyphs(&primary_tokens, &mut stream),
            },
            Layer {
                placement: Placement {
                    rotation_deg: -BLEND_ROTATION_DEG,
                    scale: 1.0,
                    opacity: secondary_opacity,
                    z_order: 1,
                },
                glyphs: place_glyphs(&secondary_tokens, &mut stream),
            },
        ];

        let mut tokens = primary_tokens;
        tokens.extend(secondary_tokens);
        Ok(Composition {
            mode: CompositionMode::Blend,
            tokens,
            layers,
            center_indicator: Some(indicator_radius(weight)),
            graphemes,
        })
    }

    fn resolve(
        &self,
        tokens: &[String],
        parameters: &ParameterVector,
        graphemes: &mut BTreeMap<String, Grapheme>,
    ) -> StoreResult<()> {
        for token in tokens {
            if graphemes.contains_key(token) {
                continue;
            }
            let grapheme = self.store.get_or_create(token, parameters)?;
            graphemes.insert(token.clone(), grapheme);
        }
        Ok(())
    }
}

/// Linear opacity pair `(primary, secondary)` for a blend weight.
pub fn blend_opacities(weight: f64) -> (f64, f64) {
    (
        lerp(BLEND_MAX_OPACITY, BLEND_MIN_OPACITY, weight),
        lerp(BLEND_MIN_OPACITY, BLEND_MAX_OPACITY, weight),
    )
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from * (1.0 - t) + to * t
}

/// Balanced blends get a small indicator; dominant ones a large one.
pub fn indicator_radius(weight: f64) -> f64 {
    INDICATOR_MIN_RADIUS + INDICATOR_RADIUS_RANGE * (2.0 * weight - 1.0).abs()
}

pub fn composite_placement(index: usize) -> Placement {
    let step = index as f64;
    Placement {
        rotation_deg: step * COMPOSITE_ROTATION_STEP_DEG,
        scale: COMPOSITE_SCALE_DECAY.powi(index as i32),
        opacity: (1.0 - COMPOSITE_OPACITY_DECAY * step).max(COMPOSITE_MIN_OPACITY),
        z_order: index,
    }
}

fn place_glyphs(tokens: &[String], stream: &mut SeedStream) -> Vec<GlyphPlacement> {
    let count = tokens.len().max(1) as f64;
    tokens
        .iter()
        .enumerate()
        .map(|(index, token)| {
            let step = index as f64;
            GlyphPlacement {
                key: token.clone(),
                placement: Placement {
                    rotation_deg: step * 360.0 / count + stream.jitter(GLYPH_JITTER_DEG),
                    scale: 1.0 - GLYPH_SCALE_SPAN * step / count,
                    opacity: (1.0 - GLYPH_OPACITY_DECAY * step).max(GLYPH_MIN_OPACITY),
                    z_order: index,
                },
            }
        })
        .collect()
}

fn default_seed(mode: CompositionMode, groups: &[&Vec<String>], extra: &str) -> u32 {
    let mut key = String::from(mode.as_str());
    for group in groups {
        key.push(SEED_FIELD_SEPARATOR);
        key.push_str(&group.join(" "));
    }
    key.push(SEED_FIELD_SEPARATOR);
    key.push_str(extra);
    hash_to_seed(&key)
}
