//! Seeded procedural geometry generator.
//!
//! # Responsibility
//! - Map `(seed, parameters, content_units)` to a `Geometry`.
//!
//! # Invariants
//! - Pure function: no clock, no shared state, no error paths.
//! - Random draws happen in this fixed order:
//!   1. ring count, 2. spoke candidate, then for every ring (outermost first)
//!   3. ring-gap jitter, 4. ring bias jitter, then for every segment
//!   5. start jitter, 6. span jitter; finally for every connector set (ring
//!   pair ascending) and every spoke ascending 7. connector angle jitter.
//! - Parameters only change how draws are mapped, never how many draws a
//!   ring or segment consumes. Ring and spoke counts are the only exception.

use crate::geometry::rng::SeedStream;
use crate::model::geometry::{
    ArcSegment, CenterNode, Connector, ConnectorSet, DashProfile, Geometry, Ring,
};
use crate::model::params::{Modality, ParameterVector, Perspective};
use std::f64::consts::{PI, TAU};

pub const MIN_RINGS: usize = 3;
pub const MAX_RINGS: usize = 7;
pub const SPOKE_CANDIDATES: [usize; 5] = [3, 4, 5, 6, 8];
pub const MAX_SPOKES: usize = 12;
pub const OUTER_RADIUS: f64 = 90.0;
pub const MIN_STROKE_WIDTH: f64 = 1.0;
pub const MAX_STROKE_WIDTH: f64 = 6.0;
pub const MIN_OPACITY: f64 = 0.35;
pub const MAX_OPACITY: f64 = 0.95;
pub const PERSPECTIVE_ROTATION_DEG: f64 = 15.0;

const INNER_LIMIT: f64 = 20.0;
const STROKE_TAPER_PER_RING: f64 = 0.08;
const MODALITY_BIAS: f64 = PI / 12.0;
const GAP_JITTER: f64 = 0.3;
const RING_BIAS_JITTER: f64 = 0.2;
const START_JITTER: f64 = 0.1;
const CONNECTOR_JITTER: f64 = 0.2;
const MIN_SPAN_FRACTION: f64 = 0.15;
const MAX_SPAN_FRACTION: f64 = 0.92;
const CENTER_BASE_RADIUS: f64 = 4.0;
const CENTER_AGENCY_RADIUS: f64 = 10.0;
const HALO_GAP: f64 = 4.0;

/// Generates the geometry for one grapheme or clause.
///
/// `content_units` drives ring/spoke cardinality; zero is treated as one.
pub fn generate_geometry(seed: u32, params: &ParameterVector, content_units: u32) -> Geometry {
    let params = params.clamped();
    let units = content_units.max(1) as usize;
    let mut stream = SeedStream::new(seed);

    let ring_count = ring_count(params.temporality, units, stream.next_f64());
    let spokes = spoke_count(units, stream.pick(SPOKE_CANDIDATES.len()));
    let slot = TAU / spokes as f64;
    let gap = (OUTER_RADIUS - INNER_LIMIT) / ring_count as f64;
    let base_width = stroke_width(params.certainty, params.emphasis);
    let opacity = opacity(params.agency);
    let dash = DashProfile::from_flags(params.negation, params.hypothetical);
    let bias = modality_bias(params.modality);
    let span_base = 0.45 + 0.3 * params.temporality;
    let span_irregularity = 0.1 + 0.5 * params.temporality;

    let mut rings = Vec::with_capacity(ring_count);
    for index in 0..ring_count {
        let radius = OUTER_RADIUS - index as f64 * gap + stream.jitter(gap * GAP_JITTER);
        let ring_bias = bias + stream.jitter(RING_BIAS_JITTER);

        let mut segments = Vec::with_capacity(spokes);
        for slot_index in 0..spokes {
            let start = slot_index as f64 * slot + ring_bias + stream.jitter(slot * START_JITTER);
            let fraction = (span_base + stream.jitter(span_irregularity))
                .clamp(MIN_SPAN_FRACTION, MAX_SPAN_FRACTION);
            segments.push(ArcSegment {
                start,
                sweep: slot * fraction,
            });
        }

        rings.push(Ring {
            radius,
            stroke_width: tapered_width(base_width, index),
            opacity,
            dash,
            segments,
        });
    }

    let mut connectors = Vec::with_capacity(ring_count.saturating_sub(1));
    for outer_ring in 0..ring_count.saturating_sub(1) {
        let outer_radius = rings[outer_ring].radius;
        let inner_radius = rings[outer_ring + 1].radius;
        let set = (0..spokes)
            .map(|spoke| Connector {
                angle: (spoke as f64 + 0.5) * slot + stream.jitter(slot * CONNECTOR_JITTER),
                inner_radius,
                outer_radius,
            })
            .collect();
        connectors.push(ConnectorSet {
            outer_ring,
            spokes: set,
        });
    }

    let center_radius = CENTER_BASE_RADIUS + CENTER_AGENCY_RADIUS * params.agency;
    let center = CenterNode {
        radius: center_radius,
        opacity,
        halo_radius: match params.perspective {
            Perspective::Neutral => None,
            Perspective::Positive | Perspective::Negative => Some(center_radius + HALO_GAP),
        },
    };

    Geometry {
        rotation_deg: perspective_rotation(params.perspective),
        rings,
        connectors,
        center,
    }
}

/// More temporality and more content add rings; one draw adds at most one.
pub fn ring_count(temporality: f64, units: usize, draw: f64) -> usize {
    let base = MIN_RINGS + (2.0 * temporality).round() as usize + usize::from(units > 2);
    let extra = (draw * 2.0) as usize;
    (base + extra.min(1)).clamp(MIN_RINGS, MAX_RINGS)
}

/// Candidate spoke count scaled by content, capped for legibility.
pub fn spoke_count(units: usize, candidate_index: usize) -> usize {
    let candidate = SPOKE_CANDIDATES[candidate_index.min(SPOKE_CANDIDATES.len() - 1)];
    (candidate * units.max(1).div_ceil(2)).min(MAX_SPOKES)
}

/// Monotonically increasing in both inputs, clamped to the stroke range.
pub fn stroke_width(certainty: f64, emphasis: f64) -> f64 {
    let weight = 0.6 * certainty + 0.4 * emphasis;
    (MIN_STROKE_WIDTH + (MAX_STROKE_WIDTH - MIN_STROKE_WIDTH) * weight)
        .clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
}

fn tapered_width(base: f64, ring_index: usize) -> f64 {
    (base * (1.0 - STROKE_TAPER_PER_RING * ring_index as f64)).max(MIN_STROKE_WIDTH * 0.5)
}

pub fn opacity(agency: f64) -> f64 {
    (MIN_OPACITY + (MAX_OPACITY - MIN_OPACITY) * agency).clamp(MIN_OPACITY, MAX_OPACITY)
}

pub fn modality_bias(modality: Modality) -> f64 {
    match modality {
        Modality::Possibility => -MODALITY_BIAS,
        Modality::Neutral => 0.0,
        Modality::Obligation => MODALITY_BIAS,
    }
}

pub fn perspective_rotation(perspective: Perspective) -> f64 {
    match perspective {
        Perspective::Neutral => 0.0,
        Perspective::Positive => PERSPECTIVE_ROTATION_DEG,
        Perspective::Negative => -PERSPECTIVE_ROTATION_DEG,
    }
}
