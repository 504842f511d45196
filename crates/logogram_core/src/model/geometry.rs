//! Structured shape description produced by the generator.
//!
//! Angles are radians, lengths are in the `[-100, 100]` canvas space used by
//! the SVG serializer. Rings are ordered outermost first.

use serde::{Deserialize, Serialize};

/// Full geometric description of one grapheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Global rotation in degrees, selected by perspective.
    pub rotation_deg: f64,
    pub rings: Vec<Ring>,
    /// `connectors[i]` links `rings[i]` to `rings[i + 1]`.
    pub connectors: Vec<ConnectorSet>,
    pub center: CenterNode,
}

/// One concentric ring of arc segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub radius: f64,
    pub stroke_width: f64,
    pub opacity: f64,
    pub dash: DashProfile,
    pub segments: Vec<ArcSegment>,
}

/// Arc drawn clockwise from `start` over `sweep`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcSegment {
    pub start: f64,
    pub sweep: f64,
}

/// Radial connectors between two adjacent rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSet {
    /// Index of the outer ring of the pair.
    pub outer_ring: usize,
    pub spokes: Vec<Connector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub angle: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
}

/// Filled center node plus an optional unfilled halo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CenterNode {
    pub radius: f64,
    pub opacity: f64,
    pub halo_radius: Option<f64>,
}

/// Stroke dash profile, a fixed lookup over `(negation, hypothetical)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashProfile {
    Solid,
    Negated,
    Hypothetical,
    NegatedHypothetical,
}

impl DashProfile {
    pub fn from_flags(negation: bool, hypothetical: bool) -> Self {
        match (negation, hypothetical) {
            (true, true) => Self::NegatedHypothetical,
            (true, false) => Self::Negated,
            (false, true) => Self::Hypothetical,
            (false, false) => Self::Solid,
        }
    }

    /// SVG `stroke-dasharray` value, `None` for solid strokes.
    pub fn dasharray(self) -> Option<&'static str> {
        match self {
            Self::Solid => None,
            Self::Negated => Some("4 6"),
            Self::Hypothetical => Some("1.5 2.5"),
            Self::NegatedHypothetical => Some("6 2 1 2"),
        }
    }
}

impl Geometry {
    pub fn segment_count(&self) -> usize {
        self.rings.iter().map(|ring| ring.segments.len()).sum()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.iter().map(|set| set.spokes.len()).sum()
    }
}
