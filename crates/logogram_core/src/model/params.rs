//! Semantic parameter vector.
//!
//! # Responsibility
//! - Enumerate every recognized generation option with bounds and defaults.
//! - Validate caller input once, before it reaches the generator.
//!
//! # Invariants
//! - Scalar fields are finite and within `[0.0, 1.0]` after `validate()`.
//! - Unknown fields are rejected at deserialization time.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Obligation vs. possibility axis. Biases the angular sweep of every ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// "may", "might": sweeps start early.
    Possibility,
    #[default]
    Neutral,
    /// "must", "shall": sweeps start late.
    Obligation,
}

/// Global rotation selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    #[default]
    Neutral,
    Positive,
    Negative,
}

/// Bounded inputs that bias geometry generation.
///
/// Only `validate()`-clean vectors should be handed to the generator; the
/// generator itself treats out-of-range values by clamping, never by failing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterVector {
    /// Confidence of the statement. Thickens strokes.
    pub certainty: f64,
    pub modality: Modality,
    /// Degree of non-linear time. Adds rings and irregular spans.
    pub temporality: f64,
    /// Strength of the acting subject. Raises opacity and center size.
    pub agency: f64,
    pub perspective: Perspective,
    pub negation: bool,
    pub hypothetical: bool,
    /// Stress. Thickens strokes together with `certainty`.
    pub emphasis: f64,
}

impl Default for ParameterVector {
    fn default() -> Self {
        Self {
            certainty: 0.5,
            modality: Modality::Neutral,
            temporality: 0.3,
            agency: 0.5,
            perspective: Perspective::Neutral,
            negation: false,
            hypothetical: false,
            emphasis: 0.3,
        }
    }
}

/// Rejected parameter field with the offending value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValidationError {
    NotFinite { field: &'static str },
    OutOfRange { field: &'static str, value: f64 },
}

impl Display for ParameterValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFinite { field } => write!(f, "parameter `{field}` must be a finite number"),
            Self::OutOfRange { field, value } => {
                write!(f, "parameter `{field}` must be within [0, 1], got {value}")
            }
        }
    }
}

impl Error for ParameterValidationError {}

impl ParameterVector {
    /// Checks every scalar field against its bounds.
    ///
    /// # Errors
    /// - `NotFinite` for NaN or infinite values.
    /// - `OutOfRange` for values outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ParameterValidationError> {
        for (field, value) in self.scalars() {
            if !value.is_finite() {
                return Err(ParameterValidationError::NotFinite { field });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(ParameterValidationError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    /// Returns a copy with every scalar clamped into `[0, 1]`; NaN maps to 0.
    pub fn clamped(&self) -> Self {
        Self {
            certainty: unit(self.certainty),
            temporality: unit(self.temporality),
            agency: unit(self.agency),
            emphasis: unit(self.emphasis),
            ..*self
        }
    }

    fn scalars(&self) -> [(&'static str, f64); 4] {
        [
            ("certainty", self.certainty),
            ("temporality", self.temporality),
            ("agency", self.agency),
            ("emphasis", self.emphasis),
        ]
    }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
