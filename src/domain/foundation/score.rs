//! Score value object for confidence and quality values.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;

/// A confidence or quality value between 0.0 and 1.0 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    /// Zero score.
    pub const ZERO: Self = Self(0.0);

    /// Full score.
    pub const ONE: Self = Self(1.0);

    /// Creates a Score, returning error if outside the unit interval.
    ///
    /// NaN is rejected.
    pub fn try_new(value: f64) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ValidationError::out_of_range("score", 0.0, 1.0, value));
        }
        Ok(Self(value))
    }

    /// Creates a Score, clamping to the unit interval.
    ///
    /// NaN clamps to zero.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the value as f64.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Checks whether the score is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    /// Multiplies this score by another.
    ///
    /// The product of two unit-interval values stays in the unit interval,
    /// so no clamping is required.
    pub fn weighted_by(&self, other: Score) -> Score {
        Self(self.0 * other.0)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}
