//! Inclusive count ranges and half-open value ranges used by tunable
//! generation and activation parameters.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Inclusive integer range `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CountRange {
    /// Smallest value that may be drawn.
    pub min: u32,
    /// Largest value that may be drawn.
    pub max: u32,
}

impl CountRange {
    /// Create a range.
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Whether `min <= max`.
    pub const fn is_ordered(self) -> bool {
        self.min <= self.max
    }
}

impl core::fmt::Display for CountRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Half-open floating point range `min..max`.
///
/// A range with `min == max` is degenerate and always yields `min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ValueRange {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (exclusive unless equal to `min`).
    pub max: f64,
}

impl ValueRange {
    /// Create a range.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether both bounds are finite and `min <= max`.
    pub fn is_ordered(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Whether `min == max`, within floating point tolerance.
    pub fn is_degenerate(&self) -> bool {
        (self.max - self.min).abs() < f64::EPSILON
    }
}
