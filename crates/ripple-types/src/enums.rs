//! Enumeration types for the persona network and activation simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Persona presentation
// ---------------------------------------------------------------------------

/// Glyph used by the renderer to draw a persona node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Shape {
    /// Round node.
    Circle,
    /// Square node.
    Square,
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Role a link plays in the connectivity guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LinkKind {
    /// Edge of an intra-community spanning tree. Required for connectivity.
    Structural,
    /// Ring, density, or cross-community edge. Not part of the
    /// intra-community connectivity proof.
    Auxiliary,
}

/// Stroke style hint for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LinkStyle {
    /// Continuous line.
    Solid,
    /// Dashed line, used mostly for cross-community edges.
    Dashed,
}

// ---------------------------------------------------------------------------
// Activation
// ---------------------------------------------------------------------------

/// Propagation phase, derived from the fraction of active nodes.
///
/// | Phase      | Activation fraction |
/// |------------|---------------------|
/// | `Seed`     | below 10%           |
/// | `Spread`   | 10% to below 50%    |
/// | `Saturate` | 50% and above       |
///
/// The thresholds are configurable on the simulator; the table shows the
/// defaults.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// A handful of random nodes are activated each step.
    #[default]
    Seed,
    /// Activation travels along links, plus a little random churn.
    Spread,
    /// Every inactive node activates independently.
    Saturate,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            Self::Seed => "seed",
            Self::Spread => "spread",
            Self::Saturate => "saturate",
        };
        f.write_str(label)
    }
}
