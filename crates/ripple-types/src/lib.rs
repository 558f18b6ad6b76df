//! Shared type definitions for the Ripple persona network.
//!
//! This crate is the single source of truth for the data model shared by
//! the network builder, the activation simulator, and the observer API.
//! Types flow downstream to `TypeScript` via `ts-rs` for the renderer.
//!
//! # Modules
//!
//! - [`ids`] -- Run UUIDs and readable persona/community keys
//! - [`enums`] -- Shapes, link kinds and styles, propagation phases
//! - [`structs`] -- Personas, communities, filters, graph, activation state
//! - [`ranges`] -- Count and value ranges for tunable parameters

pub mod enums;
pub mod ids;
pub mod ranges;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{LinkKind, LinkStyle, Phase, Shape};
pub use ids::{CommunityId, PersonaId, RunId};
pub use ranges::{CountRange, ValueRange};
pub use structs::{
    ALL_COMMUNITIES, ActivationState, CommunityDefinition, CommunityFilter, Graph, Link, Node,
    Persona, PersonaAttributes,
};
