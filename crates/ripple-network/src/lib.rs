//! Persona generation and connected graph construction for Ripple.
//!
//! # Modules
//!
//! - [`persona`] -- Round-robin persona generation and community defaults
//! - [`template`] -- Built-in persona attribute templates
//! - [`graph`] -- Link policy, palette, and the connected graph builder
//! - [`components`] -- Union-find connectivity summary
//! - [`adjacency`] -- Id-keyed neighbour lookup
//! - [`session`] -- Live network owning personas, filter, and graph
//! - [`error`] -- Network error type

pub mod adjacency;
pub mod components;
pub mod error;
pub mod graph;
pub mod persona;
pub mod session;
pub mod template;

pub use adjacency::Adjacency;
pub use components::{ComponentSummary, is_connected};
pub use error::NetworkError;
pub use graph::{CommunityPalette, FALLBACK_COLOR, GraphBuilder, LinkPolicy, LinkPreset};
pub use persona::{
    DEFAULT_PERSONA_COUNT, PATTERN_COUNT, PersonaStore, default_communities, validate_communities,
};
pub use session::{NetworkSession, NetworkSettings, validate_filter};
pub use template::default_template_pool;
