//! Error types for the `ripple-network` crate.
//!
//! All fallible operations in this crate return [`NetworkError`]. Empty
//! persona sets and filters that match nothing are not errors; they yield
//! empty graphs.

use ripple_types::CommunityId;

/// Errors raised while validating network configuration.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Static configuration is invalid (zero communities, bad sizes,
    /// malformed link policy).
    #[error("invalid network configuration: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// The same community id was declared twice.
    #[error("duplicate community id: {0}")]
    DuplicateCommunity(CommunityId),

    /// A filter or toggle named a community that is not configured.
    #[error("unknown community: {0}")]
    UnknownCommunity(CommunityId),
}

impl NetworkError {
    /// Shorthand for a [`NetworkError::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
