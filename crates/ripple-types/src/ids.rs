//! Type-safe identifier wrappers.
//!
//! Runs are identified by UUID v7 (time-ordered) so run reports sort by
//! start time. Personas and communities use readable string keys
//! (`persona-17`, `north-india`) because the same labels are shown to
//! users and reported against by downstream consumers.

use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around [`String`] for readable keys.
///
/// Keys implement `Borrow<str>` so ordered sets and maps keyed by them can
/// be queried with plain string slices.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one simulation run (start to stop).
    RunId
}

define_key! {
    /// Unique identifier for a persona. Graph nodes reuse the persona id.
    PersonaId
}

define_key! {
    /// Identifier of a community (for example `north-india`).
    CommunityId
}

impl PersonaId {
    /// The canonical id for the persona generated at `index`.
    pub fn for_index(index: usize) -> Self {
        Self(format!("persona-{index}"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn run_ids_are_unique() {
        let a = RunId::new();
        let b = RunId::new();
        assert_ne!(a, b);
        assert_ne!(a.into_inner(), Uuid::nil());
    }

    #[test]
    fn persona_id_for_index() {
        assert_eq!(PersonaId::for_index(42).as_str(), "persona-42");
    }

    #[test]
    fn key_serializes_as_plain_string() {
        let id = CommunityId::new("north-india");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"north-india\""));
    }

    #[test]
    fn keyed_sets_accept_str_lookups() {
        let mut set = BTreeSet::new();
        set.insert(PersonaId::from("persona-1"));
        assert!(set.contains("persona-1"));
        assert!(!set.contains("persona-2"));
    }
}
