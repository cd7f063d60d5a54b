//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Snapshot records and simulated identities each get a strongly-typed ID
//! to prevent accidental mixing of identifiers at compile time. All IDs use
//! UUID v7 (time-ordered) so that records sort by creation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
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

define_id! {
    /// Unique identifier for a snapshot record in the history log.
    RecordId
}

define_id! {
    /// Unique identifier for a simulated client identity.
    IdentityId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let record = RecordId::new();
        let identity = IdentityId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(record.into_inner(), Uuid::nil());
        assert_ne!(identity.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = RecordId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<RecordId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = IdentityId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }

    #[test]
    fn record_ids_are_time_ordered() {
        let first = RecordId::new();
        let second = RecordId::new();
        // UUID v7 sorts by creation time.
        assert!(first <= second);
    }
}
