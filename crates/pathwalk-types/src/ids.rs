//! Type-safe identifier wrappers around the database's `BIGINT` keys.
//!
//! Walkers and their owners live in different tables but share the same
//! integer key space, so each gets its own newtype to keep a `walker_id`
//! from ever being bound where a `user_id` is expected.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around an `i64` row key with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw row key.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner row key.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a walker (one traversal of one path).
    WalkerId
}

define_id! {
    /// Identifier of the player whose position a walker drives.
    ///
    /// Maps to `players.user_id`.
    OwnerId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_display_is_raw_key() {
        assert_eq!(WalkerId::new(17).to_string(), "17");
        assert_eq!(OwnerId::from(4).into_inner(), 4);
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&WalkerId::new(99));
        assert_eq!(json.ok().as_deref(), Some("99"));
    }
}
