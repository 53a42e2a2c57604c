//! Shared type definitions for the Pathwalk walker engine.
//!
//! Everything that crosses a crate boundary lives here: row identifiers,
//! walker status, the selected-walker row, and the [`WalkEvent`]
//! notifications. Event and status types are exported to `TypeScript` via
//! `ts-rs` for the client that plays footstep and arrival cues.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for walker and owner keys
//! - [`enums`] -- Walker status and event kinds
//! - [`structs`] -- Grid points and persistence rows
//! - [`events`] -- Notifications emitted after a commit

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

pub use enums::{WalkEventKind, WalkerStatus};
pub use events::WalkEvent;
pub use ids::{OwnerId, WalkerId};
pub use structs::{ActiveWalker, GridPoint, OwnerPosition};
