//! Enumeration types shared between the engine, the data layer and clients.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle state of a walker.
///
/// The only legal transition is `Walking -> Done`. A finished walker is kept
/// in place as a record of the traversal and is never selected again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WalkerStatus {
    /// The walker still has path left to cover.
    Walking,
    /// The walker reached its destination or had no usable path.
    Done,
}

impl WalkerStatus {
    /// The value stored in the `walkers.status` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Done => "done",
        }
    }

    /// Whether this status is terminal.
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl core::fmt::Display for WalkerStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a [`crate::WalkEvent`], used to build notification subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WalkEventKind {
    /// The walker moved forward and is still walking.
    Step,
    /// The walker reached the last point of its path.
    Arrived,
    /// The walker was retired because its path was empty or unreadable.
    Abandoned,
}

impl WalkEventKind {
    /// Lowercase name used in subjects and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Arrived => "arrived",
            Self::Abandoned => "abandoned",
        }
    }
}
