//! Row-level structs exchanged between the engine and the persistence layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{OwnerId, WalkerId};

/// A point on the world grid.
///
/// Paths are stored as JSON arrays of `[x, y]` pairs, so this type
/// serializes as a two-element array rather than an object. Types that
/// export it to `TypeScript` declare it as `[number, number]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct GridPoint {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl GridPoint {
    /// Create a new grid point.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for GridPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<GridPoint> for (i32, i32) {
    fn from(point: GridPoint) -> Self {
        (point.x, point.y)
    }
}

impl core::fmt::Display for GridPoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// A walker selected for the current tick, joined with its owner's speed.
///
/// `path` is kept as raw JSON: decoding it is part of the per-walker
/// decision, and an undecodable path is a valid input (the walker is
/// retired) rather than a selection failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveWalker {
    /// The walker row key.
    pub walker_id: WalkerId,
    /// The player this walker moves.
    pub owner_id: OwnerId,
    /// The raw `positions` column.
    pub path: serde_json::Value,
    /// Index of the point the owner currently stands on.
    pub current_index: u32,
    /// The owner's speed multiplier (`players.speed_multiplier`).
    pub speed_multiplier: Decimal,
}

/// A write of the owner's world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerPosition {
    /// The point the owner now stands on.
    pub position: GridPoint,
    /// Value for `players.last_active`.
    pub last_active: DateTime<Utc>,
}
