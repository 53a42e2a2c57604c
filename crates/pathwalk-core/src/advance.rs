//! The per-walker advancement decision.
//!
//! Everything in this module is pure: given a walker's raw path, its current
//! index and its owner's speed multiplier, [`decide`] says what the walker
//! should do this tick. Turning that into writes happens in
//! [`Advance::to_commit`]; applying the writes is the store's job.
//!
//! # Speed quantization
//!
//! ```text
//! steps = max(1, round_half_away_from_zero(speed_multiplier))
//!
//!   0.2 -> 1    1.4 -> 1    1.5 -> 2    2.5 -> 3
//! ```
//!
//! There is no fractional carry between ticks, and an overshoot of the last
//! point is clamped rather than spread across another tick.

use chrono::{DateTime, Utc};
use pathwalk_types::{ActiveWalker, GridPoint, OwnerPosition, WalkerStatus};
use rust_decimal::prelude::ToPrimitive as _;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize as _;

use crate::store::{WalkerCommit, WalkerUpdate};

/// The fewest path points a walker consumes in one tick.
pub const MIN_STEPS_PER_TICK: u32 = 1;

/// Quantize a speed multiplier into a whole number of path steps.
///
/// Rounds half away from zero, so `x.5` always rounds up for the positive
/// multipliers players carry. Anything that rounds below one (including
/// zero and negative values) still yields [`MIN_STEPS_PER_TICK`].
pub fn steps_per_tick(speed_multiplier: Decimal) -> u32 {
    let rounded =
        speed_multiplier.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    if rounded > Decimal::from(u32::MAX) {
        return u32::MAX;
    }
    rounded
        .to_u32()
        .unwrap_or(MIN_STEPS_PER_TICK)
        .max(MIN_STEPS_PER_TICK)
}

/// A decoded, non-empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkPath {
    points: Vec<GridPoint>,
    destination: GridPoint,
}

impl WalkPath {
    /// Decode a path from its stored JSON form.
    ///
    /// Accepts an array of `[x, y]` integer pairs, or a JSON string holding
    /// such an array (paths written into text columns). Returns `None` for
    /// anything else, including an empty array.
    pub fn decode(raw: &serde_json::Value) -> Option<Self> {
        let points = match raw {
            serde_json::Value::String(text) => serde_json::from_str::<Vec<GridPoint>>(text).ok()?,
            other => Vec::<GridPoint>::deserialize(other).ok()?,
        };
        Self::from_points(points)
    }

    /// Build a path from points, rejecting an empty list.
    pub fn from_points(points: Vec<GridPoint>) -> Option<Self> {
        let destination = *points.last()?;
        u32::try_from(points.len()).ok()?;
        Some(Self {
            points,
            destination,
        })
    }

    /// Number of points on the path. Never zero.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Index of the final point.
    pub fn last_index(&self) -> u32 {
        u32::try_from(self.points.len().saturating_sub(1)).unwrap_or(u32::MAX)
    }

    /// The point at `index`, or `None` past the end of the path.
    pub fn point(&self, index: u32) -> Option<GridPoint> {
        let index = usize::try_from(index).ok()?;
        self.points.get(index).copied()
    }

    /// The final point.
    pub const fn destination(&self) -> GridPoint {
        self.destination
    }
}

/// What a walker does this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The path is empty or unreadable: retire the walker where it stands.
    Abandon,
    /// Move to `index` and keep walking.
    Step {
        /// The new path index.
        index: u32,
        /// Path points consumed.
        steps: u32,
        /// The point at `index`.
        position: GridPoint,
    },
    /// Reached or overshot the end: move to the final point and finish.
    Arrive {
        /// The final path index.
        index: u32,
        /// Path points the speed allowed (may exceed what was left).
        steps: u32,
        /// The destination.
        position: GridPoint,
    },
}

/// Decide how a walker advances this tick.
pub fn decide(path: &serde_json::Value, current_index: u32, speed_multiplier: Decimal) -> Advance {
    let Some(path) = WalkPath::decode(path) else {
        return Advance::Abandon;
    };
    let steps = steps_per_tick(speed_multiplier);
    let next_index = current_index.saturating_add(steps);

    match path.point(next_index) {
        Some(position) => Advance::Step {
            index: next_index,
            steps,
            position,
        },
        None => Advance::Arrive {
            index: path.last_index(),
            steps,
            position: path.destination(),
        },
    }
}

impl Advance {
    /// Whether this decision retires the walker.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Abandon | Self::Arrive { .. })
    }

    /// The writes that carry out this decision for `walker` at time `now`.
    pub const fn to_commit(&self, walker: &ActiveWalker, now: DateTime<Utc>) -> WalkerCommit {
        let (owner_position, walker_update) = match *self {
            Self::Abandon => (
                None,
                WalkerUpdate {
                    current_index: 0,
                    status: WalkerStatus::Done,
                    updated_at: now,
                    finished_at: Some(now),
                },
            ),
            Self::Step {
                index, position, ..
            } => (
                Some(OwnerPosition {
                    position,
                    last_active: now,
                }),
                WalkerUpdate {
                    current_index: index,
                    status: WalkerStatus::Walking,
                    updated_at: now,
                    finished_at: None,
                },
            ),
            Self::Arrive {
                index, position, ..
            } => (
                Some(OwnerPosition {
                    position,
                    last_active: now,
                }),
                WalkerUpdate {
                    current_index: index,
                    status: WalkerStatus::Done,
                    updated_at: now,
                    finished_at: Some(now),
                },
            ),
        };

        WalkerCommit {
            walker_id: walker.walker_id,
            owner_id: walker.owner_id,
            expected_index: walker.current_index,
            owner_position,
            walker: walker_update,
        }
    }
}
