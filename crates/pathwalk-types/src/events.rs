//! Notifications emitted by the engine after a walker commit succeeds.
//!
//! These are consumed by presentation code (footstep cues, arrival UI) and
//! are fire-and-forget: the engine never waits on, or reacts to, their
//! delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::WalkEventKind;
use crate::ids::{OwnerId, WalkerId};
use crate::structs::GridPoint;

/// Something that happened to a walker during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum WalkEvent {
    /// The owner moved forward along the path and keeps walking.
    Step {
        /// The walker that advanced.
        walker_id: WalkerId,
        /// The player that moved.
        owner_id: OwnerId,
        /// New path index.
        index: u32,
        /// Number of path points consumed this tick.
        steps: u32,
        /// The owner's new position.
        #[ts(as = "(i32, i32)")]
        position: GridPoint,
        /// Commit time.
        at: DateTime<Utc>,
    },
    /// The owner reached the final point of the path.
    Arrived {
        /// The walker that finished.
        walker_id: WalkerId,
        /// The player that arrived.
        owner_id: OwnerId,
        /// Final path index (`len - 1`).
        index: u32,
        /// The destination.
        #[ts(as = "(i32, i32)")]
        position: GridPoint,
        /// Commit time.
        at: DateTime<Utc>,
    },
    /// The walker was retired without moving its owner.
    Abandoned {
        /// The walker that was retired.
        walker_id: WalkerId,
        /// The player that stays where it is.
        owner_id: OwnerId,
        /// Commit time.
        at: DateTime<Utc>,
    },
}

impl WalkEvent {
    /// The kind of this event.
    pub const fn kind(&self) -> WalkEventKind {
        match self {
            Self::Step { .. } => WalkEventKind::Step,
            Self::Arrived { .. } => WalkEventKind::Arrived,
            Self::Abandoned { .. } => WalkEventKind::Abandoned,
        }
    }

    /// The walker this event is about.
    pub const fn walker_id(&self) -> WalkerId {
        match self {
            Self::Step { walker_id, .. }
            | Self::Arrived { walker_id, .. }
            | Self::Abandoned { walker_id, .. } => *walker_id,
        }
    }

    /// The owner this event is about.
    pub const fn owner_id(&self) -> OwnerId {
        match self {
            Self::Step { owner_id, .. }
            | Self::Arrived { owner_id, .. }
            | Self::Abandoned { owner_id, .. } => *owner_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn step_event_json_shape() {
        let event = WalkEvent::Step {
            walker_id: WalkerId::new(1),
            owner_id: OwnerId::new(2),
            index: 3,
            steps: 1,
            position: GridPoint::new(4, 5),
            at: DateTime::from_timestamp(0, 0).unwrap(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "step");
        assert_eq!(value["walker_id"], 1);
        assert_eq!(value["position"], serde_json::json!([4, 5]));
        assert_eq!(event.kind(), WalkEventKind::Step);
    }

    #[test]
    fn accessors_cover_every_variant() {
        let at = DateTime::from_timestamp(10, 0).unwrap();
        let abandoned = WalkEvent::Abandoned {
            walker_id: WalkerId::new(8),
            owner_id: OwnerId::new(9),
            at,
        };
        assert_eq!(abandoned.walker_id(), WalkerId::new(8));
        assert_eq!(abandoned.owner_id(), OwnerId::new(9));
        assert_eq!(abandoned.kind().as_str(), "abandoned");
    }
}
