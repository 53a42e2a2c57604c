//! Per-walker results and the per-pass report built from them.

use chrono::{DateTime, Utc};
use pathwalk_types::{GridPoint, OwnerId, WalkerId};
use tracing::info;

use crate::store::StoreError;

/// What happened to one walker during a pass.
#[derive(Debug)]
pub enum WalkerOutcome {
    /// Moved forward and is still walking.
    Advanced {
        /// New path index.
        index: u32,
        /// Path points consumed.
        steps: u32,
        /// Owner's new position.
        position: GridPoint,
    },
    /// Reached the final point and was marked done.
    Arrived {
        /// Final path index.
        index: u32,
        /// The destination.
        position: GridPoint,
    },
    /// Had no usable path and was marked done without moving its owner.
    Abandoned,
    /// The commit failed; the walker is unchanged and will be retried on
    /// the next pass.
    Failed {
        /// Why the commit failed.
        error: StoreError,
    },
}

impl WalkerOutcome {
    /// Whether the walker's writes were persisted.
    pub const fn is_committed(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Result for one walker.
#[derive(Debug)]
pub struct WalkerReport {
    /// The walker processed.
    pub walker_id: WalkerId,
    /// Its owner.
    pub owner_id: OwnerId,
    /// What happened.
    pub outcome: WalkerOutcome,
}

/// Result of one pass over the active walkers.
#[derive(Debug)]
pub struct PassReport {
    /// Timestamp written by every commit in this pass.
    pub started_at: DateTime<Utc>,
    /// One entry per selected walker, in selection order.
    pub walkers: Vec<WalkerReport>,
}

impl PassReport {
    /// Build a report from per-walker results.
    pub const fn new(started_at: DateTime<Utc>, walkers: Vec<WalkerReport>) -> Self {
        Self {
            started_at,
            walkers,
        }
    }

    /// Whether the pass found no active walkers.
    pub fn is_empty(&self) -> bool {
        self.walkers.is_empty()
    }

    /// Number of walkers selected.
    pub fn processed(&self) -> usize {
        self.walkers.len()
    }

    /// Walkers that stepped and are still walking.
    pub fn advanced(&self) -> usize {
        self.count(|o| matches!(o, WalkerOutcome::Advanced { .. }))
    }

    /// Walkers that reached their destination.
    pub fn arrived(&self) -> usize {
        self.count(|o| matches!(o, WalkerOutcome::Arrived { .. }))
    }

    /// Walkers retired for lack of a path.
    pub fn abandoned(&self) -> usize {
        self.count(|o| matches!(o, WalkerOutcome::Abandoned))
    }

    /// Walkers whose commit failed.
    pub fn failed(&self) -> usize {
        self.count(|o| !o.is_committed())
    }

    /// Look up the result for a walker.
    pub fn get(&self, walker_id: WalkerId) -> Option<&WalkerReport> {
        self.walkers.iter().find(|r| r.walker_id == walker_id)
    }

    fn count(&self, pred: impl Fn(&WalkerOutcome) -> bool) -> usize {
        self.walkers.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Log a one-line summary of the pass.
    pub fn log_summary(&self) {
        if self.is_empty() {
            info!("No active walkers");
            return;
        }
        info!(
            processed = self.processed(),
            advanced = self.advanced(),
            arrived = self.arrived(),
            abandoned = self.abandoned(),
            failed = self.failed(),
            "Pass complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(walker: i64, outcome: WalkerOutcome) -> WalkerReport {
        WalkerReport {
            walker_id: WalkerId::new(walker),
            owner_id: OwnerId::new(walker),
            outcome,
        }
    }

    #[test]
    fn counts_by_outcome() {
        let pass = PassReport::new(
            Utc::now(),
            vec![
                report(
                    1,
                    WalkerOutcome::Advanced {
                        index: 1,
                        steps: 1,
                        position: GridPoint::new(1, 0),
                    },
                ),
                report(
                    2,
                    WalkerOutcome::Arrived {
                        index: 4,
                        position: GridPoint::new(4, 4),
                    },
                ),
                report(3, WalkerOutcome::Abandoned),
                report(
                    4,
                    WalkerOutcome::Failed {
                        error: StoreError::Commit {
                            message: String::from("boom"),
                        },
                    },
                ),
            ],
        );

        assert_eq!(pass.processed(), 4);
        assert_eq!(pass.advanced(), 1);
        assert_eq!(pass.arrived(), 1);
        assert_eq!(pass.abandoned(), 1);
        assert_eq!(pass.failed(), 1);
        assert!(pass.get(WalkerId::new(3)).is_some());
        assert!(pass.get(WalkerId::new(9)).is_none());
    }

    #[test]
    fn empty_pass() {
        let pass = PassReport::new(Utc::now(), Vec::new());
        assert!(pass.is_empty());
        assert_eq!(pass.failed(), 0);
    }
}
