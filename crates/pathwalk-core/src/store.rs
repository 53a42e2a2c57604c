//! The persistence seam between the engine and whatever holds walker rows.
//!
//! The engine needs exactly two things from storage: the batch of walkers to
//! process this tick, and a way to apply one walker's writes atomically.
//! [`WalkerStore`] captures both. The `PostgreSQL` implementation lives in
//! `pathwalk-db`; [`crate::memory::MemoryWalkerStore`] backs the tests.

use std::future::Future;

use chrono::{DateTime, Utc};
use pathwalk_types::{ActiveWalker, OwnerId, OwnerPosition, WalkerId, WalkerStatus};

/// Errors reported by a [`WalkerStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the query failed outright.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The walker was no longer `walking` at the expected index when the
    /// commit tried to apply. Nothing was written.
    #[error("walker {walker_id} changed before commit (expected index {expected_index})")]
    Conflict {
        /// The walker whose commit was rejected.
        walker_id: WalkerId,
        /// The index the decision was computed from.
        expected_index: u32,
    },

    /// The commit failed and was rolled back.
    #[error("commit failed: {message}")]
    Commit {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Whether this error is a concurrent-modification conflict.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// New walker-row state written by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerUpdate {
    /// Value for `current_index`.
    pub current_index: u32,
    /// Value for `status`.
    pub status: WalkerStatus,
    /// Value for `updated_at`.
    pub updated_at: DateTime<Utc>,
    /// Value for `finished_at`; `None` leaves the column untouched.
    pub finished_at: Option<DateTime<Utc>>,
}

/// All writes for one walker in one tick.
///
/// A store must apply `owner_position` (when present) and `walker` together
/// or not at all, and only if the walker is still `walking` at
/// `expected_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerCommit {
    /// The walker being updated.
    pub walker_id: WalkerId,
    /// The owner whose position may be written.
    pub owner_id: OwnerId,
    /// The index the walker had when it was selected.
    pub expected_index: u32,
    /// Owner position write, absent when the walker is abandoned.
    pub owner_position: Option<OwnerPosition>,
    /// Walker state write.
    pub walker: WalkerUpdate,
}

/// Storage for walkers and the positions they drive.
pub trait WalkerStore: Send + Sync {
    /// All walkers with `status = walking`, joined with their owner's speed
    /// multiplier. A missing multiplier is reported as `1`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the batch cannot be read.
    fn active_walkers(&self) -> impl Future<Output = Result<Vec<ActiveWalker>, StoreError>> + Send;

    /// Apply one walker's writes atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the walker moved on since
    /// selection, or [`StoreError::Commit`] if the transaction failed. In
    /// both cases nothing is persisted.
    fn commit(&self, commit: &WalkerCommit) -> impl Future<Output = Result<(), StoreError>> + Send;
}
