//! In-memory [`WalkerStore`] with fault injection.
//!
//! Mirrors the `PostgreSQL` store's semantics (inner join on owners,
//! conditional walker update, all-or-nothing commit) so the engine and the
//! driver can be exercised without a database. Writes are staged on copies
//! of the rows and only swapped in once every write of the commit has
//! succeeded.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pathwalk_types::{ActiveWalker, GridPoint, OwnerId, WalkerId, WalkerStatus};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::store::{StoreError, WalkerCommit, WalkerStore};

/// A player row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRecord {
    /// Current world position.
    pub position: GridPoint,
    /// Speed multiplier; `None` reads as `1`.
    pub speed_multiplier: Option<Decimal>,
    /// Last time the engine moved this owner.
    pub last_active: Option<DateTime<Utc>>,
}

impl OwnerRecord {
    /// An owner standing at `position` with the given multiplier.
    pub const fn at(position: GridPoint, speed_multiplier: Option<Decimal>) -> Self {
        Self {
            position,
            speed_multiplier,
            last_active: None,
        }
    }
}

/// A walker row.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkerRecord {
    /// The player this walker moves.
    pub owner_id: OwnerId,
    /// Raw `positions` value.
    pub path: serde_json::Value,
    /// Cursor into the path.
    pub current_index: u32,
    /// Lifecycle state.
    pub status: WalkerStatus,
    /// Last engine update.
    pub updated_at: Option<DateTime<Utc>>,
    /// When the walker was retired.
    pub finished_at: Option<DateTime<Utc>>,
}

impl WalkerRecord {
    /// A freshly planned walker at index 0.
    pub const fn walking(owner_id: OwnerId, path: serde_json::Value) -> Self {
        Self {
            owner_id,
            path,
            current_index: 0,
            status: WalkerStatus::Walking,
            updated_at: None,
            finished_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    owners: BTreeMap<OwnerId, OwnerRecord>,
    walkers: BTreeMap<WalkerId, WalkerRecord>,
    next_walker_id: i64,
    selection_down: bool,
    failing_commits: BTreeSet<WalkerId>,
    commits: u64,
}

/// Shared handle to an in-memory walker store.
///
/// Cloning is cheap; all clones see the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryWalkerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWalkerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an owner.
    pub async fn insert_owner(&self, owner_id: OwnerId, owner: OwnerRecord) {
        self.state.lock().await.owners.insert(owner_id, owner);
    }

    /// Insert a walker, assigning the next free id.
    pub async fn insert_walker(&self, walker: WalkerRecord) -> WalkerId {
        let mut state = self.state.lock().await;
        state.next_walker_id = state.next_walker_id.saturating_add(1);
        let walker_id = WalkerId::new(state.next_walker_id);
        state.walkers.insert(walker_id, walker);
        walker_id
    }

    /// Current state of an owner.
    pub async fn owner(&self, owner_id: OwnerId) -> Option<OwnerRecord> {
        self.state.lock().await.owners.get(&owner_id).cloned()
    }

    /// Current state of a walker.
    pub async fn walker(&self, walker_id: WalkerId) -> Option<WalkerRecord> {
        self.state.lock().await.walkers.get(&walker_id).cloned()
    }

    /// Overwrite a walker's index and status, as a concurrent writer would.
    pub async fn force_walker_state(
        &self,
        walker_id: WalkerId,
        current_index: u32,
        status: WalkerStatus,
    ) {
        if let Some(walker) = self.state.lock().await.walkers.get_mut(&walker_id) {
            walker.current_index = current_index;
            walker.status = status;
        }
    }

    /// Make selection fail until cleared.
    pub async fn set_selection_down(&self, down: bool) {
        self.state.lock().await.selection_down = down;
    }

    /// Make every commit for `walker_id` fail after the owner write has
    /// been staged and before the walker write.
    pub async fn fail_commits_for(&self, walker_id: WalkerId) {
        self.state.lock().await.failing_commits.insert(walker_id);
    }

    /// Remove all injected faults.
    pub async fn clear_faults(&self) {
        let mut state = self.state.lock().await;
        state.selection_down = false;
        state.failing_commits.clear();
    }

    /// Number of commits that were applied.
    pub async fn applied_commits(&self) -> u64 {
        self.state.lock().await.commits
    }
}

impl WalkerStore for MemoryWalkerStore {
    async fn active_walkers(&self) -> Result<Vec<ActiveWalker>, StoreError> {
        let state = self.state.lock().await;
        if state.selection_down {
            return Err(StoreError::Unavailable {
                message: String::from("memory store marked unavailable"),
            });
        }

        let walkers = state
            .walkers
            .iter()
            .filter(|(_, walker)| walker.status == WalkerStatus::Walking)
            .filter_map(|(walker_id, walker)| {
                let owner = state.owners.get(&walker.owner_id)?;
                Some(ActiveWalker {
                    walker_id: *walker_id,
                    owner_id: walker.owner_id,
                    path: walker.path.clone(),
                    current_index: walker.current_index,
                    speed_multiplier: owner.speed_multiplier.unwrap_or(Decimal::ONE),
                })
            })
            .collect();

        Ok(walkers)
    }

    async fn commit(&self, commit: &WalkerCommit) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        let Some(mut walker) = state.walkers.get(&commit.walker_id).cloned() else {
            return Err(StoreError::Commit {
                message: format!("walker {} does not exist", commit.walker_id),
            });
        };
        if walker.status != WalkerStatus::Walking || walker.current_index != commit.expected_index {
            return Err(StoreError::Conflict {
                walker_id: commit.walker_id,
                expected_index: commit.expected_index,
            });
        }

        let staged_owner = match commit.owner_position {
            Some(write) => {
                let mut owner = state.owners.get(&commit.owner_id).cloned().ok_or_else(|| {
                    StoreError::Commit {
                        message: format!("owner {} does not exist", commit.owner_id),
                    }
                })?;
                owner.position = write.position;
                owner.last_active = Some(write.last_active);
                Some(owner)
            }
            None => None,
        };

        if state.failing_commits.contains(&commit.walker_id) {
            return Err(StoreError::Commit {
                message: format!("injected failure for walker {}", commit.walker_id),
            });
        }

        walker.current_index = commit.walker.current_index;
        walker.status = commit.walker.status;
        walker.updated_at = Some(commit.walker.updated_at);
        if commit.walker.finished_at.is_some() {
            walker.finished_at = commit.walker.finished_at;
        }

        if let Some(owner) = staged_owner {
            state.owners.insert(commit.owner_id, owner);
        }
        state.walkers.insert(commit.walker_id, walker);
        state.commits = state.commits.saturating_add(1);
        Ok(())
    }
}
