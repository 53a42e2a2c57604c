//! The advancement engine: one pass over every active walker.
//!
//! ```text
//! active_walkers()
//!     |
//!     +-- per walker (bounded concurrency, selection order kept)
//!           decide() -> to_commit() -> store.commit()
//!               |-- Ok   -> log, notify, report outcome
//!               +-- Err  -> log, report failure, move on
//! ```
//!
//! Only a failed selection aborts the pass. A failed commit is isolated to
//! its walker, which stays at its previous index and is picked up again by
//! the next pass.

use chrono::{DateTime, Utc};
use futures::StreamExt as _;
use pathwalk_types::{ActiveWalker, WalkEvent};
use tracing::{error, info, warn};

use crate::advance::{self, Advance};
use crate::notify::WalkNotifier;
use crate::report::{PassReport, WalkerOutcome, WalkerReport};
use crate::store::{StoreError, WalkerStore};

/// Errors that abort a whole pass.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    /// The batch of active walkers could not be read.
    #[error("failed to select active walkers: {source}")]
    Selection {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}

/// Advances walkers along their paths and commits the result.
pub struct AdvancementEngine<S, N> {
    store: S,
    notifier: N,
    max_concurrency: usize,
}

impl<S, N> AdvancementEngine<S, N>
where
    S: WalkerStore,
    N: WalkNotifier,
{
    /// Create an engine that processes walkers one at a time.
    pub const fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            max_concurrency: 1,
        }
    }

    /// Allow up to `max` walkers to be committed concurrently.
    ///
    /// Zero is treated as one.
    #[must_use]
    pub const fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = if max == 0 { 1 } else { max };
        self
    }

    /// Run one pass stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`PassError::Selection`] if the active walkers cannot be read.
    pub async fn run_pass(&self) -> Result<PassReport, PassError> {
        self.run_pass_at(Utc::now()).await
    }

    /// Run one pass, stamping every write with `now`.
    ///
    /// # Errors
    ///
    /// Returns [`PassError::Selection`] if the active walkers cannot be read.
    pub async fn run_pass_at(&self, now: DateTime<Utc>) -> Result<PassReport, PassError> {
        let walkers = self.store.active_walkers().await?;
        if walkers.is_empty() {
            return Ok(PassReport::new(now, Vec::new()));
        }

        let reports: Vec<WalkerReport> = futures::stream::iter(walkers.iter())
            .map(|walker| self.advance_walker(walker, now))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        Ok(PassReport::new(now, reports))
    }

    /// Decide and commit a single walker.
    ///
    /// Never fails: a commit error is returned as
    /// [`WalkerOutcome::Failed`].
    pub async fn advance_walker(&self, walker: &ActiveWalker, now: DateTime<Utc>) -> WalkerReport {
        let decision = advance::decide(&walker.path, walker.current_index, walker.speed_multiplier);
        let commit = decision.to_commit(walker, now);

        let outcome = match self.store.commit(&commit).await {
            Ok(()) => self.committed(walker, decision, now),
            Err(error) => {
                if error.is_conflict() {
                    warn!(
                        walker_id = %walker.walker_id,
                        owner_id = %walker.owner_id,
                        error = %error,
                        "Walker changed since selection, skipped"
                    );
                } else {
                    error!(
                        walker_id = %walker.walker_id,
                        owner_id = %walker.owner_id,
                        terminal = decision.is_terminal(),
                        error = %error,
                        "Failed to commit walker"
                    );
                }
                WalkerOutcome::Failed { error }
            }
        };

        WalkerReport {
            walker_id: walker.walker_id,
            owner_id: walker.owner_id,
            outcome,
        }
    }

    fn committed(
        &self,
        walker: &ActiveWalker,
        decision: Advance,
        now: DateTime<Utc>,
    ) -> WalkerOutcome {
        let walker_id = walker.walker_id;
        let owner_id = walker.owner_id;

        match decision {
            Advance::Abandon => {
                info!(%walker_id, %owner_id, "Walker had no positions, marked finished");
                self.notifier.notify(&WalkEvent::Abandoned {
                    walker_id,
                    owner_id,
                    at: now,
                });
                WalkerOutcome::Abandoned
            }
            Advance::Step {
                index,
                steps,
                position,
            } => {
                info!(
                    %walker_id,
                    %owner_id,
                    index,
                    steps,
                    speed = %walker.speed_multiplier,
                    x = position.x,
                    y = position.y,
                    "Walker advanced"
                );
                self.notifier.notify(&WalkEvent::Step {
                    walker_id,
                    owner_id,
                    index,
                    steps,
                    position,
                    at: now,
                });
                WalkerOutcome::Advanced {
                    index,
                    steps,
                    position,
                }
            }
            Advance::Arrive {
                index, position, ..
            } => {
                info!(
                    %walker_id,
                    %owner_id,
                    index,
                    x = position.x,
                    y = position.y,
                    "Walker completed and marked finished"
                );
                self.notifier.notify(&WalkEvent::Arrived {
                    walker_id,
                    owner_id,
                    index,
                    position,
                    at: now,
                });
                WalkerOutcome::Arrived { index, position }
            }
        }
    }
}
