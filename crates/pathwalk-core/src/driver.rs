//! Tick driver: a single pass, or passes on a fixed interval until shutdown.
//!
//! The driver holds no state across passes except running totals for the
//! shutdown summary. Every pass re-selects walkers, so walkers created or
//! retired between passes are picked up or dropped automatically.
//!
//! Shutdown is only observed between passes. A pass that is already running
//! always completes, and each walker inside it still commits atomically.

use std::future::Future;
use std::time::Duration;

use tracing::{error, info};

use crate::engine::{AdvancementEngine, PassError};
use crate::notify::WalkNotifier;
use crate::report::PassReport;
use crate::store::WalkerStore;

/// Delay between passes in continuous mode unless configured otherwise.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);

/// Running totals for a continuous run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    /// Passes attempted, including failed ones.
    pub passes: u64,
    /// Passes aborted by a selection failure.
    pub failed_passes: u64,
    /// Walkers that stepped and kept walking.
    pub advanced: u64,
    /// Walkers that reached their destination.
    pub arrived: u64,
    /// Walkers retired for lack of a path.
    pub abandoned: u64,
    /// Walker commits that failed.
    pub failed_walkers: u64,
}

impl DriverSummary {
    fn record(&mut self, report: &PassReport) {
        self.advanced = self.advanced.saturating_add(widen(report.advanced()));
        self.arrived = self.arrived.saturating_add(widen(report.arrived()));
        self.abandoned = self.abandoned.saturating_add(widen(report.abandoned()));
        self.failed_walkers = self.failed_walkers.saturating_add(widen(report.failed()));
    }

    /// Log the totals.
    pub fn log(&self) {
        info!(
            passes = self.passes,
            failed_passes = self.failed_passes,
            advanced = self.advanced,
            arrived = self.arrived,
            abandoned = self.abandoned,
            failed_walkers = self.failed_walkers,
            "Driver stopped"
        );
    }
}

fn widen(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// Runs the advancement engine once or on an interval.
pub struct TickDriver<S, N> {
    engine: AdvancementEngine<S, N>,
    interval: Duration,
}

impl<S, N> TickDriver<S, N>
where
    S: WalkerStore,
    N: WalkNotifier,
{
    /// Create a driver with the given inter-pass delay.
    pub const fn new(engine: AdvancementEngine<S, N>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Run exactly one pass and log its summary.
    ///
    /// # Errors
    ///
    /// Returns [`PassError`] if the pass could not select walkers. Walker
    /// commit failures are reported inside the [`PassReport`] instead.
    pub async fn run_once(&self) -> Result<PassReport, PassError> {
        match self.engine.run_pass().await {
            Ok(report) => {
                report.log_summary();
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Pass aborted");
                Err(e)
            }
        }
    }

    /// Run passes until `shutdown` resolves.
    ///
    /// A failed pass is logged and followed by the normal delay, so a
    /// database outage does not turn into a busy loop.
    pub async fn run_continuous<F>(&self, shutdown: F) -> DriverSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = DriverSummary::default();
        tokio::pin!(shutdown);

        info!(interval_ms = self.interval.as_millis(), "Continuous mode starting");

        loop {
            summary.passes = summary.passes.saturating_add(1);
            match self.run_once().await {
                Ok(report) => summary.record(&report),
                Err(_) => summary.failed_passes = summary.failed_passes.saturating_add(1),
            }

            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        summary.log();
        summary
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pathwalk_types::{GridPoint, OwnerId, WalkEvent, WalkerStatus};
    use serde_json::json;
    use tokio::sync::oneshot;

    use super::*;
    use crate::memory::{MemoryWalkerStore, OwnerRecord, WalkerRecord};
    use crate::notify::NoOpNotifier;

    /// Fires a oneshot on the first arrival.
    struct ArrivalSignal(Mutex<Option<oneshot::Sender<()>>>);

    impl WalkNotifier for ArrivalSignal {
        fn notify(&self, event: &WalkEvent) {
            if matches!(event, WalkEvent::Arrived { .. }) {
                if let Some(tx) = self.0.lock().unwrap().take() {
                    let _ = tx.send(());
                }
            }
        }
    }

    async fn store_with_walker(path: serde_json::Value) -> MemoryWalkerStore {
        let store = MemoryWalkerStore::new();
        store
            .insert_owner(OwnerId::new(1), OwnerRecord::at(GridPoint::new(0, 0), None))
            .await;
        let _ = store
            .insert_walker(WalkerRecord::walking(OwnerId::new(1), path))
            .await;
        store
    }

    #[tokio::test]
    async fn second_single_pass_finds_nothing() {
        let store = store_with_walker(json!([[0, 0], [1, 0]])).await;
        let driver = TickDriver::new(
            AdvancementEngine::new(store, NoOpNotifier),
            DEFAULT_TICK_INTERVAL,
        );

        let first = driver.run_once().await.unwrap();
        assert_eq!(first.processed(), 1);
        // The first pass lands on the last point; the second finalizes it.
        let second = driver.run_once().await.unwrap();
        assert_eq!(second.arrived(), 1);
        let third = driver.run_once().await.unwrap();
        assert!(third.is_empty());
        let fourth = driver.run_once().await.unwrap();
        assert!(fourth.is_empty());
    }

    #[tokio::test]
    async fn single_pass_propagates_selection_failure() {
        let store = store_with_walker(json!([[0, 0]])).await;
        store.set_selection_down(true).await;
        let driver = TickDriver::new(
            AdvancementEngine::new(store, NoOpNotifier),
            DEFAULT_TICK_INTERVAL,
        );

        assert!(driver.run_once().await.is_err());
    }

    #[tokio::test]
    async fn continuous_runs_until_shutdown() {
        let store = store_with_walker(json!([[0, 0], [1, 0], [2, 0], [3, 0]])).await;
        let (tx, rx) = oneshot::channel();
        let notifier = ArrivalSignal(Mutex::new(Some(tx)));
        let driver = TickDriver::new(
            AdvancementEngine::new(store.clone(), notifier),
            Duration::from_millis(1),
        );

        let summary = driver
            .run_continuous(async {
                let _ = rx.await;
            })
            .await;

        assert_eq!(summary.passes, 4);
        assert_eq!(summary.advanced, 3);
        assert_eq!(summary.arrived, 1);
        assert_eq!(summary.failed_passes, 0);
        let walker = store.walker(pathwalk_types::WalkerId::new(1)).await.unwrap();
        assert_eq!(walker.status, WalkerStatus::Done);
        assert_eq!(walker.current_index, 3);
    }

    #[tokio::test]
    async fn continuous_survives_failed_passes() {
        let store = store_with_walker(json!([[0, 0], [1, 0]])).await;
        store.set_selection_down(true).await;
        let driver = TickDriver::new(
            AdvancementEngine::new(store.clone(), NoOpNotifier),
            Duration::from_millis(1),
        );

        let summary = driver
            .run_continuous(tokio::time::sleep(Duration::from_millis(20)))
            .await;

        assert!(summary.passes >= 1);
        assert_eq!(summary.failed_passes, summary.passes);
        assert_eq!(summary.advanced, 0);
    }

    #[tokio::test]
    async fn shutdown_before_start_still_runs_one_pass() {
        let store = store_with_walker(json!([[0, 0], [1, 0], [2, 0]])).await;
        let driver = TickDriver::new(
            AdvancementEngine::new(store.clone(), NoOpNotifier),
            Duration::from_secs(60),
        );

        let summary = driver.run_continuous(std::future::ready(())).await;

        assert_eq!(summary.passes, 1);
        assert_eq!(summary.advanced, 1);
    }
}
