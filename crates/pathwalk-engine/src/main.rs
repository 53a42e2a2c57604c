//! Tick driver binary for the Pathwalk engine.
//!
//! Loads configuration, connects to `PostgreSQL`, and advances every active
//! walker either once (the default, for cron-style scheduling) or on a fixed
//! interval until `SIGINT`/`SIGTERM` with `--daemon`.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration from `pathwalk-config.yaml` (defaults if absent)
//! 3. Initialize structured logging (tracing)
//! 4. Connect to `PostgreSQL` and run migrations
//! 5. Connect the NATS event publisher, if enabled
//! 6. Run one pass, or run passes until a shutdown signal
//! 7. Drain the event publisher and close the pool

mod error;
mod nats_events;

use std::future::Future;
use std::path::{Path, PathBuf};

use clap::Parser;
use pathwalk_core::config::{LoggingConfig, NotificationConfig};
use pathwalk_core::{
    AdvancementEngine, ChannelNotifier, NoOpNotifier, PathwalkConfig, TickDriver, WalkNotifier,
};
use pathwalk_db::{PgWalkerStore, PostgresConfig, PostgresPool};
use pathwalk_types::WalkEvent;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::nats_events::NatsEventPublisher;

#[derive(Debug, Parser)]
#[command(name = "pathwalk-engine")]
#[command(about = "Advance walking players along their paths", version)]
struct Cli {
    /// Keep running passes until interrupted
    #[arg(long)]
    daemon: bool,

    /// Configuration file
    #[arg(short, long, default_value = "pathwalk-config.yaml")]
    config: PathBuf,

    /// Override the delay between passes in daemon mode
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Do not apply database migrations on startup
    #[arg(long)]
    skip_migrations: bool,
}

/// Where committed walk events go.
enum EventSink {
    Disabled(NoOpNotifier),
    Nats(ChannelNotifier),
}

impl WalkNotifier for EventSink {
    fn notify(&self, event: &WalkEvent) {
        match self {
            Self::Disabled(inner) => inner.notify(event),
            Self::Nats(inner) => inner.notify(event),
        }
    }
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if startup fails or, in single-pass mode, if the pass
/// cannot select walkers.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(interval_ms) = cli.interval_ms {
        config.driver.tick_interval_ms = interval_ms;
    }
    if cli.skip_migrations {
        config.database.run_migrations = false;
    }

    init_logging(&config.logging)?;
    if !cli.config.exists() {
        info!(path = %cli.config.display(), "Config file not found, using defaults");
    }
    info!(
        daemon = cli.daemon,
        tick_interval_ms = config.driver.tick_interval_ms,
        max_concurrency = config.driver.max_concurrency,
        notifications = config.notifications.enabled,
        "pathwalk-engine starting"
    );

    // Armed before the first pass so a signal during it is not fatal.
    let shutdown = cli.daemon.then(shutdown_signal);

    let pool = PostgresPool::connect(&PostgresConfig::from(&config.database))
        .await
        .map_err(EngineError::from)?;
    if config.database.run_migrations {
        pool.run_migrations().await.map_err(EngineError::from)?;
    }

    let (sink, publisher) = event_sink(&config.notifications).await;

    let store = PgWalkerStore::new(pool.pool().clone());
    let engine = AdvancementEngine::new(store, sink)
        .with_max_concurrency(config.driver.max_concurrency);
    let driver = TickDriver::new(engine, config.driver.tick_interval());

    let outcome = if let Some(shutdown) = shutdown {
        driver.run_continuous(shutdown).await;
        Ok(())
    } else {
        driver.run_once().await.map(|_| ()).map_err(EngineError::from)
    };

    // Dropping the driver closes the event channel so the publisher drains.
    drop(driver);
    drain_publisher(publisher).await;
    pool.close().await;

    outcome?;
    info!("pathwalk-engine stopped");
    Ok(())
}

/// Load configuration from `path`, falling back to defaults (plus
/// environment overrides) when the file does not exist.
fn load_config(path: &Path) -> Result<PathwalkConfig, EngineError> {
    if path.exists() {
        Ok(PathwalkConfig::from_file(path)?)
    } else {
        Ok(PathwalkConfig::from_env()?)
    }
}

fn init_logging(config: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log filter {:?}: {e}", config.level),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}

/// Build the notifier for the engine.
///
/// Walk events are optional: if NATS cannot be reached the engine runs
/// without them rather than refusing to start.
async fn event_sink(config: &NotificationConfig) -> (EventSink, Option<JoinHandle<u64>>) {
    if !config.enabled {
        return (EventSink::Disabled(NoOpNotifier), None);
    }

    info!(nats_url = %config.nats_url, prefix = %config.subject_prefix, "Connecting to NATS");
    match NatsEventPublisher::connect(&config.nats_url, &config.subject_prefix).await {
        Ok(publisher) => {
            let (notifier, events) = ChannelNotifier::new(config.buffer);
            (EventSink::Nats(notifier), Some(publisher.spawn(events)))
        }
        Err(e) => {
            warn!(error = %e, "Walk events disabled, continuing without NATS");
            (EventSink::Disabled(NoOpNotifier), None)
        }
    }
}

async fn drain_publisher(publisher: Option<JoinHandle<u64>>) {
    let Some(handle) = publisher else {
        return;
    };
    if let Err(e) = handle.await {
        warn!(error = %e, "walk event publisher task failed");
    }
}

/// Resolves on `SIGINT` or `SIGTERM`.
///
/// The handlers are installed when this is called, not when the future is
/// first polled, so a signal that arrives while a pass is running is held
/// until the driver checks for shutdown.
#[cfg(unix)]
fn shutdown_signal() -> impl Future<Output = ()> {
    use tokio::signal::unix::{SignalKind, signal};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        tokio::select! {
            () = wait_for(interrupt, "SIGINT") => {}
            () = wait_for(terminate, "SIGTERM") => {}
        }
        info!("Shutdown signal received, finishing current pass");
    }
}

#[cfg(unix)]
async fn wait_for(stream: std::io::Result<tokio::signal::unix::Signal>, name: &str) {
    match stream {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            warn!(error = %e, signal = name, "failed to install signal handler");
            std::future::pending::<()>().await;
        }
    }
}

/// Resolves on Ctrl-C.
#[cfg(not(unix))]
fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, finishing current pass");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_single_pass() {
        let cli = Cli::try_parse_from(["pathwalk-engine"]).unwrap();
        assert!(!cli.daemon);
        assert!(!cli.skip_migrations);
        assert_eq!(cli.config, PathBuf::from("pathwalk-config.yaml"));
        assert_eq!(cli.interval_ms, None);
    }

    #[test]
    fn cli_daemon_flags() {
        let cli = Cli::try_parse_from([
            "pathwalk-engine",
            "--daemon",
            "--interval-ms",
            "500",
            "--skip-migrations",
            "-c",
            "/etc/pathwalk.yaml",
        ])
        .unwrap();
        assert!(cli.daemon);
        assert!(cli.skip_migrations);
        assert_eq!(cli.interval_ms, Some(500));
        assert_eq!(cli.config, PathBuf::from("/etc/pathwalk.yaml"));
    }

    #[tokio::test]
    async fn unreachable_nats_falls_back_to_no_events() {
        let config = NotificationConfig {
            enabled: true,
            nats_url: String::from("nats://127.0.0.1:1"),
            ..NotificationConfig::default()
        };
        let (sink, publisher) = event_sink(&config).await;
        assert!(matches!(sink, EventSink::Disabled(_)));
        assert!(publisher.is_none());
    }

    #[tokio::test]
    async fn disabled_notifications_skip_nats() {
        let (sink, publisher) = event_sink(&NotificationConfig::default()).await;
        assert!(matches!(sink, EventSink::Disabled(_)));
        assert!(publisher.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_before_first_poll_is_held() {
        let shutdown = shutdown_signal();
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
        tokio::time::timeout(std::time::Duration::from_secs(5), shutdown)
            .await
            .unwrap();
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/pathwalk-config.yaml")).unwrap();
        assert_eq!(config.driver.max_concurrency, 1);
        assert!(!config.notifications.enabled);
    }
}
