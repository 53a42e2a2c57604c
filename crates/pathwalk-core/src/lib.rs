//! Walker advancement engine and tick driver for Pathwalk.
//!
//! A walker is a persisted traversal of a precomputed path. Each tick the
//! engine selects every walker that is still walking, moves its owner
//! forward by a number of path points derived from the owner's speed
//! multiplier, and commits the owner position and walker state together.
//!
//! # Tick Flow
//!
//! ```text
//! TickDriver (once, or every tick_interval until shutdown)
//!     |
//!     +-- AdvancementEngine::run_pass()
//!           |-- WalkerStore::active_walkers()   (abort pass on error)
//!           +-- per walker:
//!                 advance::decide()             (pure)
//!                 WalkerStore::commit()         (atomic per walker)
//!                 WalkNotifier::notify()        (fire-and-forget)
//! ```
//!
//! # Modules
//!
//! - [`advance`] -- Speed quantization, path decoding, the per-walker decision
//! - [`store`] -- The persistence seam and commit types
//! - [`memory`] -- In-memory store with fault injection
//! - [`notify`] -- Walk event notifiers
//! - [`engine`] -- One pass over all active walkers
//! - [`report`] -- Per-walker outcomes and pass reports
//! - [`driver`] -- Single-pass and continuous tick driver
//! - [`config`] -- YAML configuration with environment overrides

pub mod advance;
pub mod config;
pub mod driver;
pub mod engine;
pub mod memory;
pub mod notify;
pub mod report;
pub mod store;

pub use advance::{Advance, WalkPath, decide, steps_per_tick};
pub use config::{ConfigError, PathwalkConfig};
pub use driver::{DEFAULT_TICK_INTERVAL, DriverSummary, TickDriver};
pub use engine::{AdvancementEngine, PassError};
pub use memory::MemoryWalkerStore;
pub use notify::{ChannelNotifier, NoOpNotifier, WalkNotifier};
pub use report::{PassReport, WalkerOutcome, WalkerReport};
pub use store::{StoreError, WalkerCommit, WalkerStore, WalkerUpdate};
