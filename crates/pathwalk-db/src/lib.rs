//! `PostgreSQL` persistence for the Pathwalk engine.
//!
//! The engine itself only knows the [`WalkerStore`](pathwalk_core::WalkerStore)
//! trait. This crate provides the production implementation on top of the
//! `walkers` and `players` tables, plus the pool and migrations that create
//! them.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool, configuration and migrations
//! - [`walker_store`] -- active-walker selection and transactional commits
//! - [`error`] -- shared error type

pub mod error;
pub mod postgres;
pub mod walker_store;

pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use walker_store::{PgWalkerStore, WalkerRow};
