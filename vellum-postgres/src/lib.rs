//! Postgres-backed storage for the Vellum event store.
//!
//! This crate provides `PostgreSQL` implementations of the core Vellum traits:
//!
//! - [`Store`] - An implementation of [`vellum_core::store::CommitStore`]
//! - [`snapshot::Store`] - An implementation of
//!   [`vellum_core::snapshot::SnapshotStore`]
//! - [`Config`] - Connection pool settings, readable from the environment
//!
//! Both stores use the same database and can share a connection pool.
//!
//! ```ignore
//! use vellum_core::event_store::EventStore;
//! use vellum_postgres::{Config, Store, snapshot};
//!
//! let pool = Config::from_env()?.connect().await?;
//! let commits = Store::<()>::new(pool.clone());
//! let snapshots = snapshot::Store::new(pool);
//! commits.migrate().await?;
//! snapshots.migrate().await?;
//!
//! let events = EventStore::new(commits);
//! ```

#[cfg(test)]
extern crate alloc;

pub mod snapshot;

mod config;
mod error;
mod store;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use store::Store;
