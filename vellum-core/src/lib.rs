//! Core traits and types for the Vellum event-sourced persistence layer.
//!
//! This crate provides the storage-agnostic half of the system:
//!
//! - [`event`] - Event envelopes (`Event`, `RecordedEvent`) and the
//!   `DomainEvent` marker
//! - [`commit`] - The atomically appended batch (`Commit`)
//! - [`version`] - Version resolution from committed batches
//! - [`store`] - The durable commit log boundary (`CommitStore`) and an
//!   in-memory reference implementation
//! - [`event_store`] - Commit writer and stream reader (`EventStore`)
//! - [`snapshot`] - Versioned snapshot rows (`SnapshotStore`) and an in-memory
//!   reference implementation
//! - [`codec`] - Encoding of opaque snapshot state (`Codec`, `JsonCodec`)
//! - [`concurrency`] - Conflict types returned by optimistic writes
//!
//! # Example
//!
//! ```
//! use vellum_core::{event_store::EventStore, store::inmemory};
//!
//! let store: EventStore<inmemory::Store<()>> = EventStore::new(inmemory::Store::new());
//! ```
//!
//! Most users should depend on the [`vellum`](https://docs.rs/vellum) crate,
//! which re-exports these types together with the `PostgreSQL` backends.

#[cfg(test)]
extern crate alloc;

pub mod codec;
pub mod commit;
pub mod concurrency;
pub mod event;
pub mod event_store;
pub mod snapshot;
pub mod store;
pub mod version;
