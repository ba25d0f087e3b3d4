#![doc = include_str!("../README.md")]

pub use vellum_core::{
    codec,
    codec::{Codec, JsonCodec},
    commit, concurrency,
    concurrency::{ConcurrencyConflict, SnapshotConflict},
    event,
    event::{DomainEvent, Event, RecordedEvent},
    event_store,
    event_store::{AdminAccess, AppendError, Committed, EventStore},
    version,
};

pub mod store {
    pub use vellum_core::store::{CommitStore, CommitStream, InsertError, Scope, inmemory};

    #[cfg(feature = "postgres")]
    #[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
    pub mod postgres {
        pub use vellum_postgres::{Config, ConfigError, Error, Store};
    }
}

pub mod snapshot {
    pub use vellum_core::snapshot::{
        Snapshot, SnapshotRecord, SnapshotState, SnapshotStore, SnapshotWriteError, StateError,
        StateType, Versioned, inmemory, read_state, select_latest, write_state,
    };

    #[cfg(feature = "postgres")]
    #[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
    pub mod postgres {
        pub use vellum_postgres::snapshot::{Error, Store};
    }
}
