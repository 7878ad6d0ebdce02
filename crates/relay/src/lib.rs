//! Poll-relay core: fetch recent posts per watched account, drop the ones
//! already delivered, forward the rest to the destination chat in
//! chronological order, sleep, repeat.
//!
//! The source and destination APIs sit behind the [`ports::PostSource`] and
//! [`ports::Notifier`] traits; delivered-post bookkeeping sits behind
//! [`store::SeenStore`].

pub mod clock;
pub mod cycle;
pub mod error;
pub mod ports;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use {
    clock::{Clock, TokioClock},
    cycle::{Poller, PollerConfig},
    error::{Error, Result},
    ports::{Notifier, PostSource, SourceError},
    store::SeenStore,
    store_memory::MemorySeenStore,
    store_sqlite::SqliteSeenStore,
    types::{Media, MediaKind, Post},
};
