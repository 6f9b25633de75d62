//! # netintel store
//!
//! Key-addressed record storage used by the intel caches.
//!
//! This crate provides:
//! - **Record model** - [`Record`], [`Meta`] and the typed/wrapped [`StoredRecord`]
//! - **Store interface** - the [`RecordStore`] trait
//! - **Implementations** - [`MemoryStore`] and the [`CachedStore`] layer

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cached;
mod error;
mod memory;
mod record;
mod traits;

pub use cached::{CacheOptions, CachedStore, DEFAULT_CACHE_SIZE, DEFAULT_WRITE_BATCH_SIZE};
pub use error::{Result, StoreError};
pub use memory::{Encoding, MemoryStore};
pub use record::{unix_now, Meta, Record, StoredRecord, Wrapper};
pub use traits::RecordStore;
