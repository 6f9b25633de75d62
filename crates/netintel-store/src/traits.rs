//! Store interface consumed by the intel caches

use crate::error::Result;
use crate::record::StoredRecord;
use std::sync::Arc;

/// Key-addressed record store
///
/// Calls may block on local storage. Implementations must be safe to share
/// between threads.
pub trait RecordStore: Send + Sync {
    /// Fetch the record at `key`
    ///
    /// Fails with [`StoreError::NotFound`](crate::StoreError::NotFound) when
    /// no live record exists.
    fn get(&self, key: &str) -> Result<StoredRecord>;

    /// Write a record at its own key
    fn put(&self, record: StoredRecord) -> Result<()>;

    /// Remove the record at `key`. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn get(&self, key: &str) -> Result<StoredRecord> {
        (**self).get(key)
    }

    fn put(&self, record: StoredRecord) -> Result<()> {
        (**self).put(record)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn get(&self, key: &str) -> Result<StoredRecord> {
        (**self).get(key)
    }

    fn put(&self, record: StoredRecord) -> Result<()> {
        (**self).put(record)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}
