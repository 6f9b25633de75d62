//! In-memory record store
//!
//! Thread-safe map of records. With [`Encoding::Wrapped`] every record is
//! encoded on write, the way a persistent backend hands records back.

use crate::error::{Result, StoreError};
use crate::record::{unix_now, StoredRecord};
use crate::traits::RecordStore;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// How records are kept by the [`MemoryStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Keep records in the form they were written
    #[default]
    Typed,
    /// Encode every record into a wrapper on write
    Wrapped,
}

/// DashMap-backed record store
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Records by key
    records: DashMap<String, StoredRecord>,
    /// Representation of stored records
    encoding: Encoding,
    /// Simulated outage switch
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store keeping typed records
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given encoding
    pub fn with_encoding(encoding: Encoding) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }

    /// Representation used for stored records
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Make every operation fail with [`StoreError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Remove `key` only if the stored record is still expired, so a record
    /// written after the expiry check survives
    fn remove_expired(&self, key: &str, now: i64) -> bool {
        self.records
            .remove_if(key, |_, record| record.meta().is_expired(now))
            .is_some()
    }

    /// Remove all records past their absolute expiry
    ///
    /// Returns the number of records removed.
    pub fn purge_expired(&self) -> usize {
        let now = unix_now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.meta().is_expired(now));
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!("Purged {} expired records", removed);
        }
        removed
    }

    /// Number of stored records, expired ones included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove all records
    pub fn clear(&self) {
        self.records.clear();
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> Result<StoredRecord> {
        self.check_online()?;

        let Some(record) = self.records.get(key).map(|r| r.value().clone()) else {
            return Err(StoreError::not_found(key));
        };

        let now = unix_now();
        if record.meta().is_expired(now) {
            trace!("Record {} expired, removing", key);
            self.remove_expired(key, now);
            return Err(StoreError::not_found(key));
        }

        Ok(record)
    }

    fn put(&self, record: StoredRecord) -> Result<()> {
        self.check_online()?;

        if record.key().is_empty() {
            return Err(StoreError::MissingKey);
        }

        let record = match self.encoding {
            Encoding::Typed => record,
            Encoding::Wrapped => StoredRecord::Wrapped(record.into_wrapped()?),
        };

        self.records.insert(record.key().to_string(), record);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check_online()?;
        self.records.remove(key);
        Ok(())
    }
}
