//! Caching layer over a record store
//!
//! Keeps recently used records in a bounded LRU cache and can delay writes,
//! batching them to the backend. Only use write delay for records nobody
//! else reads from the backend directly.

use crate::error::Result;
use crate::record::{unix_now, StoredRecord};
use crate::traits::RecordStore;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use tracing::{debug, error};

/// Default number of cached records
pub const DEFAULT_CACHE_SIZE: usize = 256;

/// Default number of delayed writes that triggers a flush
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 64;

/// Cache layer options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Maximum number of cached records
    pub cache_size: usize,
    /// Queue writes instead of writing through
    pub delay_writes: bool,
    /// Queue length that triggers a flush
    pub write_batch_size: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            delay_writes: false,
            write_batch_size: DEFAULT_WRITE_BATCH_SIZE,
        }
    }
}

/// Record store with an in-memory cache in front of a backend
pub struct CachedStore<S> {
    backend: S,
    cache: Mutex<LruCache<String, StoredRecord>>,
    /// Delayed writes by key; the last write per key wins
    pending: Mutex<HashMap<String, StoredRecord>>,
    options: CacheOptions,
}

impl<S: RecordStore> CachedStore<S> {
    /// Create a cache layer over `backend`
    pub fn new(backend: S, options: CacheOptions) -> Self {
        let capacity = NonZeroUsize::new(options.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            cache: Mutex::new(LruCache::new(capacity)),
            pending: Mutex::new(HashMap::new()),
            options,
        }
    }

    /// The wrapped backend
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Layer options
    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Number of cached records
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Number of writes waiting for a flush
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Write all delayed records to the backend
    ///
    /// Every queued record is attempted and the first failure is returned.
    /// Records that fail stay queued for the next flush. The queue is held
    /// for the whole flush, so readers see each record either queued or in
    /// the backend.
    pub fn flush(&self) -> Result<usize> {
        let mut pending = self.pending.lock();
        let mut written = 0;
        let mut first_err = None;

        pending.retain(|key, record| match self.backend.put(record.clone()) {
            Ok(()) => {
                written += 1;
                false
            }
            Err(e) => {
                error!("Failed to flush delayed write of {}: {}", key, e);
                first_err.get_or_insert(e);
                true
            }
        });

        if written > 0 {
            debug!("Flushed {} delayed writes", written);
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }
}

impl<S: RecordStore> RecordStore for CachedStore<S> {
    fn get(&self, key: &str) -> Result<StoredRecord> {
        {
            let mut cache = self.cache.lock();
            if let Some(record) = cache.get(key).cloned() {
                if !record.meta().is_expired(unix_now()) {
                    return Ok(record);
                }
                cache.pop(key);
            }
        }

        // evicted from the cache but not written yet
        let queued = self.pending.lock().get(key).cloned();
        if let Some(record) = queued {
            self.cache.lock().put(key.to_string(), record.clone());
            return Ok(record);
        }

        let record = self.backend.get(key)?;
        self.cache.lock().put(key.to_string(), record.clone());
        Ok(record)
    }

    fn put(&self, record: StoredRecord) -> Result<()> {
        let key = record.key().to_string();

        if !self.options.delay_writes {
            self.backend.put(record.clone())?;
            self.cache.lock().put(key, record);
            return Ok(());
        }

        self.cache.lock().put(key.clone(), record.clone());
        let queued = {
            let mut pending = self.pending.lock();
            pending.insert(key, record);
            pending.len()
        };

        if queued >= self.options.write_batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.cache.lock().pop(key);
        self.pending.lock().remove(key);
        self.backend.delete(key)
    }
}
