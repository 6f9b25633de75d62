//! Resolution tracking on top of a record store

use super::ipinfo::{profile_scope, IpInfo, ResolvedDomain};
use crate::config::StoreConfig;
use crate::error::Result;
use netintel_store::{CachedStore, RecordStore};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Number of update locks; records hashing to the same stripe serialize
const LOCK_STRIPES: usize = 64;

/// Records DNS resolutions into per-IP histories
///
/// Each call touches exactly one `(profile_id, ip)` record. Updates of the
/// same record are serialized from load to save, so concurrent resolutions
/// for one IP all end up in its history. An empty `profile_id` means the
/// global scope.
pub struct IpInfoTracker<S> {
    store: S,
    stripes: Box<[Mutex<()>]>,
}

impl<B: RecordStore> IpInfoTracker<CachedStore<B>> {
    /// Create a tracker with a cache layer over `backend`
    pub fn with_cache(backend: B, config: &StoreConfig) -> Self {
        Self::new(CachedStore::new(backend, config.cache_options()))
    }
}

impl<S: RecordStore> IpInfoTracker<S> {
    /// Create a tracker writing to `store`
    pub fn new(store: S) -> Self {
        Self {
            store,
            stripes: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Underlying record store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn stripe(&self, profile_id: &str, ip: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        (profile_id, ip).hash(&mut hasher);
        &self.stripes[hasher.finish() as usize % self.stripes.len()]
    }

    /// Load the history of `ip` in scope `profile_id`
    pub fn get(&self, profile_id: &str, ip: &str) -> Result<IpInfo> {
        IpInfo::load(&self.store, profile_scope(profile_id), ip)
    }

    /// Add a resolution to the history of `ip` and save it
    ///
    /// Starts a new history when none is stored yet.
    pub fn record(&self, profile_id: &str, ip: &str, resolved: ResolvedDomain) -> Result<IpInfo> {
        let profile_id = profile_scope(profile_id);
        let _guard = self.stripe(profile_id, ip).lock();

        let info = match self.get(profile_id, ip) {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                debug!("Starting resolution history for {} in {}", ip, profile_id);
                IpInfo::new(profile_id, ip)
            }
            Err(e) => return Err(e),
        };

        info.add_domain(resolved);
        info.save(&self.store)?;
        Ok(info)
    }

    /// Most recent domain seen for `ip`, or `None` without any history
    pub fn most_recent_domain(&self, profile_id: &str, ip: &str) -> Result<Option<ResolvedDomain>> {
        match self.get(profile_id, ip) {
            Ok(info) => Ok(info.most_recent_domain()),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
