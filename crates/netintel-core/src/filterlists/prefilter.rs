//! Probabilistic pre-filter
//!
//! Lookups consult the pre-filter before touching the record store. The
//! filter may report values that are on no list, but must never miss a
//! value that is.

use super::entity::EntityKind;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Membership test with no false negatives
pub trait PreFilter: Send + Sync {
    /// Whether `value` might be on any loaded list
    ///
    /// `value` is already normalized for `kind`.
    fn test(&self, kind: EntityKind, value: &str) -> bool;
}

/// Pre-filter that lets every value through to the store
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PreFilter for AllowAll {
    fn test(&self, _kind: EntityKind, _value: &str) -> bool {
        true
    }
}

#[derive(Default)]
struct Inner {
    filter: Option<Arc<dyn PreFilter>>,
    loaded: bool,
}

/// Current pre-filter snapshot and loaded flag
///
/// Both sit behind one read/write lock. Lookups take the read side;
/// reloads build the new filter first and take the write side only to
/// swap the reference.
#[derive(Default)]
pub struct FilterListState {
    inner: RwLock<Inner>,
}

static GLOBAL_STATE: Lazy<Arc<FilterListState>> = Lazy::new(|| Arc::new(FilterListState::new()));

impl FilterListState {
    /// Create a state with no filter loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state with `filter` already loaded
    pub fn with_filter(filter: Arc<dyn PreFilter>) -> Self {
        let state = Self::new();
        state.replace(filter);
        state
    }

    /// Process-wide state shared by default resolvers
    pub fn global() -> Arc<FilterListState> {
        Arc::clone(&GLOBAL_STATE)
    }

    /// Whether list data has been loaded
    pub fn is_loaded(&self) -> bool {
        self.inner.read().loaded
    }

    /// Publish a new filter snapshot and mark lists as loaded
    pub fn replace(&self, filter: Arc<dyn PreFilter>) {
        let mut inner = self.inner.write();
        inner.filter = Some(filter);
        inner.loaded = true;
        drop(inner);
        info!("Blocklist pre-filter replaced");
    }

    /// Drop the current filter and mark lists as not loaded
    pub fn unload(&self) {
        let mut inner = self.inner.write();
        inner.filter = None;
        inner.loaded = false;
    }

    /// Current filter, or `None` while nothing is loaded
    pub fn snapshot(&self) -> Option<Arc<dyn PreFilter>> {
        let inner = self.inner.read();
        if inner.loaded {
            inner.filter.clone()
        } else {
            None
        }
    }

    /// Run `f` against the current filter under the read lock
    ///
    /// Returns `None` while nothing is loaded.
    pub fn with_filter_read<T>(&self, f: impl FnOnce(&dyn PreFilter) -> T) -> Option<T> {
        let inner = self.inner.read();
        match (&inner.filter, inner.loaded) {
            (Some(filter), true) => Some(f(filter.as_ref())),
            _ => None,
        }
    }
}

impl fmt::Debug for FilterListState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterListState")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
