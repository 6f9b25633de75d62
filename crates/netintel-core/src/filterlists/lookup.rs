//! Blocklist membership lookups
//!
//! Every lookup normalizes its value, asks the pre-filter, and only on a
//! possible hit reads the authoritative entry from the record store.
//!
//! ```text
//! value → normalize → lists loaded? ─ no → NotLoaded
//!                        │ yes
//!                   pre-filter ─ miss → NotListed
//!                        │ maybe
//!                   store get ─ not found → NotListed (false positive)
//!                        │ found
//!                     Listed(sources)
//! ```

use super::entity::{parse_ip, parse_ipv4, parse_ipv6, BlockListQuery, DEFAULT_KEY_PREFIX};
use super::entry::BlockListEntry;
use super::prefilter::FilterListState;
use crate::config::FilterListsConfig;
use crate::error::Result;
use netintel_store::{RecordStore, Result as StoreResult, StoredRecord};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of a blocklist lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Value has an entry; the sources may be empty
    Listed(Vec<String>),
    /// Value is on no loaded list
    NotListed,
    /// List data is not loaded yet, membership is unknown
    NotLoaded,
}

impl Lookup {
    /// Sources that flagged the value; empty unless listed
    pub fn sources(&self) -> &[String] {
        match self {
            Lookup::Listed(sources) => sources,
            Lookup::NotListed | Lookup::NotLoaded => &[],
        }
    }

    /// Consume the outcome, returning its sources
    pub fn into_sources(self) -> Vec<String> {
        match self {
            Lookup::Listed(sources) => sources,
            Lookup::NotListed | Lookup::NotLoaded => Vec::new(),
        }
    }

    /// Whether at least one list flagged the value
    pub fn is_listed(&self) -> bool {
        !self.sources().is_empty()
    }

    /// Whether the answer came from loaded list data
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Lookup::NotLoaded)
    }
}

/// Lookup counters
#[derive(Debug, Default)]
pub struct LookupStats {
    total: AtomicU64,
    degraded: AtomicU64,
    filtered: AtomicU64,
    false_positives: AtomicU64,
    listed: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`LookupStats`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LookupStatsSnapshot {
    /// Lookups performed
    pub total: u64,
    /// Lookups answered while lists were not loaded
    pub degraded: u64,
    /// Lookups rejected by the pre-filter
    pub filtered: u64,
    /// Pre-filter hits without a store entry
    pub false_positives: u64,
    /// Lookups that found an entry
    pub listed: u64,
    /// Lookups that failed on the store
    pub errors: u64,
}

impl LookupStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> LookupStatsSnapshot {
        LookupStatsSnapshot {
            total: self.total.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            false_positives: self.false_positives.load(Ordering::Relaxed),
            listed: self.listed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Resolves blocklist membership of countries, domains, ASNs and IPs
pub struct BlockListResolver<S> {
    store: S,
    state: Arc<FilterListState>,
    key_prefix: String,
    stats: LookupStats,
}

impl<S: RecordStore> BlockListResolver<S> {
    /// Create a resolver reading entries from `store`
    pub fn new(store: S, state: Arc<FilterListState>) -> Self {
        Self {
            store,
            state,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            stats: LookupStats::default(),
        }
    }

    /// Create a resolver using the configured key prefix
    pub fn from_config(store: S, state: Arc<FilterListState>, config: &FilterListsConfig) -> Self {
        Self::new(store, state).with_key_prefix(&config.key_prefix)
    }

    /// Use a different namespace prefix for entry keys
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    /// Shared pre-filter state
    pub fn state(&self) -> &Arc<FilterListState> {
        &self.state
    }

    /// Underlying record store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lookup counters
    pub fn stats(&self) -> &LookupStats {
        &self.stats
    }

    /// Sources that list the country code
    pub fn lookup_country(&self, country: &str) -> Result<Lookup> {
        self.lookup(&BlockListQuery::country(country))
    }

    /// Sources that list the domain
    ///
    /// The domain is lower-cased and made fully qualified first.
    pub fn lookup_domain(&self, domain: &str) -> Result<Lookup> {
        self.lookup(&BlockListQuery::domain(domain)?)
    }

    /// Sources that list the ASN
    pub fn lookup_asn(&self, asn: &str) -> Result<Lookup> {
        self.lookup(&BlockListQuery::asn(asn))
    }

    /// Like [`lookup_asn`](Self::lookup_asn) for a numeric ASN
    pub fn lookup_asn_number(&self, asn: u32) -> Result<Lookup> {
        self.lookup_asn(&asn.to_string())
    }

    /// Sources that list the IPv4 address
    pub fn lookup_ipv4(&self, ip: Ipv4Addr) -> Result<Lookup> {
        self.lookup(&BlockListQuery::ipv4(ip))
    }

    /// Sources that list the IPv6 address
    ///
    /// IPv4-mapped addresses are checked against the IPv4 lists, the same
    /// as with [`lookup_ip`](Self::lookup_ip).
    pub fn lookup_ipv6(&self, ip: Ipv6Addr) -> Result<Lookup> {
        self.lookup_ip(IpAddr::V6(ip))
    }

    /// Sources that list the address, checking the IPv4 or IPv6 lists
    /// respectively
    pub fn lookup_ip(&self, ip: IpAddr) -> Result<Lookup> {
        self.lookup(&BlockListQuery::ip(ip))
    }

    /// Like [`lookup_ipv4`](Self::lookup_ipv4) for a textual address
    pub fn lookup_ipv4_str(&self, ip: &str) -> Result<Lookup> {
        self.lookup_ipv4(parse_ipv4(ip)?)
    }

    /// Like [`lookup_ipv6`](Self::lookup_ipv6) for a textual address
    pub fn lookup_ipv6_str(&self, ip: &str) -> Result<Lookup> {
        self.lookup_ipv6(parse_ipv6(ip)?)
    }

    /// Like [`lookup_ip`](Self::lookup_ip) for a textual address
    pub fn lookup_ip_str(&self, ip: &str) -> Result<Lookup> {
        self.lookup_ip(parse_ip(ip)?)
    }

    /// Resolve a normalized query
    pub fn lookup(&self, query: &BlockListQuery) -> Result<Lookup> {
        LookupStats::bump(&self.stats.total);

        let maybe_listed = self
            .state
            .with_filter_read(|filter| filter.test(query.kind(), query.value()));

        match maybe_listed {
            None => {
                LookupStats::bump(&self.stats.degraded);
                warn!(
                    "Not searching for {} because filter lists are not loaded",
                    query
                );
                return Ok(Lookup::NotLoaded);
            }
            Some(false) => {
                LookupStats::bump(&self.stats.filtered);
                return Ok(Lookup::NotListed);
            }
            Some(true) => {}
        }

        let key = query.cache_key(&self.key_prefix);
        debug!("Searching for entries with {}", key);

        match self.get_entry(&key) {
            Ok(entry) => {
                LookupStats::bump(&self.stats.listed);
                Ok(Lookup::Listed(entry.sources.into_iter().collect()))
            }
            Err(e) if e.is_not_found() => {
                LookupStats::bump(&self.stats.false_positives);
                Ok(Lookup::NotListed)
            }
            Err(e) => {
                LookupStats::bump(&self.stats.errors);
                error!("Failed to get entries for key {}: {}", key, e);
                Err(e.into())
            }
        }
    }

    /// Persist the sources of a value at its normalized key
    pub fn store_entry<I, T>(&self, query: &BlockListQuery, sources: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let entry = BlockListEntry::new(query.cache_key(&self.key_prefix), sources);
        self.store.put(StoredRecord::typed(entry))?;
        Ok(())
    }

    fn get_entry(&self, key: &str) -> StoreResult<BlockListEntry> {
        match self.store.get(key)? {
            StoredRecord::Wrapped(wrapper) => Ok(wrapper
                .unwrap_into::<BlockListEntry>()?
                .with_store_info(wrapper.key(), *wrapper.meta())),
            record => record.downcast_ref::<BlockListEntry>().cloned(),
        }
    }
}
