//! Per-IP resolved domain history
//!
//! An [`IpInfo`] remembers which domains (and CNAME chains) resolved to an
//! IP within one profile scope. Its store expiry is derived from the DNS
//! answers it holds.

use crate::error::Result;
use netintel_store::{unix_now, Meta, Record, RecordStore, Result as StoreResult, StoredRecord};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use tracing::trace;

/// Profile scope used for unscoped entries
pub const IPINFO_PROFILE_SCOPE_GLOBAL: &str = "global";

/// Minimum lifetime of a saved record
const MIN_TTL_SECS: i64 = 86_400;

/// Slack added on top of the longest DNS answer
const EXPIRY_BUFFER_SECS: i64 = 3_600;

/// Profile scope a record is stored under; empty means global
pub fn profile_scope(profile_id: &str) -> &str {
    if profile_id.is_empty() {
        IPINFO_PROFILE_SCOPE_GLOBAL
    } else {
        profile_id
    }
}

/// Store key of an IP info record
pub fn make_ip_info_key(profile_id: &str, ip: &str) -> String {
    format!("cache:intel/ipInfo/{profile_id}/{ip}")
}

/// A domain as requested by an application, with the CNAMEs it resolved
/// through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDomain {
    /// Domain as requested
    #[serde(rename = "Domain")]
    pub domain: String,

    /// CNAMEs in resolution order
    #[serde(rename = "CNAMEs", default)]
    pub cnames: Vec<String>,

    /// Unix timestamp the DNS answer expires at
    ///
    /// The entry stays usable afterwards; this only feeds the record TTL.
    #[serde(rename = "Expires")]
    pub expires: i64,
}

impl ResolvedDomain {
    /// Create a resolved domain entry
    pub fn new(domain: impl Into<String>, cnames: Vec<String>, expires: i64) -> Self {
        Self {
            domain: domain.into(),
            cnames,
            expires,
        }
    }
}

impl fmt::Display for ResolvedDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.domain)?;
        if !self.cnames.is_empty() {
            write!(f, " (-> {})", self.cnames.join("->"))?;
        }
        Ok(())
    }
}

/// Resolved domains ordered by recency, most recent last, one entry per
/// domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedDomains(Vec<ResolvedDomain>);

impl ResolvedDomains {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `resolved`, dropping an older entry for the same domain
    pub fn add(&mut self, resolved: ResolvedDomain) {
        if let Some(idx) = self.0.iter().position(|d| d.domain == resolved.domain) {
            self.0.remove(idx);
        }
        self.0.push(resolved);
    }

    /// Most recently added entry
    pub fn most_recent(&self) -> Option<&ResolvedDomain> {
        self.0.last()
    }

    /// Latest DNS expiry, but never below `floor`
    pub fn max_expires(&self, floor: i64) -> i64 {
        self.0.iter().fold(floor, |max, rd| max.max(rd.expires))
    }
}

impl Deref for ResolvedDomains {
    type Target = [ResolvedDomain];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromIterator<ResolvedDomain> for ResolvedDomains {
    fn from_iter<I: IntoIterator<Item = ResolvedDomain>>(iter: I) -> Self {
        let mut domains = Self::new();
        for resolved in iter {
            domains.add(resolved);
        }
        domains
    }
}

impl fmt::Display for ResolvedDomains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, resolved) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{resolved}")?;
        }
        Ok(())
    }
}

/// Stored form of an [`IpInfo`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpInfoRecord {
    #[serde(skip)]
    key: String,
    #[serde(skip)]
    meta: Meta,

    #[serde(rename = "IP")]
    ip: String,
    #[serde(rename = "ProfileID")]
    profile_id: String,
    #[serde(rename = "ResolvedDomains", default)]
    resolved_domains: ResolvedDomains,
}

impl IpInfoRecord {
    fn with_store_info(mut self, key: &str, meta: Meta) -> Self {
        self.key = key.to_string();
        self.meta = meta;
        self
    }
}

impl Record for IpInfoRecord {
    fn key(&self) -> &str {
        &self.key
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn marshal(&self) -> StoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
struct State {
    key: Option<String>,
    meta: Meta,
    profile_id: String,
    resolved_domains: ResolvedDomains,
}

/// Domains seen resolving to one IP within one profile scope
///
/// All access goes through the record's own lock, so one entry can be
/// shared between the DNS path and connection handlers.
#[derive(Debug)]
pub struct IpInfo {
    ip: String,
    state: Mutex<State>,
}

impl IpInfo {
    /// Create an empty entry; an empty `profile_id` means the global scope
    pub fn new(profile_id: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            state: Mutex::new(State {
                key: None,
                meta: Meta::default(),
                profile_id: profile_id.into(),
                resolved_domains: ResolvedDomains::new(),
            }),
        }
    }

    fn from_record(record: IpInfoRecord) -> Self {
        let key = (!record.key.is_empty()).then_some(record.key);
        Self {
            ip: record.ip,
            state: Mutex::new(State {
                key,
                meta: record.meta,
                profile_id: record.profile_id,
                resolved_domains: record.resolved_domains,
            }),
        }
    }

    /// Load the entry for `(profile_id, ip)`; an empty `profile_id` reads
    /// the global scope
    ///
    /// Fails with `NotFound` when absent and `TypeMismatch` when the stored
    /// payload is not an IP info record.
    pub fn load<S: RecordStore + ?Sized>(store: &S, profile_id: &str, ip: &str) -> Result<Self> {
        let key = make_ip_info_key(profile_scope(profile_id), ip);
        let record = match store.get(&key)? {
            StoredRecord::Wrapped(wrapper) => wrapper
                .unwrap_into::<IpInfoRecord>()?
                .with_store_info(wrapper.key(), *wrapper.meta()),
            record => record.downcast_ref::<IpInfoRecord>()?.clone(),
        };
        Ok(Self::from_record(record))
    }

    /// IP address
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Profile scope
    pub fn profile_id(&self) -> String {
        self.state.lock().profile_id.clone()
    }

    /// Store key, set on first save
    pub fn key(&self) -> Option<String> {
        self.state.lock().key.clone()
    }

    /// Store metadata
    pub fn meta(&self) -> Meta {
        self.state.lock().meta
    }

    /// Absolute expiry set by the last save, zero before
    pub fn expires(&self) -> i64 {
        self.state.lock().meta.expires
    }

    /// Copy of the resolved domain history
    pub fn resolved_domains(&self) -> ResolvedDomains {
        self.state.lock().resolved_domains.clone()
    }

    /// Record a resolution, replacing any older one for the same domain
    pub fn add_domain(&self, resolved: ResolvedDomain) {
        self.state.lock().resolved_domains.add(resolved);
    }

    /// Copy of the most recently added resolution
    pub fn most_recent_domain(&self) -> Option<ResolvedDomain> {
        self.state.lock().resolved_domains.most_recent().cloned()
    }

    /// Save the entry to the store
    ///
    /// See [`save_at`](Self::save_at).
    pub fn save<S: RecordStore + ?Sized>(&self, store: &S) -> Result<()> {
        self.save_at(store, unix_now())
    }

    /// Save the entry to the store, using `now` as the current time
    ///
    /// The key is assigned on the first save and kept afterwards. The record
    /// expires one hour after the latest DNS answer it holds, and no sooner
    /// than one day and one hour from `now`.
    ///
    /// Key and expiry are finalized under the record lock; the store write
    /// happens after the lock is released, so of two racing saves the one
    /// reaching the store last wins.
    pub fn save_at<S: RecordStore + ?Sized>(&self, store: &S, now: i64) -> Result<()> {
        let record = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if state.key.is_none() && state.profile_id.is_empty() {
                state.profile_id = IPINFO_PROFILE_SCOPE_GLOBAL.to_string();
            }
            let key = state
                .key
                .get_or_insert_with(|| make_ip_info_key(&state.profile_id, &self.ip))
                .clone();

            let expires = state.resolved_domains.max_expires(now + MIN_TTL_SECS) + EXPIRY_BUFFER_SECS;
            state.meta.update_at(now);
            state.meta.set_absolute_expiry(expires);

            IpInfoRecord {
                key,
                meta: state.meta,
                ip: self.ip.clone(),
                profile_id: state.profile_id.clone(),
                resolved_domains: state.resolved_domains.clone(),
            }
        };

        trace!("Saving {} (expires {})", record.key, record.meta.expires);
        store.put(StoredRecord::typed(record))?;
        Ok(())
    }
}

impl fmt::Display for IpInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "<IPInfo[{}] {}: {}>",
            state.key.as_deref().unwrap_or_default(),
            self.ip,
            state.resolved_domains
        )
    }
}

/// Load the entry for `(profile_id, ip)`; see [`IpInfo::load`]
pub fn get_ip_info<S: RecordStore + ?Sized>(store: &S, profile_id: &str, ip: &str) -> Result<IpInfo> {
    IpInfo::load(store, profile_id, ip)
}
