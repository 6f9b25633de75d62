//! # netintel core
//!
//! Network-intelligence cache of a host firewall.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Resolved-domain history** - which domains resolved to an IP, with
//!   CNAME chains and a store TTL derived from the DNS answers
//! - **Blocklist membership** - whether a country, domain, ASN or IP is on
//!   any loaded list, guarded by a probabilistic pre-filter
//! - **Configuration** - TOML configuration of store and lookups
//!
//! ## Example
//!
//! ```rust,no_run
//! use netintel_core::filterlists::{BlockListResolver, FilterListState};
//! use netintel_store::MemoryStore;
//!
//! let resolver = BlockListResolver::new(MemoryStore::new(), FilterListState::global());
//!
//! // Unknown until a loader publishes a pre-filter
//! let lookup = resolver.lookup_domain("Tracker.Example.com")?;
//! assert!(lookup.sources().is_empty());
//! # Ok::<(), netintel_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod filterlists;
pub mod logging;
pub mod resolver;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use filterlists::{BlockListResolver, FilterListState, Lookup};
pub use resolver::{IpInfo, IpInfoTracker, ResolvedDomain};
