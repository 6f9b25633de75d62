//! Blocklist membership for countries, domains, ASNs and IP addresses
//!
//! The module provides:
//! - Key normalization per entity kind
//! - A pre-filter interface with a bloom filter implementation
//! - The [`BlockListResolver`] that combines both with the record store
//!
//! Parsing and downloading list sources is left to the loader that feeds
//! the store and calls [`FilterListState::replace`].

mod bloom;
mod entity;
mod entry;
mod lookup;
mod prefilter;

pub use bloom::{BloomPreFilter, BloomPreFilterBuilder};
pub use entity::{
    make_list_cache_key, normalize_domain, parse_ip, parse_ipv4, parse_ipv6, BlockListQuery,
    EntityKind, DEFAULT_KEY_PREFIX,
};
pub use entry::BlockListEntry;
pub use lookup::{BlockListResolver, Lookup, LookupStats, LookupStatsSnapshot};
pub use prefilter::{AllowAll, FilterListState, PreFilter};
