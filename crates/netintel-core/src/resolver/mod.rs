//! Resolved-domain history
//!
//! Remembers which domains resolved to which IP addresses, per profile
//! scope, so connections can be attributed to the names that led to them.

mod ipinfo;
mod tracker;

pub use ipinfo::{
    get_ip_info, make_ip_info_key, profile_scope, IpInfo, IpInfoRecord, ResolvedDomain,
    ResolvedDomains, IPINFO_PROFILE_SCOPE_GLOBAL,
};
pub use tracker::IpInfoTracker;
