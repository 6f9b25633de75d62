//! Entity kinds and lookup key normalization

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Default namespace prefix of blocklist entry keys
pub const DEFAULT_KEY_PREFIX: &str = "cache:intel/filterlists";

/// Category of identifier checked against blocklists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Country code
    Country,
    /// Fully qualified domain name
    Domain,
    /// Autonomous system number
    Asn,
    /// IPv4 address
    Ipv4,
    /// IPv6 address
    Ipv6,
}

impl EntityKind {
    /// All entity kinds
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Country,
        EntityKind::Domain,
        EntityKind::Asn,
        EntityKind::Ipv4,
        EntityKind::Ipv6,
    ];

    /// Name used in store keys
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Country => "country",
            EntityKind::Domain => "domain",
            EntityKind::Asn => "asn",
            EntityKind::Ipv4 => "ipv4",
            EntityKind::Ipv6 => "ipv6",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidEntityKind(s.to_string()))
    }
}

/// A normalized blocklist lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockListQuery {
    kind: EntityKind,
    value: String,
}

impl BlockListQuery {
    /// Query for a country code, used verbatim
    pub fn country(country: &str) -> Self {
        Self::verbatim(EntityKind::Country, country)
    }

    /// Query for an ASN, used verbatim
    pub fn asn(asn: &str) -> Self {
        Self::verbatim(EntityKind::Asn, asn)
    }

    /// Query for a domain
    pub fn domain(domain: &str) -> Result<Self> {
        Ok(Self {
            kind: EntityKind::Domain,
            value: normalize_domain(domain)?,
        })
    }

    /// Query for an IPv4 address
    pub fn ipv4(ip: Ipv4Addr) -> Self {
        Self {
            kind: EntityKind::Ipv4,
            value: ip.to_string(),
        }
    }

    /// Query for an IPv6 address
    pub fn ipv6(ip: Ipv6Addr) -> Self {
        Self {
            kind: EntityKind::Ipv6,
            value: ip.to_string(),
        }
    }

    /// Query for an IP address of either family
    ///
    /// IPv4-mapped IPv6 addresses are queried as IPv4.
    pub fn ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Self::ipv4(v4),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Self::ipv4(v4),
                None => Self::ipv6(v6),
            },
        }
    }

    /// Build a query of any kind from its textual value, applying the
    /// normalization of that kind
    pub fn parse(kind: EntityKind, value: &str) -> Result<Self> {
        match kind {
            EntityKind::Country | EntityKind::Asn => Ok(Self::verbatim(kind, value)),
            EntityKind::Domain => Self::domain(value),
            EntityKind::Ipv4 => parse_ipv4(value).map(Self::ipv4),
            EntityKind::Ipv6 => parse_ipv6(value).map(Self::ipv6),
        }
    }

    fn verbatim(kind: EntityKind, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }

    /// Entity kind
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Normalized value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Store key of the entry under `prefix`
    pub fn cache_key(&self, prefix: &str) -> String {
        make_list_cache_key(prefix, self.kind, &self.value)
    }
}

impl fmt::Display for BlockListQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.value)
    }
}

/// Store key of a blocklist entry: `<prefix>/<kind>/<value>`
pub fn make_list_cache_key(prefix: &str, kind: EntityKind, value: &str) -> String {
    format!("{prefix}/{kind}/{value}")
}

/// Lower-case the domain and make sure it ends in exactly one `.`
pub fn normalize_domain(domain: &str) -> Result<String> {
    let trimmed = domain.trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(Error::InvalidDomain);
    }

    let mut normalized = trimmed.to_lowercase();
    normalized.push('.');
    Ok(normalized)
}

/// Parse an IPv4 address, rejecting anything else
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr> {
    s.parse().map_err(|_| Error::invalid_address(s))
}

/// Parse an IPv6 address, rejecting anything else
pub fn parse_ipv6(s: &str) -> Result<Ipv6Addr> {
    s.parse().map_err(|_| Error::invalid_address(s))
}

/// Parse an address of either family
pub fn parse_ip(s: &str) -> Result<IpAddr> {
    s.parse().map_err(|_| Error::invalid_address(s))
}
