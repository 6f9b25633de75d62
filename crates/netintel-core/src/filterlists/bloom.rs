//! Bloom filter pre-filter
//!
//! One bloom filter per entity kind, so values of different kinds never
//! collide. Sized from the expected number of values and a target false
//! positive rate:
//!
//! ```text
//! m = -n * ln(p) / (ln 2)^2      bits
//! k = (m / n) * ln 2             hash functions
//! ```

use super::entity::EntityKind;
use super::prefilter::PreFilter;
use crate::config::FilterListsConfig;
use std::collections::HashMap;
use std::f64::consts::LN_2;

const MIN_BITS: usize = 64;
/// 128 MiB per entity kind
const MAX_BITS: usize = 1 << 30;
const MAX_HASHES: u32 = 16;
const MIN_FALSE_POSITIVE_RATE: f64 = 1e-9;
const MAX_FALSE_POSITIVE_RATE: f64 = 0.5;

/// Bloom filter for a single entity kind
#[derive(Debug, Clone)]
struct ScopedBloom {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    items: usize,
}

impl ScopedBloom {
    /// Rates outside `1e-9..=0.5` are clamped, and the bit array is capped
    /// at [`MAX_BITS`].
    fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        let p = if false_positive_rate.is_nan() {
            MAX_FALSE_POSITIVE_RATE
        } else {
            false_positive_rate.clamp(MIN_FALSE_POSITIVE_RATE, MAX_FALSE_POSITIVE_RATE)
        };
        let n = expected_items.max(1) as f64;
        let m = (-n * p.ln() / (LN_2 * LN_2)).ceil().min(MAX_BITS as f64) as usize;
        let num_bits = m.clamp(MIN_BITS, MAX_BITS).next_multiple_of(64);
        let k = ((num_bits as f64 / n) * LN_2).round() as u32;

        Self {
            bits: vec![0; num_bits / 64],
            num_bits: num_bits as u64,
            num_hashes: k.clamp(1, MAX_HASHES),
            items: 0,
        }
    }

    /// Bit positions via double hashing: h1 + i * h2
    fn positions(&self, value: &str) -> impl Iterator<Item = usize> + '_ {
        let hash = fnv1a(value.as_bytes());
        let h1 = hash & 0xFFFF_FFFF;
        let h2 = (hash >> 32) | 1;
        (0..u64::from(self.num_hashes))
            .map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits) as usize)
    }

    fn insert(&mut self, value: &str) {
        let positions: Vec<usize> = self.positions(value).collect();
        for pos in positions {
            self.bits[pos / 64] |= 1 << (pos % 64);
        }
        self.items += 1;
    }

    fn test(&self, value: &str) -> bool {
        self.positions(value)
            .all(|pos| self.bits[pos / 64] & (1 << (pos % 64)) != 0)
    }
}

/// FNV-1a hash, well distributed for short strings
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}

/// Pre-filter backed by one bloom filter per entity kind
///
/// Immutable once built; build a new one with [`BloomPreFilterBuilder`] and
/// publish it through [`FilterListState::replace`](super::FilterListState::replace).
#[derive(Debug, Clone, Default)]
pub struct BloomPreFilter {
    scopes: HashMap<EntityKind, ScopedBloom>,
}

impl BloomPreFilter {
    /// Start building a filter
    pub fn builder(expected_items: usize, false_positive_rate: f64) -> BloomPreFilterBuilder {
        BloomPreFilterBuilder::new(expected_items, false_positive_rate)
    }

    /// Number of values inserted for `kind`
    pub fn len(&self, kind: EntityKind) -> usize {
        self.scopes.get(&kind).map_or(0, |s| s.items)
    }

    /// Whether no values were inserted at all
    pub fn is_empty(&self) -> bool {
        self.scopes.values().all(|s| s.items == 0)
    }

    /// Size of all bit arrays in bytes
    pub fn size_bytes(&self) -> usize {
        self.scopes.values().map(|s| s.bits.len() * 8).sum()
    }
}

impl PreFilter for BloomPreFilter {
    fn test(&self, kind: EntityKind, value: &str) -> bool {
        self.scopes.get(&kind).is_some_and(|scope| scope.test(value))
    }
}

/// Builder for [`BloomPreFilter`]
///
/// Values must be inserted in their normalized form.
#[derive(Debug, Clone)]
pub struct BloomPreFilterBuilder {
    expected_items: usize,
    false_positive_rate: f64,
    scopes: HashMap<EntityKind, ScopedBloom>,
}

impl BloomPreFilterBuilder {
    /// Create a builder sizing every scope for `expected_items` values
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        Self {
            expected_items,
            false_positive_rate,
            scopes: HashMap::new(),
        }
    }

    /// Create a builder from configuration
    pub fn from_config(config: &FilterListsConfig) -> Self {
        Self::new(config.expected_items, config.false_positive_rate)
    }

    /// Add a normalized value
    pub fn insert(&mut self, kind: EntityKind, value: &str) -> &mut Self {
        let (n, p) = (self.expected_items, self.false_positive_rate);
        self.scopes
            .entry(kind)
            .or_insert_with(|| ScopedBloom::new(n, p))
            .insert(value);
        self
    }

    /// Finish the filter
    pub fn build(self) -> BloomPreFilter {
        BloomPreFilter {
            scopes: self.scopes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing() {
        let bloom = ScopedBloom::new(1000, 0.01);
        // ~9.6 bits per item and 7 hashes for 1%
        assert!(bloom.num_bits >= 9585);
        assert_eq!(bloom.num_bits % 64, 0);
        assert_eq!(bloom.num_hashes, 7);
    }

    #[test]
    fn test_tiny_filter() {
        let bloom = ScopedBloom::new(0, 0.5);
        assert_eq!(bloom.num_bits, 64);
        assert!(bloom.num_hashes >= 1);
    }

    #[test]
    fn test_rate_edge_cases() {
        for rate in [0.0, -1.0, 1.0, 2.0, f64::NAN, f64::INFINITY] {
            let mut builder = BloomPreFilter::builder(10, rate);
            builder.insert(EntityKind::Domain, "a.");
            let filter = builder.build();

            assert!(filter.test(EntityKind::Domain, "a."));
            assert!(filter.size_bytes() <= 1024, "rate {rate} sized {}", filter.size_bytes());
        }
    }

    #[test]
    fn test_size_capped() {
        let bloom = ScopedBloom::new(usize::MAX, 1e-9);
        assert_eq!(bloom.num_bits, MAX_BITS as u64);
        assert_eq!(bloom.bits.len(), MAX_BITS / 64);
    }

    #[test]
    fn test_inserted_values_found() {
        let mut builder = BloomPreFilter::builder(100, 0.01);
        builder
            .insert(EntityKind::Domain, "doubleclick.net.")
            .insert(EntityKind::Ipv4, "1.2.3.4");
        let filter = builder.build();

        assert!(filter.test(EntityKind::Domain, "doubleclick.net."));
        assert!(filter.test(EntityKind::Ipv4, "1.2.3.4"));
        assert_eq!(filter.len(EntityKind::Domain), 1);
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_kinds_are_scoped() {
        let mut builder = BloomPreFilter::builder(100, 0.01);
        builder.insert(EntityKind::Country, "de");
        let filter = builder.build();

        assert!(!filter.test(EntityKind::Asn, "de"));
        assert!(!filter.test(EntityKind::Domain, "de"));
    }

    #[test]
    fn test_empty_filter_rejects() {
        let filter = BloomPreFilter::default();
        assert!(filter.is_empty());
        assert!(!filter.test(EntityKind::Domain, "example.com."));
    }

    #[test]
    fn test_false_positive_rate_is_reasonable() {
        let mut builder = BloomPreFilter::builder(1000, 0.01);
        for i in 0..1000 {
            builder.insert(EntityKind::Domain, &format!("listed-{i}.example."));
        }
        let filter = builder.build();

        let false_positives = (0..10_000)
            .filter(|i| filter.test(EntityKind::Domain, &format!("clean-{i}.example.")))
            .count();
        assert!(false_positives < 500, "too many false positives: {false_positives}");
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_ne!(fnv1a(b"a"), fnv1a(b"b"));
    }
}
