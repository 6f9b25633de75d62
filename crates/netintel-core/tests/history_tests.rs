//! Integration tests for the resolved-domain history

use netintel_core::config::StoreConfig;
use netintel_core::resolver::{
    get_ip_info, make_ip_info_key, IpInfo, IpInfoTracker, ResolvedDomain,
    IPINFO_PROFILE_SCOPE_GLOBAL,
};
use netintel_core::Error;
use netintel_store::{unix_now, Encoding, Meta, MemoryStore, RecordStore, StoredRecord, Wrapper};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn rd(domain: &str, expires: i64) -> ResolvedDomain {
    ResolvedDomain::new(domain, Vec::new(), expires)
}

const DAY: i64 = 86_400;
const HOUR: i64 = 3_600;

// ============ History Tests ============

#[test]
fn test_readd_moves_domain_to_end() {
    let (t1, t2, t3) = (1_000, 2_000, 3_000);
    let info = IpInfo::new("global", "93.184.216.34");

    info.add_domain(rd("a.com", t1));
    info.add_domain(rd("b.com", t2));
    info.add_domain(rd("a.com", t3));

    let domains: Vec<String> = info
        .resolved_domains()
        .iter()
        .map(|d| d.domain.clone())
        .collect();
    assert_eq!(domains, ["b.com", "a.com"]);
    assert_eq!(info.most_recent_domain(), Some(rd("a.com", t3)));
}

#[test]
fn test_cname_chain_kept() {
    let info = IpInfo::new("global", "151.101.1.69");
    info.add_domain(ResolvedDomain::new(
        "www.example.org.",
        vec!["example.map.fastly.net.".to_string()],
        0,
    ));

    let recent = info.most_recent_domain().unwrap();
    assert_eq!(recent.cnames, ["example.map.fastly.net."]);
}

#[test]
fn test_concurrent_adds_keep_unique_domains() {
    let info = Arc::new(IpInfo::new("global", "10.0.0.1"));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let info = Arc::clone(&info);
            thread::spawn(move || {
                for i in 0..100 {
                    info.add_domain(rd(&format!("d{}.com", i % 10), t * 1000 + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let domains = info.resolved_domains();
    assert_eq!(domains.len(), 10);
    let mut names: Vec<&str> = domains.iter().map(|d| d.domain.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), 10);
}

// ============ Save / Expiry Tests ============

#[test]
fn test_save_assigns_global_key() {
    let store = MemoryStore::new();
    let info = IpInfo::new("", "1.2.3.4");
    assert!(info.key().is_none());

    info.save(&store).unwrap();

    assert_eq!(info.profile_id(), IPINFO_PROFILE_SCOPE_GLOBAL);
    assert_eq!(
        info.key().as_deref(),
        Some("cache:intel/ipInfo/global/1.2.3.4")
    );
    assert!(store.get("cache:intel/ipInfo/global/1.2.3.4").is_ok());
}

#[test]
fn test_key_assigned_once() {
    let store = MemoryStore::new();
    let info = IpInfo::new("profile-a", "1.2.3.4");
    info.save(&store).unwrap();
    info.save(&store).unwrap();

    assert_eq!(
        info.key().as_deref(),
        Some("cache:intel/ipInfo/profile-a/1.2.3.4")
    );
    assert_eq!(store.len(), 1);
}

#[test]
fn test_ttl_floor() {
    let store = MemoryStore::new();
    let info = IpInfo::new("global", "1.2.3.4");
    info.add_domain(rd("short.ttl.", unix_now() + 30));

    let before = unix_now();
    info.save(&store).unwrap();

    assert!(info.expires() >= before + DAY + HOUR);
}

#[test]
fn test_ttl_floor_without_domains() {
    let store = MemoryStore::new();
    let info = IpInfo::new("global", "1.2.3.4");
    let now = 1_700_000_000;

    info.save_at(&store, now).unwrap();
    assert_eq!(info.expires(), now + DAY + HOUR);
}

#[test]
fn test_ttl_follows_longest_answer() {
    let store = MemoryStore::new();
    let now = 1_700_000_000;
    let info = IpInfo::new("global", "1.2.3.4");
    info.add_domain(rd("a.com", now + 100));
    info.add_domain(rd("b.com", now + 200_000));

    info.save_at(&store, now).unwrap();

    assert_eq!(info.expires(), now + 200_000 + HOUR);
}

#[test]
fn test_save_touches_meta() {
    let store = MemoryStore::new();
    let info = IpInfo::new("global", "1.2.3.4");
    info.save_at(&store, 100).unwrap();
    info.save_at(&store, 200).unwrap();

    let meta = info.meta();
    assert_eq!(meta.created, 100);
    assert_eq!(meta.modified, 200);
}

#[test]
fn test_save_propagates_store_errors() {
    let store = MemoryStore::new();
    store.set_offline(true);

    let info = IpInfo::new("global", "1.2.3.4");
    assert!(matches!(info.save(&store), Err(Error::Store(_))));
}

// ============ Load Tests ============

#[test]
fn test_load_typed_record() {
    let store = MemoryStore::new();
    let info = IpInfo::new("global", "2001:db8::1");
    info.add_domain(rd("v6.example.", unix_now() + 60));
    info.save(&store).unwrap();

    let loaded = get_ip_info(&store, "global", "2001:db8::1").unwrap();
    assert_eq!(loaded.ip(), "2001:db8::1");
    assert_eq!(loaded.resolved_domains(), info.resolved_domains());
    assert_eq!(loaded.key(), info.key());
    assert_eq!(loaded.expires(), info.expires());
}

#[test]
fn test_load_wrapped_record() {
    let store = MemoryStore::with_encoding(Encoding::Wrapped);
    let info = IpInfo::new("browser", "8.8.8.8");
    info.add_domain(ResolvedDomain::new(
        "dns.google.",
        vec!["google-public-dns.l.google.com.".to_string()],
        unix_now() + 300,
    ));
    info.save(&store).unwrap();

    assert!(store.get(&make_ip_info_key("browser", "8.8.8.8")).unwrap().is_wrapped());

    let loaded = IpInfo::load(&store, "browser", "8.8.8.8").unwrap();
    assert_eq!(loaded.profile_id(), "browser");
    assert_eq!(loaded.resolved_domains(), info.resolved_domains());
    assert_eq!(loaded.expires(), info.expires());
    assert_eq!(
        loaded.to_string(),
        "<IPInfo[cache:intel/ipInfo/browser/8.8.8.8] 8.8.8.8: dns.google. (-> google-public-dns.l.google.com.)>"
    );
}

#[test]
fn test_loaded_record_keeps_key() {
    let store = MemoryStore::new();
    IpInfo::new("global", "1.2.3.4").save(&store).unwrap();

    let loaded = IpInfo::load(&store, "global", "1.2.3.4").unwrap();
    loaded.add_domain(rd("later.example.", 0));
    loaded.save(&store).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn test_load_missing() {
    let store = MemoryStore::new();
    let err = IpInfo::load(&store, "global", "192.0.2.1").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_load_wrong_payload() {
    let store = MemoryStore::new();
    let key = make_ip_info_key("global", "192.0.2.1");
    store
        .put(StoredRecord::Wrapped(Wrapper::new(
            key,
            Meta::default(),
            b"[1, 2, 3]".to_vec(),
        )))
        .unwrap();

    let err = IpInfo::load(&store, "global", "192.0.2.1").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_load_wrong_type() {
    use netintel_core::filterlists::BlockListEntry;

    let store = MemoryStore::new();
    let key = make_ip_info_key("global", "192.0.2.2");
    store
        .put(StoredRecord::typed(BlockListEntry::new(key, ["X"])))
        .unwrap();

    let err = IpInfo::load(&store, "global", "192.0.2.2").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

// ============ Tracker Tests ============

#[test]
fn test_concurrent_records_keep_every_domain() {
    let tracker = Arc::new(IpInfoTracker::new(MemoryStore::new()));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let tracker = Arc::clone(&tracker);
            thread::spawn(move || {
                for i in 0..50 {
                    tracker
                        .record("global", "10.9.9.9", rd(&format!("t{t}-d{i}.example."), 0))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let info = tracker.get("global", "10.9.9.9").unwrap();
    assert_eq!(info.resolved_domains().len(), 400);
}

#[test]
fn test_unscoped_records_extend_one_history() {
    let tracker = IpInfoTracker::new(MemoryStore::new());
    tracker.record("", "1.2.3.4", rd("a.com.", 0)).unwrap();
    tracker.record("", "1.2.3.4", rd("b.com.", 0)).unwrap();

    let info = get_ip_info(tracker.store(), IPINFO_PROFILE_SCOPE_GLOBAL, "1.2.3.4").unwrap();
    let domains: Vec<String> = info
        .resolved_domains()
        .iter()
        .map(|d| d.domain.clone())
        .collect();
    assert_eq!(domains, ["a.com.", "b.com."]);
}

#[test]
fn test_history_survives_cache_eviction() {
    let config = StoreConfig {
        cache_size: 2,
        delay_writes: true,
        write_batch_size: 64,
    };
    let tracker = IpInfoTracker::with_cache(MemoryStore::new(), &config);

    tracker.record("global", "10.0.0.1", rd("a.com.", 0)).unwrap();
    tracker.record("global", "10.0.0.2", rd("x.com.", 0)).unwrap();
    tracker.record("global", "10.0.0.3", rd("y.com.", 0)).unwrap();
    assert!(tracker.store().backend().is_empty());

    assert!(tracker.get("global", "10.0.0.1").is_ok());
    let info = tracker.record("global", "10.0.0.1", rd("b.com.", 0)).unwrap();
    assert_eq!(info.resolved_domains().len(), 2);
}

// ============ Properties ============

proptest! {
    #[test]
    fn prop_history_dedup(ops in prop::collection::vec((0usize..6, 0i64..1_000_000), 0..60)) {
        let info = IpInfo::new("global", "10.1.1.1");
        for (idx, expires) in &ops {
            info.add_domain(rd(&format!("d{idx}.example."), *expires));
        }

        // expected: last occurrence of each domain, ordered by that occurrence
        let mut expected: Vec<(String, i64)> = Vec::new();
        for (idx, expires) in &ops {
            let name = format!("d{idx}.example.");
            expected.retain(|(d, _)| *d != name);
            expected.push((name, *expires));
        }

        let actual: Vec<(String, i64)> = info
            .resolved_domains()
            .iter()
            .map(|d| (d.domain.clone(), d.expires))
            .collect();
        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(
            info.most_recent_domain().map(|d| (d.domain, d.expires)),
            expected.last().cloned()
        );
    }

    #[test]
    fn prop_expiry_never_below_floor(
        now in 0i64..2_000_000_000,
        offsets in prop::collection::vec(-1_000_000i64..1_000_000, 0..10),
    ) {
        let store = MemoryStore::new();
        let info = IpInfo::new("global", "10.2.2.2");
        for (i, offset) in offsets.iter().enumerate() {
            info.add_domain(rd(&format!("d{i}."), now + offset));
        }
        info.save_at(&store, now).unwrap();

        let longest = offsets.iter().map(|o| now + o).max().unwrap_or(i64::MIN);
        prop_assert!(info.expires() >= now + DAY + HOUR);
        prop_assert_eq!(info.expires(), longest.max(now + DAY) + HOUR);
    }
}
