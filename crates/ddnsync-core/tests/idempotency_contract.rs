//! Contract Test: Idempotency
//!
//! This test verifies that repeated runs against an unchanged public
//! address never write to the provider.
//!
//! Constraints verified:
//! - Matching value and TTL produce no provider write
//! - A changed address produces exactly one write carrying the new value and configured TTL
//! - Equivalent textual forms of the same address are not treated as a change
//!
//! If this test fails, the engine is churning the provider API.

mod common;

use common::*;
use ddnsync_core::config::{DomainConfig, RecordType};
use ddnsync_core::traits::AddressFamily;
use ddnsync_core::{AddressResolver, Outcome, SyncEngine};
use std::time::Duration;

fn host_config() -> ddnsync_core::SyncConfig {
    config_for(vec![
        DomainConfig::new("host.example.com", RecordType::A).with_ttl(300),
    ])
}

#[tokio::test]
async fn unchanged_address_is_reported_unchanged() {
    let provider = MockDnsProvider::new();
    provider.publish("host.example.com", RecordType::A, "1.2.3.4", 300);

    let engine = SyncEngine::new(
        resolver_answering("1.2.3.4", "2001:db8::1"),
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &host_config(),
    )
    .expect("engine construction succeeds");

    let result = engine.run_once().await;

    assert_eq!(result.outcomes.len(), 1);
    assert_eq!(
        result.outcomes[0].outcome,
        Outcome::Unchanged {
            value: "1.2.3.4".to_string()
        }
    );
    assert_eq!(provider.write_call_count(), 0);
    assert!(result.is_success());
}

#[tokio::test]
async fn changed_address_is_written_once() {
    let provider = MockDnsProvider::new();
    provider.publish("host.example.com", RecordType::A, "1.2.3.4", 300);

    let engine = SyncEngine::new(
        resolver_answering("5.6.7.8", "2001:db8::1"),
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &host_config(),
    )
    .expect("engine construction succeeds");

    let result = engine.run_once().await;

    assert_eq!(
        result.outcomes[0].outcome,
        Outcome::Updated {
            value: "5.6.7.8".to_string(),
            ttl: 300,
            previous: Some("1.2.3.4".to_string()),
        }
    );
    assert_eq!(provider.write_call_count(), 1);

    let writes = provider.writes();
    assert_eq!(writes[0].0, "host.example.com");
    assert_eq!(writes[0].1.value, "5.6.7.8");
    assert_eq!(writes[0].1.ttl, 300);
    // Existing record is replaced in place, not duplicated
    assert_eq!(writes[0].1.record_id.as_deref(), Some("rec-1"));
}

#[tokio::test]
async fn second_run_after_update_is_noop() {
    let provider = MockDnsProvider::new();
    provider.publish("host.example.com", RecordType::A, "1.2.3.4", 300);

    let engine = SyncEngine::new(
        resolver_answering("5.6.7.8", "2001:db8::1"),
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &host_config(),
    )
    .expect("engine construction succeeds");

    engine.run_once().await;
    for _ in 0..3 {
        let result = engine.run_once().await;
        assert!(matches!(result.outcomes[0].outcome, Outcome::Unchanged { .. }));
    }

    assert_eq!(
        provider.write_call_count(),
        1,
        "Only the first run should write"
    );
}

#[tokio::test]
async fn first_publication_creates_record() {
    let provider = MockDnsProvider::new();

    let engine = SyncEngine::new(
        resolver_answering("198.51.100.4", "2001:db8::1"),
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &host_config(),
    )
    .expect("engine construction succeeds");

    let result = engine.run_once().await;

    assert_eq!(
        result.outcomes[0].outcome,
        Outcome::Updated {
            value: "198.51.100.4".to_string(),
            ttl: 300,
            previous: None,
        }
    );
    assert_eq!(provider.writes()[0].1.record_id, None);
    assert_eq!(
        provider
            .published("host.example.com", RecordType::A)
            .map(|r| r.value),
        Some("198.51.100.4".to_string())
    );
}

#[tokio::test]
async fn ttl_change_alone_triggers_write() {
    let provider = MockDnsProvider::new();
    provider.publish("host.example.com", RecordType::A, "1.2.3.4", 3600);

    let engine = SyncEngine::new(
        resolver_answering("1.2.3.4", "2001:db8::1"),
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &host_config(),
    )
    .expect("engine construction succeeds");

    let result = engine.run_once().await;

    assert!(matches!(
        result.outcomes[0].outcome,
        Outcome::Updated { ttl: 300, .. }
    ));
    assert_eq!(provider.write_call_count(), 1);
}

#[tokio::test]
async fn expanded_ipv6_matches_compressed_answer() {
    let provider = MockDnsProvider::new();
    provider.publish(
        "host.example.com",
        RecordType::Aaaa,
        "2001:0db8:0000:0000:0000:ff00:0042:8329",
        300,
    );

    let config = config_for(vec![
        DomainConfig::new("host.example.com", RecordType::Aaaa).with_ttl(300),
    ]);

    let lookup = ScriptedLookup::answering("v6", "2001:db8::ff00:42:8329\n");
    let resolver =
        AddressResolver::new(Duration::from_millis(200)).with_lookup(AddressFamily::V6, Box::new(lookup));

    let engine = SyncEngine::new(
        resolver,
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &config,
    )
    .expect("engine construction succeeds");

    let result = engine.run_once().await;

    assert!(matches!(result.outcomes[0].outcome, Outcome::Unchanged { .. }));
    assert_eq!(provider.write_call_count(), 0);
}

#[tokio::test]
async fn address_change_between_runs_is_detected() {
    let provider = MockDnsProvider::new();
    provider.publish("host.example.com", RecordType::A, "1.2.3.4", 300);

    let lookup = ScriptedLookup::answering("v4", "1.2.3.4");
    let resolver = AddressResolver::new(Duration::from_millis(200)).with_lookup(
        AddressFamily::V4,
        Box::new(ScriptedLookup::sharing_state_with(&lookup)),
    );

    let engine = SyncEngine::new(
        resolver,
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &host_config(),
    )
    .expect("engine construction succeeds");

    let first = engine.run_once().await;
    assert!(matches!(first.outcomes[0].outcome, Outcome::Unchanged { .. }));

    lookup.set_behavior(LookupBehavior::Answer("5.6.7.8".to_string()));
    let second = engine.run_once().await;
    assert!(matches!(
        &second.outcomes[0].outcome,
        Outcome::Updated { value, .. } if value == "5.6.7.8"
    ));

    // No caching: every run asks the lookup again
    assert_eq!(lookup.call_count(), 2);
    assert_eq!(provider.write_call_count(), 1);
}

#[tokio::test]
async fn dry_run_never_writes() {
    let provider = MockDnsProvider::new();
    provider.publish("host.example.com", RecordType::A, "1.2.3.4", 300);

    let engine = SyncEngine::new(
        resolver_answering("5.6.7.8", "2001:db8::1"),
        Box::new(MockDnsProvider::sharing_counters_with(&provider)),
        &host_config(),
    )
    .expect("engine construction succeeds")
    .with_dry_run(true);

    let result = engine.run_once().await;

    assert!(matches!(result.outcomes[0].outcome, Outcome::Updated { .. }));
    assert_eq!(provider.write_call_count(), 0);
    assert_eq!(
        provider
            .published("host.example.com", RecordType::A)
            .map(|r| r.value),
        Some("1.2.3.4".to_string())
    );
}
