//! Test doubles and common utilities for contract tests
//!
//! This module provides minimal test doubles that record how the engine
//! uses its collaborators without touching the network.

#![allow(dead_code)]

use ddnsync_core::config::{DomainConfig, ProviderConfig, RecordType, SyncConfig};
use ddnsync_core::error::{Error, FailureKind, Result};
use ddnsync_core::traits::{
    AddressFamily, AddressLookup, DnsProvider, PublishedRecord, UpsertRequest,
};
use ddnsync_core::AddressResolver;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted lookup does when called
#[derive(Debug, Clone)]
pub enum LookupBehavior {
    /// Return this body
    Answer(String),
    /// Fail immediately
    Fail,
    /// Never answer (exercises the resolver timeout)
    Hang,
}

/// An AddressLookup whose behavior the test controls
pub struct ScriptedLookup {
    name: String,
    behavior: Arc<Mutex<LookupBehavior>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedLookup {
    pub fn new(name: &str, behavior: LookupBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior: Arc::new(Mutex::new(behavior)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn answering(name: &str, body: &str) -> Self {
        Self::new(name, LookupBehavior::Answer(body.to_string()))
    }

    /// Create a lookup that shares behavior and counters with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            name: other.name.clone(),
            behavior: Arc::clone(&other.behavior),
            call_count: Arc::clone(&other.call_count),
        }
    }

    /// Change what subsequent calls return
    pub fn set_behavior(&self, behavior: LookupBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    /// Get the number of times lookup() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressLookup for ScriptedLookup {
    async fn lookup(&self) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            LookupBehavior::Answer(body) => Ok(body),
            LookupBehavior::Fail => Err(Error::lookup("HTTP error: 503 Service Unavailable")),
            LookupBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// An in-memory DnsProvider that tracks calls and can inject failures
pub struct MockDnsProvider {
    /// Published records keyed by (lowercase name, type)
    records: Arc<Mutex<HashMap<(String, RecordType), PublishedRecord>>>,
    /// Every accepted write, in order
    writes: Arc<Mutex<Vec<(String, UpsertRequest)>>>,
    /// Call counter for fetch_record()
    fetch_call_count: Arc<AtomicUsize>,
    /// Call counter for upsert_record()
    write_call_count: Arc<AtomicUsize>,
    /// Names whose writes are rejected
    failing_writes: Arc<Mutex<HashSet<String>>>,
    /// Names whose reads fail
    failing_reads: Arc<Mutex<HashSet<String>>>,
    /// Artificial latency per call
    delay: Arc<Mutex<Option<Duration>>>,
    /// Calls currently in progress and the maximum ever observed
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            write_call_count: Arc::new(AtomicUsize::new(0)),
            failing_writes: Arc::new(Mutex::new(HashSet::new())),
            failing_reads: Arc::new(Mutex::new(HashSet::new())),
            delay: Arc::new(Mutex::new(None)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Create a new MockDnsProvider that shares state and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            writes: Arc::clone(&other.writes),
            fetch_call_count: Arc::clone(&other.fetch_call_count),
            write_call_count: Arc::clone(&other.write_call_count),
            failing_writes: Arc::clone(&other.failing_writes),
            failing_reads: Arc::clone(&other.failing_reads),
            delay: Arc::clone(&other.delay),
            in_flight: Arc::clone(&other.in_flight),
            max_in_flight: Arc::clone(&other.max_in_flight),
            next_id: Arc::clone(&other.next_id),
        }
    }

    /// Seed a published record
    pub fn publish(&self, name: &str, record_type: RecordType, value: &str, ttl: u32) {
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().insert(
            (name.to_ascii_lowercase(), record_type),
            PublishedRecord::new(value, ttl).with_id(id),
        );
    }

    /// Current published record
    pub fn published(&self, name: &str, record_type: RecordType) -> Option<PublishedRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(name.to_ascii_lowercase(), record_type))
            .cloned()
    }

    pub fn fail_writes_for(&self, name: &str) {
        self.failing_writes.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_reads_for(&self, name: &str) {
        self.failing_reads.lock().unwrap().insert(name.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Get the number of times fetch_record() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times upsert_record() was called
    pub fn write_call_count(&self) -> usize {
        self.write_call_count.load(Ordering::SeqCst)
    }

    /// Accepted writes, in order
    pub fn writes(&self) -> Vec<(String, UpsertRequest)> {
        self.writes.lock().unwrap().clone()
    }

    /// Highest number of provider calls ever in progress at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn fetch_record(&self, domain: &DomainConfig) -> Result<Option<PublishedRecord>> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter().await;

        let result = if self.failing_reads.lock().unwrap().contains(&domain.name) {
            Err(Error::read(
                "mock",
                FailureKind::Authentication,
                "token lacks Zone:Read",
            ))
        } else {
            Ok(self.published(&domain.fqdn(), domain.record_type))
        };

        self.leave();
        result
    }

    async fn upsert_record(&self, domain: &DomainConfig, change: &UpsertRequest) -> Result<()> {
        self.write_call_count.fetch_add(1, Ordering::SeqCst);
        self.enter().await;

        let result = if self.failing_writes.lock().unwrap().contains(&domain.name) {
            Err(Error::write(
                "mock",
                FailureKind::Validation,
                "content rejected",
            ))
        } else {
            let id = change.record_id.clone().unwrap_or_else(|| {
                format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
            });
            self.records.lock().unwrap().insert(
                (domain.fqdn(), domain.record_type),
                PublishedRecord::new(change.value.clone(), change.ttl).with_id(id),
            );
            self.writes
                .lock()
                .unwrap()
                .push((domain.name.clone(), change.clone()));
            Ok(())
        };

        self.leave();
        result
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a SyncConfig for the given domains
pub fn config_for(domains: Vec<DomainConfig>) -> SyncConfig {
    let mut config = SyncConfig::new(ProviderConfig::cloudflare("test-token", None));
    config.domains = domains;
    config
}

/// Resolver with one answering lookup per family
pub fn resolver_answering(v4: &str, v6: &str) -> AddressResolver {
    AddressResolver::new(Duration::from_millis(200))
        .with_lookup(AddressFamily::V4, Box::new(ScriptedLookup::answering("v4", v4)))
        .with_lookup(AddressFamily::V6, Box::new(ScriptedLookup::answering("v6", v6)))
}
