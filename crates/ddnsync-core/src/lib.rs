// # ddnsync-core
//
// Core library for scheduled dynamic DNS synchronization.
//
// ## Architecture Overview
//
// This library keeps DNS records pointed at the machine's public address:
// - **AddressLookup**: Trait for asking an external service for our public address
// - **AddressResolver**: Ordered fallback across lookups, one answer per family per run
// - **DnsProvider**: Trait for reading and upserting records via provider APIs
// - **reconcile**: Pure desired-vs-published comparison producing a ChangePlan
// - **ZoneReader / ZoneWriter**: Timeout-bounded provider reads and writes
// - **SyncEngine**: Runs one pass over every configured domain, once or on a schedule
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and lookup implementations
// 2. **Idempotency**: Unchanged address and TTL never produce a provider write
// 3. **Isolation**: One domain's failure never stops the others
// 4. **No Overlap**: At most one run in flight per engine
// 5. **Library-First**: The daemon is a thin layer over this crate

pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod schedule;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{DomainConfig, LookupConfig, ProviderConfig, RecordType, SyncConfig};
pub use engine::SyncEngine;
pub use error::{Error, FailureKind, Result};
pub use reconcile::ChangePlan;
pub use registry::ProviderRegistry;
pub use report::{DomainOutcome, FailureCause, Outcome, RunResult};
pub use resolver::{AddressResolver, ResolvedAddress};
pub use schedule::{RunMode, Schedule};
pub use traits::{AddressFamily, AddressLookup, DnsProvider, PublishedRecord, UpsertRequest};
