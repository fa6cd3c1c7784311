// # DNS Provider Trait
//
// Defines the interface for reading and upserting DNS records via provider APIs.
//
// ## Implementations
//
// - Cloudflare: `ddnsync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddnsync_core::{DnsProvider, DomainConfig, RecordType, UpsertRequest};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let domain = DomainConfig::new("host.example.com", RecordType::A);
//
//     match provider.fetch_record(&domain).await? {
//         Some(record) => println!("published: {} (ttl {})", record.value, record.ttl),
//         None => println!("not published yet"),
//     }
//
//     provider
//         .upsert_record(&domain, &UpsertRequest::create("203.0.113.7", 300))
//         .await?;
//
//     Ok(())
// }
// ```

use crate::config::{DomainConfig, ProviderConfig};
use async_trait::async_trait;

/// Record currently published by the provider for a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedRecord {
    /// Provider handle for the record, if the provider uses one
    pub id: Option<String>,
    /// Record value as returned by the provider
    pub value: String,
    /// Published time-to-live
    pub ttl: u32,
    /// The provider manages the TTL itself and ignores configured values
    pub auto_ttl: bool,
}

impl PublishedRecord {
    /// Create a record snapshot
    pub fn new(value: impl Into<String>, ttl: u32) -> Self {
        Self {
            id: None,
            value: value.into(),
            ttl,
            auto_ttl: false,
        }
    }

    /// Attach the provider handle
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the published TTL as provider-managed
    pub fn with_auto_ttl(mut self) -> Self {
        self.auto_ttl = true;
        self
    }
}

/// Create-or-replace payload for a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertRequest {
    /// New record value (normalized address text)
    pub value: String,
    /// New time-to-live
    pub ttl: u32,
    /// Handle of the record being replaced; `None` creates a new record
    pub record_id: Option<String>,
}

impl UpsertRequest {
    /// Payload for a record that does not exist yet
    pub fn create(value: impl Into<String>, ttl: u32) -> Self {
        Self {
            value: value.into(),
            ttl,
            record_id: None,
        }
    }
}

/// Trait for DNS provider implementations
///
/// Implementations handle the specifics of one provider's API. Both
/// operations are scoped to the zone holding the given domain.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Responsibilities
///
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Tag failures with a [`FailureKind`](crate::FailureKind)
/// - ❌ No retry logic or backoff (recovery is the next scheduled run)
/// - ❌ No decision about whether an update is needed (owned by the reconciler)
/// - ❌ No background tasks
/// - ❌ No caching of record state between calls
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch the published record matching the domain's name and type
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: The record exists
    /// - `Ok(None)`: No such record yet (first publication)
    /// - `Err(Error::ProviderRead { .. })`: Transport or provider failure
    async fn fetch_record(
        &self,
        domain: &DomainConfig,
    ) -> Result<Option<PublishedRecord>, crate::Error>;

    /// Create or replace the domain's record in a single request
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider accepted the change
    /// - `Err(Error::ProviderWrite { .. })`: The provider rejected it or was unreachable
    async fn upsert_record(
        &self,
        domain: &DomainConfig,
        change: &UpsertRequest,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
