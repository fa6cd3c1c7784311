// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare implementation of `DnsProvider` for
// ddnsync.
//
// ## Behavior
//
// - Stateless: every call talks to the API, nothing is cached between calls
// - Single-shot: no retries or backoff; a failed domain is retried by the
//   next scheduled run
// - Every failure carries a `FailureKind` derived from the HTTP status or
//   the API error envelope
//
// ## Routing ids
//
// Cloudflare allows several records with the same name and type. A domain's
// routing id is stored as the record comment and used as an exact-match
// filter when reading, so each configured domain owns exactly one record.
//
// ## Existing records
//
// Updates are partial (PATCH), so settings managed outside ddnsync such as
// `proxied` or a hand-written comment survive. Proxied records have an
// automatic TTL (reported as 1) that is left alone.
//
// ## Security
//
// - API token NEVER appears in logs or `Debug` output
// - Provider construction fails if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddnsync_core::config::{DomainConfig, ProviderConfig};
use ddnsync_core::error::FailureKind;
use ddnsync_core::traits::{DnsProvider, DnsProviderFactory, PublishedRecord, UpsertRequest};
use ddnsync_core::{Error, ProviderRegistry, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Cloudflare DNS provider
///
/// Holds credentials and an HTTP client; no per-record state.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, discovered from the record name when absent)
    zone_id: Option<String>,

    /// API base URL
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (discovered per record when absent)
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token is empty or the HTTP client
    /// cannot be built.
    pub fn new(api_token: impl Into<String>, zone_id: Option<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the provider at a different API endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Get the zone ID for a record
    ///
    /// Uses the configured zone ID when present. Otherwise asks Cloudflare
    /// for each parent name of the record, longest first, and returns the
    /// first zone found. This handles multi-label suffixes such as
    /// `example.co.uk` without guessing.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn zone_id(&self, fqdn: &str, op: Op) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            return Ok(zone_id.clone());
        }

        for candidate in zone_candidates(fqdn) {
            tracing::debug!("Looking up Cloudflare zone: {}", candidate);

            let request = self
                .client
                .get(format!("{}/zones", self.api_base))
                .query(&[("name", candidate.as_str())]);
            let zones: Vec<Zone> = self.send(op, request).await?;

            if let Some(zone) = zones.into_iter().next() {
                tracing::debug!("Found zone {} ({}) for {}", zone.name, zone.id, fqdn);
                return Ok(zone.id);
            }
        }

        Err(op.error(
            FailureKind::ZoneNotFound,
            format!("No Cloudflare zone found for {}", fqdn),
        ))
    }

    /// Send a request and unwrap the Cloudflare response envelope
    async fn send<T: DeserializeOwned>(&self, op: Op, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| op.error(transport_kind(&e), format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| op.error(transport_kind(&e), format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(op.error(
                classify_status(status),
                format!("{} - {}", status, api_messages(&body)),
            ));
        }

        let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
            op.error(
                FailureKind::Malformed,
                format!("Failed to parse response: {}", e),
            )
        })?;

        if !envelope.success {
            return Err(op.error(
                FailureKind::Validation,
                format!("Request rejected: {}", join_messages(&envelope.errors)),
            ));
        }

        envelope
            .result
            .ok_or_else(|| op.error(FailureKind::Malformed, "Response has no result"))
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Read the record for a domain
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=host.example.com&type=A[&comment.exact=<routing id>]
    /// ```
    async fn fetch_record(&self, domain: &DomainConfig) -> Result<Option<PublishedRecord>> {
        let fqdn = domain.fqdn();
        let zone_id = self.zone_id(&fqdn, Op::Read).await?;

        let mut query = vec![
            ("name", fqdn.clone()),
            ("type", domain.record_type.as_str().to_string()),
        ];
        if let Some(ref routing_id) = domain.routing_id {
            query.push(("comment.exact", routing_id.clone()));
        }

        let request = self
            .client
            .get(format!("{}/zones/{}/dns_records", self.api_base, zone_id))
            .query(&query);
        let records: Vec<DnsRecord> = self.send(Op::Read, request).await?;

        if records.len() > 1 {
            tracing::warn!(
                "{} {} matches {} records; managing the first. Set a routing_id to pick one.",
                fqdn,
                domain.record_type,
                records.len()
            );
        }

        Ok(records
            .into_iter()
            .next()
            .map(|r| {
                let record = PublishedRecord::new(r.content, r.ttl).with_id(r.id);
                if r.proxied {
                    record.with_auto_ttl()
                } else {
                    record
                }
            }))
    }

    /// Create or update the record for a domain
    ///
    /// # API Calls
    ///
    /// ```http
    /// # Record exists
    /// PATCH /zones/:zone_id/dns_records/:record_id
    ///
    /// # First publication
    /// POST /zones/:zone_id/dns_records
    ///
    /// { "type": "A", "name": "host.example.com", "content": "1.2.3.4", "ttl": 300, "comment": "..." }
    /// ```
    async fn upsert_record(&self, domain: &DomainConfig, change: &UpsertRequest) -> Result<()> {
        let fqdn = domain.fqdn();
        let zone_id = self.zone_id(&fqdn, Op::Write).await?;

        let body = RecordBody {
            record_type: domain.record_type.as_str(),
            name: &fqdn,
            content: &change.value,
            ttl: change.ttl,
            comment: domain.routing_id.as_deref(),
        };

        let records_url = format!("{}/zones/{}/dns_records", self.api_base, zone_id);
        let request = match change.record_id {
            Some(ref record_id) => self
                .client
                .patch(format!("{}/{}", records_url, record_id))
                .json(&body),
            None => self.client.post(records_url).json(&body),
        };

        let record: DnsRecord = self.send(Op::Write, request).await?;
        tracing::debug!(
            "Cloudflare record {} now {} (ttl {})",
            record.id,
            record.content,
            record.ttl
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Which side of the provider a failure belongs to
#[derive(Debug, Clone, Copy)]
enum Op {
    Read,
    Write,
}

impl Op {
    fn error(self, kind: FailureKind, message: impl Into<String>) -> Error {
        match self {
            Op::Read => Error::read(PROVIDER, kind, message),
            Op::Write => Error::write(PROVIDER, kind, message),
        }
    }
}

/// Map an HTTP error status to a failure kind
fn classify_status(status: StatusCode) -> FailureKind {
    match status.as_u16() {
        401 | 403 => FailureKind::Authentication,
        404 => FailureKind::ZoneNotFound,
        400 | 422 => FailureKind::Validation,
        409 => FailureKind::Conflict,
        429 => FailureKind::RateLimited,
        500..=599 => FailureKind::Server,
        _ => FailureKind::Malformed,
    }
}

fn transport_kind(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Transport
    }
}

/// Parent names of `fqdn` that could be a zone apex, longest first
fn zone_candidates(fqdn: &str) -> Vec<String> {
    let labels: Vec<&str> = fqdn.split('.').filter(|l| !l.is_empty()).collect();
    (0..labels.len().saturating_sub(1))
        .map(|i| labels[i..].join("."))
        .collect()
}

/// Error messages from an error response body, or the raw body
fn api_messages(body: &str) -> String {
    match serde_json::from_str::<ApiResponse<serde_json::Value>>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => join_messages(&envelope.errors),
        _ => body.chars().take(200).collect(),
    }
}

fn join_messages(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    content: String,
    ttl: u32,
    #[serde(default)]
    proxied: bool,
}

#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token, zone_id, ..
            } => {
                let Some(api_token) = api_token else {
                    return Err(Error::config(
                        "Cloudflare API token is required (api_token or api_token_file)",
                    ));
                };
                Ok(Box::new(CloudflareProvider::new(
                    api_token.clone(),
                    zone_id.clone(),
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use ddnsync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// ddnsync_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_provider(PROVIDER, Box::new(CloudflareFactory));
}
