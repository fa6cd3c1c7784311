// # HTTP Address Lookup
//
// This crate asks plain-text "what is my IP" services for the caller's
// public address.
//
// ## Behavior
//
// - One GET per lookup, no caching: every run sees a fresh answer
// - Any non-2xx status or transport error is a lookup failure
// - The body is returned untouched; the core resolver trims, parses and
//   checks the family, then falls back to the next service if needed
//
// Services are expected to answer with nothing but the address, e.g.
// `https://api.ipify.org` or `https://ipv6.icanhazip.com`.

use ddnsync_core::config::LookupConfig;
use ddnsync_core::traits::{AddressFamily, AddressLookup};
use ddnsync_core::{AddressResolver, Error, Result};

use std::time::Duration;

/// Default per-request timeout when none is configured
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Address lookup against a single HTTP(S) endpoint
pub struct HttpAddressLookup {
    /// URL returning the caller's address as plain text
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressLookup {
    /// Create a lookup for `url` with the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a lookup for `url` whose requests give up after `timeout`
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn lookup(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::lookup(format!("Request to {} timed out", self.url))
                } else {
                    Error::lookup(format!("Request to {} failed: {}", self.url, e))
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::lookup(format!(
                "HTTP error from {}: {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::lookup(format!("Failed to read response: {}", e)))?;

        tracing::trace!("{} answered {:?}", self.url, body);
        Ok(body)
    }

    fn name(&self) -> &str {
        &self.url
    }
}

/// Build the ordered lookups for one family from configuration
///
/// Falls back to the built-in services when the family has no URLs
/// configured.
pub fn lookups_for(config: &LookupConfig, family: AddressFamily) -> Vec<Box<dyn AddressLookup>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    config
        .urls_for(family)
        .into_iter()
        .map(|url| Box::new(HttpAddressLookup::with_timeout(url, timeout)) as Box<dyn AddressLookup>)
        .collect()
}

/// Build a resolver covering both families from configuration
pub fn resolver_from_config(config: &LookupConfig) -> AddressResolver {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut resolver = AddressResolver::new(timeout);
    for family in [AddressFamily::V4, AddressFamily::V6] {
        resolver = resolver.with_lookups(family, lookups_for(config, family));
    }
    resolver
}
