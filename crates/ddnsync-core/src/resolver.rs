//! Public address resolution with ordered fallback
//!
//! The resolver holds one ordered list of [`AddressLookup`]s per address
//! family. A lookup that fails in any way (transport error, timeout, bad
//! status, unparsable or wrong-family answer) is a soft failure: it is logged
//! and the next lookup is tried. Only when the whole list is exhausted does
//! resolution fail with [`Error::AddressUnavailable`].

use crate::error::{Error, Result};
use crate::traits::{AddressFamily, AddressLookup};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Public address captured for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    /// Address family
    pub family: AddressFamily,
    /// The address itself
    pub address: IpAddr,
    /// Lookup that produced it
    pub source: String,
}

impl ResolvedAddress {
    /// Canonical textual form used for record values
    pub fn value(&self) -> String {
        self.address.to_string()
    }
}

/// Resolves the public address of each family through ordered lookups
pub struct AddressResolver {
    v4: Vec<Box<dyn AddressLookup>>,
    v6: Vec<Box<dyn AddressLookup>>,
    timeout: Duration,
}

impl AddressResolver {
    /// Create a resolver with no lookups; `timeout` bounds each single lookup
    pub fn new(timeout: Duration) -> Self {
        Self {
            v4: Vec::new(),
            v6: Vec::new(),
            timeout,
        }
    }

    /// Append a lookup to the end of a family's list
    pub fn with_lookup(mut self, family: AddressFamily, lookup: Box<dyn AddressLookup>) -> Self {
        self.list_mut(family).push(lookup);
        self
    }

    /// Append several lookups, preserving their order
    pub fn with_lookups(
        mut self,
        family: AddressFamily,
        lookups: impl IntoIterator<Item = Box<dyn AddressLookup>>,
    ) -> Self {
        self.list_mut(family).extend(lookups);
        self
    }

    /// Lookups configured for a family
    pub fn lookups(&self, family: AddressFamily) -> &[Box<dyn AddressLookup>] {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }

    fn list_mut(&mut self, family: AddressFamily) -> &mut Vec<Box<dyn AddressLookup>> {
        match family {
            AddressFamily::V4 => &mut self.v4,
            AddressFamily::V6 => &mut self.v6,
        }
    }

    /// Resolve the current public address of `family`
    ///
    /// Every call performs fresh lookups.
    pub async fn resolve(&self, family: AddressFamily) -> Result<ResolvedAddress> {
        let lookups = self.lookups(family);

        for lookup in lookups {
            match self.try_lookup(lookup.as_ref(), family).await {
                Ok(address) => {
                    debug!("Resolved {} address {} via {}", family, address, lookup.name());
                    return Ok(ResolvedAddress {
                        family,
                        address,
                        source: lookup.name().to_string(),
                    });
                }
                Err(e) => {
                    warn!("{} lookup via {} failed: {}", family, lookup.name(), e);
                }
            }
        }

        Err(Error::AddressUnavailable {
            family,
            attempts: lookups.len(),
        })
    }

    async fn try_lookup(&self, lookup: &dyn AddressLookup, family: AddressFamily) -> Result<IpAddr> {
        let body = tokio::time::timeout(self.timeout, lookup.lookup())
            .await
            .map_err(|_| Error::lookup(format!("timed out after {:?}", self.timeout)))??;

        parse_address(&body, family)
    }
}

/// Validate a lookup answer against the requested family
pub fn parse_address(body: &str, family: AddressFamily) -> Result<IpAddr> {
    let text = body.trim();

    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::lookup(format!("Invalid IP address: {:?}", truncate(text))))?;

    if !family.matches(&ip) {
        return Err(Error::lookup(format!("Expected {}, got: {}", family, ip)));
    }

    // ::ffff:a.b.c.d is an IPv4 answer in IPv6 clothing
    if let IpAddr::V6(v6) = ip
        && let Some(v4) = v6.to_ipv4_mapped()
    {
        return Err(Error::lookup(format!(
            "Expected {}, got IPv4-mapped address: {} ({})",
            family, ip, v4
        )));
    }

    Ok(ip)
}

// Keeps an HTML error page from flooding the log line
fn truncate(text: &str) -> &str {
    match text.char_indices().nth(64) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
