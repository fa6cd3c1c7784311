// # Address Lookup Trait
//
// Defines the interface for discovering the caller's public address.
//
// ## Implementations
//
// - HTTP "what is my IP" services: `ddnsync-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddnsync_core::AddressLookup;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let lookup = /* AddressLookup implementation */;
//
//     // Raw answer; the resolver validates it against the family
//     let body = lookup.lookup().await?;
//     println!("{} says {}", lookup.name(), body);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;

/// IP address family (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family of an already-parsed address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// Whether `ip` belongs to this family
    pub fn matches(self, ip: &IpAddr) -> bool {
        Self::of(ip) == self
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for public address lookup services
///
/// A lookup is bound to one service endpoint (and therefore to one address
/// family). It performs a single request and returns the raw textual answer.
///
/// # Responsibilities
///
/// - ✅ One outbound request per call
/// - ✅ Report transport and status failures as errors
/// - ❌ No retries or fallback (owned by `AddressResolver`)
/// - ❌ No caching across calls; every run must observe the live address
/// - ❌ No address validation (owned by `AddressResolver`)
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Fetch the caller's address as text
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The service's answer, untrimmed and unvalidated
    /// - `Err(Error)`: Transport failure or non-success status
    async fn lookup(&self) -> Result<String, crate::Error>;

    /// Identifier for logs (typically the URL)
    fn name(&self) -> &str;
}
