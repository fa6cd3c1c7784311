//! Desired-vs-published comparison
//!
//! [`plan`] is pure and total: it never performs I/O and never fails. Values
//! are compared as strings after both sides are brought to the canonical
//! textual form of their address, so `2001:0db8:0000::0001` and `2001:db8::1`
//! are the same value and do not cause churn.

use crate::config::DomainConfig;
use crate::resolver::ResolvedAddress;
use crate::traits::{PublishedRecord, UpsertRequest};
use std::net::IpAddr;

/// Decision for one domain in one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePlan {
    /// Published value and TTL already match
    NoOp {
        /// The matching value
        value: String,
    },
    /// Record must be created or replaced
    Upsert {
        /// Payload for the writer
        change: UpsertRequest,
        /// Published value being replaced, if any
        previous: Option<String>,
    },
}

impl ChangePlan {
    /// Whether the plan requires a provider write
    pub fn is_noop(&self) -> bool {
        matches!(self, ChangePlan::NoOp { .. })
    }
}

/// Canonical text of a record value
///
/// Values that are not addresses are returned trimmed but otherwise as-is,
/// so they never compare equal to a resolved address.
pub fn normalize(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => normalize_lenient(trimmed).unwrap_or_else(|| trimmed.to_string()),
    }
}

// Providers occasionally echo IPv4 octets with leading zeros, which the
// strict parser refuses.
fn normalize_lenient(value: &str) -> Option<String> {
    let octets: Vec<&str> = value.split('.').collect();
    if octets.len() != 4 {
        return None;
    }
    let mut parsed = [0u8; 4];
    for (slot, octet) in parsed.iter_mut().zip(&octets) {
        if octet.is_empty() || octet.len() > 3 || !octet.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = octet.parse().ok()?;
    }
    Some(IpAddr::from(parsed).to_string())
}

/// Compute the change plan for one domain
pub fn plan(
    domain: &DomainConfig,
    resolved: &ResolvedAddress,
    published: Option<&PublishedRecord>,
) -> ChangePlan {
    let desired = resolved.value();

    match published {
        Some(record)
            if normalize(&record.value) == desired && record.ttl == target_ttl(domain, record) =>
        {
            ChangePlan::NoOp { value: desired }
        }
        Some(record) => ChangePlan::Upsert {
            change: UpsertRequest {
                value: desired,
                ttl: target_ttl(domain, record),
                record_id: record.id.clone(),
            },
            previous: Some(record.value.clone()),
        },
        None => ChangePlan::Upsert {
            change: UpsertRequest::create(desired, domain.ttl),
            previous: None,
        },
    }
}

// A provider-managed TTL is kept as published.
fn target_ttl(domain: &DomainConfig, record: &PublishedRecord) -> u32 {
    if record.auto_ttl {
        record.ttl
    } else {
        domain.ttl
    }
}
