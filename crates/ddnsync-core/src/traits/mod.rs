//! Core traits for ddnsync
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressLookup`]: Report the caller's public address as seen by an external service
//! - [`DnsProvider`]: Read and upsert DNS records via provider APIs

pub mod address_lookup;
pub mod dns_provider;

pub use address_lookup::{AddressFamily, AddressLookup};
pub use dns_provider::{DnsProvider, DnsProviderFactory, PublishedRecord, UpsertRequest};
