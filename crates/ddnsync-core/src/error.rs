//! Error types for ddnsync
//!
//! This module defines all error types used throughout the crate.

use crate::traits::AddressFamily;
use std::fmt;
use thiserror::Error;

/// Result type alias for ddnsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Provider-side failure category attached to read and write errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Credentials rejected or insufficient permissions
    Authentication,
    /// The zone does not exist or is not visible to the credentials
    ZoneNotFound,
    /// Provider throttled the request
    RateLimited,
    /// Provider rejected the payload
    Validation,
    /// Concurrent modification on the provider side
    Conflict,
    /// Provider-side 5xx
    Server,
    /// Connection-level failure
    Transport,
    /// No answer within the configured timeout
    Timeout,
    /// Response could not be understood
    Malformed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Authentication => "authentication",
            FailureKind::ZoneNotFound => "zone not found",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Validation => "validation",
            FailureKind::Conflict => "conflict",
            FailureKind::Server => "server error",
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::Malformed => "malformed response",
        };
        f.write_str(s)
    }
}

/// Core error type for ddnsync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every lookup provider failed for an address family
    #[error("No public {family} address available ({attempts} lookup provider(s) failed)")]
    AddressUnavailable {
        /// Family that could not be resolved
        family: AddressFamily,
        /// Number of providers tried
        attempts: usize,
    },

    /// A single lookup provider failed
    #[error("Address lookup failed: {0}")]
    Lookup(String),

    /// Reading the published record failed
    #[error("Provider read error ({provider}, {kind}): {message}")]
    ProviderRead {
        /// Provider name
        provider: String,
        /// Failure category
        kind: FailureKind,
        /// Error message
        message: String,
    },

    /// Writing the record failed
    #[error("Provider write error ({provider}, {kind}): {message}")]
    ProviderWrite {
        /// Provider name
        provider: String,
        /// Failure category
        kind: FailureKind,
        /// Error message
        message: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a provider read error
    pub fn read(provider: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::ProviderRead {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create a provider write error
    pub fn write(
        provider: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderWrite {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    /// Provider failure category, if this is a provider error
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Error::ProviderRead { kind, .. } | Error::ProviderWrite { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
