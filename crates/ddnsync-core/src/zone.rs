//! Zone reader and writer
//!
//! Thin wrappers around a [`DnsProvider`] that bound every call with a
//! timeout and make sure whatever the provider returns comes out as a
//! [`Error::ProviderRead`] or [`Error::ProviderWrite`].

use crate::config::DomainConfig;
use crate::error::{Error, FailureKind, Result};
use crate::reconcile::ChangePlan;
use crate::report::Outcome;
use crate::traits::{DnsProvider, PublishedRecord};
use std::time::Duration;
use tracing::{debug, info};

/// Reads published records
pub struct ZoneReader<'a> {
    provider: &'a dyn DnsProvider,
    timeout: Duration,
}

impl<'a> ZoneReader<'a> {
    pub fn new(provider: &'a dyn DnsProvider, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Fetch the record for `domain`; `Ok(None)` means not published yet
    pub async fn fetch(&self, domain: &DomainConfig) -> Result<Option<PublishedRecord>> {
        let name = self.provider.provider_name();

        let result = tokio::time::timeout(self.timeout, self.provider.fetch_record(domain))
            .await
            .map_err(|_| {
                Error::read(
                    name,
                    FailureKind::Timeout,
                    format!("no answer within {:?}", self.timeout),
                )
            })?;

        result.map_err(|e| match e {
            Error::ProviderRead { .. } => e,
            Error::ProviderWrite { kind, message, .. } => Error::read(name, kind, message),
            other => Error::read(name, kind_of(&other), other.to_string()),
        })
    }
}

/// Applies change plans
pub struct ZoneWriter<'a> {
    provider: &'a dyn DnsProvider,
    timeout: Duration,
    dry_run: bool,
}

impl<'a> ZoneWriter<'a> {
    pub fn new(provider: &'a dyn DnsProvider, timeout: Duration) -> Self {
        Self {
            provider,
            timeout,
            dry_run: false,
        }
    }

    /// Log intended upserts instead of sending them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply `plan` to `domain`
    ///
    /// `NoOp` never reaches the provider.
    pub async fn apply(&self, domain: &DomainConfig, plan: ChangePlan) -> Result<Outcome> {
        let (change, previous) = match plan {
            ChangePlan::NoOp { value } => {
                debug!("{} ({}) already at {}", domain.name, domain.record_type, value);
                return Ok(Outcome::Unchanged { value });
            }
            ChangePlan::Upsert { change, previous } => (change, previous),
        };

        if self.dry_run {
            info!(
                "[DRY-RUN] Would upsert {} ({}) -> {} ttl={} (was: {})",
                domain.name,
                domain.record_type,
                change.value,
                change.ttl,
                previous.as_deref().unwrap_or("<none>")
            );
        } else {
            let name = self.provider.provider_name();

            let result =
                tokio::time::timeout(self.timeout, self.provider.upsert_record(domain, &change))
                    .await
                    .map_err(|_| {
                        Error::write(
                            name,
                            FailureKind::Timeout,
                            format!("no answer within {:?}", self.timeout),
                        )
                    })?;

            result.map_err(|e| match e {
                Error::ProviderWrite { .. } => e,
                Error::ProviderRead { kind, message, .. } => Error::write(name, kind, message),
                other => Error::write(name, kind_of(&other), other.to_string()),
            })?;

            debug!(
                "Upserted {} ({}) -> {} ttl={} (was: {})",
                domain.name,
                domain.record_type,
                change.value,
                change.ttl,
                previous.as_deref().unwrap_or("<none>")
            );
        }

        Ok(Outcome::Updated {
            value: change.value,
            ttl: change.ttl,
            previous,
        })
    }
}

fn kind_of(err: &Error) -> FailureKind {
    match err {
        Error::Json(_) => FailureKind::Malformed,
        _ => FailureKind::Transport,
    }
}
