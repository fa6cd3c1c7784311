//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Resolving the public address once per needed family per run
//! - Reading each domain's published record
//! - Planning and applying the minimal change per domain
//! - Aggregating per-domain outcomes into a [`RunResult`]
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────┐
//!   scheduler / once ───▶│  SyncEngine  │
//!                        └──────────────┘
//!                               │
//!        ┌──────────────────────┼──────────────────────┐
//!        │                      │                      │
//!        ▼                      ▼                      ▼
//! ┌───────────────┐     ┌──────────────┐      ┌──────────────┐
//! │AddressResolver│     │  ZoneReader  │─plan▶│  ZoneWriter  │
//! │ (per family)  │     │ (per domain) │      │ (per domain) │
//! └───────────────┘     └──────────────┘      └──────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Resolve each address family some domain needs
//! 2. For each domain in configuration order: fetch, plan, apply
//! 3. Record the outcome and move on whatever happened
//! 4. Log the run summary and return the [`RunResult`]

use crate::config::{DomainConfig, SyncConfig};
use crate::error::{Error, Result};
use crate::reconcile;
use crate::report::{DomainOutcome, Outcome, RunResult};
use crate::resolver::{AddressResolver, ResolvedAddress};
use crate::schedule::{RunMode, Schedule};
use crate::traits::{AddressFamily, DnsProvider};
use crate::zone::{ZoneReader, ZoneWriter};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Core sync engine
///
/// Constructed once with its configuration and dependencies, then driven by
/// [`SyncEngine::run_once`] (single-shot) or [`SyncEngine::run_forever`]
/// (recurring).
///
/// ## Overlap
///
/// Runs never overlap. [`SyncEngine::run_once`] waits for an in-flight run
/// to finish; [`SyncEngine::try_run_once`] skips instead.
pub struct SyncEngine {
    /// Public address resolver
    resolver: AddressResolver,

    /// DNS provider for reading and writing records
    provider: Box<dyn DnsProvider>,

    /// Domains to reconcile, in order
    domains: Vec<DomainConfig>,

    /// Families the domains need, resolved once per run
    families: Vec<AddressFamily>,

    /// Bound on each provider call
    provider_timeout: Duration,

    /// Log writes instead of sending them
    dry_run: bool,

    /// Held for the whole duration of a run
    run_lock: Mutex<()>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// The configuration is validated again here so an engine can never
    /// exist with an empty or duplicated domain list.
    pub fn new(
        resolver: AddressResolver,
        provider: Box<dyn DnsProvider>,
        config: &SyncConfig,
    ) -> Result<Self> {
        config.validate()?;

        let families = config.families();
        for &family in &families {
            if resolver.lookups(family).is_empty() {
                warn!(
                    "No {} lookup configured; {} domains will fail every run",
                    family, family
                );
            }
        }

        Ok(Self {
            resolver,
            provider,
            domains: config.domains.clone(),
            families,
            provider_timeout: Duration::from_secs(config.engine.provider_timeout_secs),
            dry_run: config.engine.dry_run,
            run_lock: Mutex::new(()),
        })
    }

    /// Override dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Domains managed by this engine
    pub fn domains(&self) -> &[DomainConfig] {
        &self.domains
    }

    /// Run one full pass, waiting for any in-flight run first
    pub async fn run_once(&self) -> RunResult {
        let _guard = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Run one full pass unless another run is in progress
    ///
    /// Returns `None` when the pass was skipped.
    pub async fn try_run_once(&self) -> Option<RunResult> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("Previous run still in progress, skipping this trigger");
            return None;
        };
        Some(self.run_locked().await)
    }

    /// Run on every tick of `schedule` until `shutdown` resolves
    ///
    /// Shutdown is only observed between runs: a run that has started is
    /// allowed to finish so no record is left half-applied. Ticks that
    /// elapse while a run is in progress are skipped.
    pub async fn run_forever<F>(&self, schedule: &Schedule, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Scheduling runs with {}", schedule);

        loop {
            let now = chrono::Utc::now();
            let Some(next) = schedule.next_after(now) else {
                return Err(Error::config(format!(
                    "Schedule {} has no upcoming fire time",
                    schedule
                )));
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(
                "Next run at {}",
                next.with_timezone(&schedule.timezone()).to_rfc3339()
            );

            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                _ = tokio::time::sleep(wait) => {}
            }

            self.run_once().await;
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Drive the engine in the given mode
    ///
    /// Returns the single run's result in [`RunMode::Once`] and `None` after
    /// a clean shutdown in [`RunMode::Forever`].
    pub async fn run<F>(&self, mode: &RunMode, shutdown: F) -> Result<Option<RunResult>>
    where
        F: Future<Output = ()>,
    {
        match mode {
            RunMode::Once => Ok(Some(self.run_once().await)),
            RunMode::Forever(schedule) => {
                self.run_forever(schedule, shutdown).await?;
                Ok(None)
            }
        }
    }

    async fn run_locked(&self) -> RunResult {
        let started_at = chrono::Utc::now();
        info!("Starting run for {} domain(s)", self.domains.len());

        let addresses = self.resolve_families().await;

        let mut outcomes = Vec::with_capacity(self.domains.len());
        for domain in &self.domains {
            let family = domain.record_type.family();
            let resolved = addresses
                .iter()
                .find(|(f, _)| *f == family)
                .map(|(_, r)| r);

            let outcome = match resolved {
                Some(Ok(address)) => self.reconcile_domain(domain, address).await,
                Some(Err(e)) => Outcome::failed(e),
                None => Outcome::failed(&Error::AddressUnavailable {
                    family,
                    attempts: 0,
                }),
            };

            log_outcome(domain, &outcome);
            outcomes.push(DomainOutcome {
                name: domain.name.clone(),
                record_type: domain.record_type,
                outcome,
            });
        }

        let result = RunResult {
            started_at,
            finished_at: chrono::Utc::now(),
            outcomes,
        };

        let (unchanged, updated, failed) = result.counts();
        if result.is_success() {
            info!(
                "Run complete: {} unchanged, {} updated in {}ms",
                unchanged,
                updated,
                result.duration().num_milliseconds()
            );
        } else {
            warn!(
                "Run degraded: {} unchanged, {} updated, {} failed in {}ms",
                unchanged,
                updated,
                failed,
                result.duration().num_milliseconds()
            );
        }

        result
    }

    async fn resolve_families(&self) -> Vec<(AddressFamily, Result<ResolvedAddress>)> {
        let mut addresses = Vec::with_capacity(self.families.len());
        for &family in &self.families {
            let resolved = self.resolver.resolve(family).await;
            match &resolved {
                Ok(address) => info!("Public {} address is {}", family, address.address),
                Err(e) => error!("{}", e),
            }
            addresses.push((family, resolved));
        }
        addresses
    }

    async fn reconcile_domain(&self, domain: &DomainConfig, resolved: &ResolvedAddress) -> Outcome {
        let reader = ZoneReader::new(self.provider.as_ref(), self.provider_timeout);
        let published = match reader.fetch(domain).await {
            Ok(published) => published,
            Err(e) => return Outcome::failed(&e),
        };

        let plan = reconcile::plan(domain, resolved, published.as_ref());

        let writer =
            ZoneWriter::new(self.provider.as_ref(), self.provider_timeout).dry_run(self.dry_run);
        match writer.apply(domain, plan).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::failed(&e),
        }
    }
}

fn log_outcome(domain: &DomainConfig, outcome: &Outcome) {
    match outcome {
        Outcome::Failed { .. } => {
            error!("{} ({}): {}", domain.name, domain.record_type, outcome)
        }
        _ => info!("{} ({}): {}", domain.name, domain.record_type, outcome),
    }
}
