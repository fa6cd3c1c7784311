//! Run results
//!
//! A [`RunResult`] holds exactly one [`DomainOutcome`] per configured domain,
//! in configuration order, whatever happened during the run.

use crate::config::RecordType;
use crate::error::{Error, FailureKind};
use crate::traits::AddressFamily;
use chrono::{DateTime, Utc};
use std::fmt;

/// What went wrong for a failed domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// No lookup provider produced an address for the domain's family
    AddressUnavailable(AddressFamily),
    /// Reading the published record failed
    ProviderRead(FailureKind),
    /// Writing the record failed
    ProviderWrite(FailureKind),
    /// Anything else
    Internal,
}

impl FailureCause {
    /// Classify an error captured during a domain's processing
    pub fn of(err: &Error) -> Self {
        match err {
            Error::AddressUnavailable { family, .. } => FailureCause::AddressUnavailable(*family),
            Error::ProviderRead { kind, .. } => FailureCause::ProviderRead(*kind),
            Error::ProviderWrite { kind, .. } => FailureCause::ProviderWrite(*kind),
            _ => FailureCause::Internal,
        }
    }
}

/// Outcome for one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Published record already matched
    Unchanged {
        /// Current value
        value: String,
    },
    /// Record was created or replaced
    Updated {
        /// New value
        value: String,
        /// New TTL
        ttl: u32,
        /// Replaced value, `None` on first publication
        previous: Option<String>,
    },
    /// Domain could not be reconciled this run
    Failed {
        /// Failure category
        cause: FailureCause,
        /// Human-readable reason
        reason: String,
    },
}

impl Outcome {
    /// Build a failed outcome from an error
    pub fn failed(err: &Error) -> Self {
        Outcome::Failed {
            cause: FailureCause::of(err),
            reason: err.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Unchanged { value } => write!(f, "unchanged ({})", value),
            Outcome::Updated {
                value,
                ttl,
                previous: Some(previous),
            } => write!(f, "updated {} -> {} (ttl {})", previous, value, ttl),
            Outcome::Updated { value, ttl, .. } => write!(f, "created {} (ttl {})", value, ttl),
            Outcome::Failed { reason, .. } => write!(f, "failed: {}", reason),
        }
    }
}

/// Outcome of one configured domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainOutcome {
    /// Record name as configured
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// What happened
    pub outcome: Outcome,
}

/// Aggregate outcome of one run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// One entry per configured domain, in configuration order
    pub outcomes: Vec<DomainOutcome>,
}

impl RunResult {
    /// Whether every domain succeeded (unchanged or updated)
    pub fn is_success(&self) -> bool {
        !self.outcomes.iter().any(|o| o.outcome.is_failed())
    }

    /// Whether at least one domain failed
    pub fn is_degraded(&self) -> bool {
        !self.is_success()
    }

    /// Failed domains
    pub fn failures(&self) -> impl Iterator<Item = &DomainOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_failed())
    }

    /// Count of (unchanged, updated, failed) outcomes
    pub fn counts(&self) -> (usize, usize, usize) {
        self.outcomes
            .iter()
            .fold((0, 0, 0), |(u, up, f), o| match o.outcome {
                Outcome::Unchanged { .. } => (u + 1, up, f),
                Outcome::Updated { .. } => (u, up + 1, f),
                Outcome::Failed { .. } => (u, up, f + 1),
            })
    }

    /// Outcome recorded for a domain
    pub fn outcome_for(&self, name: &str, record_type: RecordType) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.name == name && o.record_type == record_type)
            .map(|o| &o.outcome)
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at.signed_duration_since(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, outcome: Outcome) -> DomainOutcome {
        DomainOutcome {
            name: name.to_string(),
            record_type: RecordType::A,
            outcome,
        }
    }

    #[test]
    fn counts_and_degradation() {
        let now = Utc::now();
        let result = RunResult {
            started_at: now,
            finished_at: now,
            outcomes: vec![
                entry(
                    "a.example.com",
                    Outcome::Unchanged {
                        value: "1.2.3.4".to_string(),
                    },
                ),
                entry(
                    "b.example.com",
                    Outcome::failed(&Error::write("test", FailureKind::Validation, "bad ttl")),
                ),
            ],
        };

        assert_eq!(result.counts(), (1, 0, 1));
        assert!(result.is_degraded());
        assert_eq!(result.failures().count(), 1);
        assert!(matches!(
            result.outcome_for("b.example.com", RecordType::A),
            Some(Outcome::Failed {
                cause: FailureCause::ProviderWrite(FailureKind::Validation),
                ..
            })
        ));
    }

    #[test]
    fn outcome_display() {
        let updated = Outcome::Updated {
            value: "5.6.7.8".to_string(),
            ttl: 300,
            previous: Some("1.2.3.4".to_string()),
        };
        assert_eq!(updated.to_string(), "updated 1.2.3.4 -> 5.6.7.8 (ttl 300)");

        let created = Outcome::Updated {
            value: "5.6.7.8".to_string(),
            ttl: 60,
            previous: None,
        };
        assert_eq!(created.to_string(), "created 5.6.7.8 (ttl 60)");
    }
}
