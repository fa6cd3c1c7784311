//! Cron cadence for recurring mode
//!
//! Accepts the usual five-field crontab syntax (seconds implied as `0`),
//! six/seven-field expressions with explicit seconds (and year), and the
//! `@hourly`-style shorthands. Fire times are evaluated in the configured
//! timezone so `0 3 * * *` means 03:00 local time across DST changes.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// Parsed cadence bound to a timezone
#[derive(Clone)]
pub struct Schedule {
    expression: String,
    inner: cron::Schedule,
    tz: Tz,
}

impl Schedule {
    /// Parse a cron expression evaluated in `tz`
    pub fn parse(expression: &str, tz: Tz) -> Result<Self> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(Error::config("Schedule expression cannot be empty"));
        }

        let normalized = if expression.starts_with('@') {
            expression.to_string()
        } else {
            match expression.split_whitespace().count() {
                5 => format!("0 {}", expression),
                6 | 7 => expression.to_string(),
                n => {
                    return Err(Error::config(format!(
                        "Invalid schedule '{}': expected 5 to 7 fields, got {}",
                        expression, n
                    )));
                }
            }
        };

        let inner = cron::Schedule::from_str(&normalized)
            .map_err(|e| Error::config(format!("Invalid schedule '{}': {}", expression, e)))?;

        Ok(Self {
            expression: expression.to_string(),
            inner,
            tz,
        })
    }

    /// Next fire time strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner
            .after(&now.with_timezone(&self.tz))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Expression as written in the configuration
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Timezone the expression is evaluated in
    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("expression", &self.expression)
            .field("tz", &self.tz)
            .finish()
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.expression, self.tz)
    }
}

/// How the daemon drives the engine
#[derive(Debug, Clone)]
pub enum RunMode {
    /// Run a single pass and exit
    Once,
    /// Run on every tick of the schedule until shutdown
    Forever(Schedule),
}

impl RunMode {
    /// Select the mode explicitly: `force_once` wins, otherwise a schedule means recurring
    pub fn select(schedule: Option<&str>, tz: Tz, force_once: bool) -> Result<Self> {
        match schedule.map(str::trim).filter(|s| !s.is_empty()) {
            Some(expr) if !force_once => Ok(RunMode::Forever(Schedule::parse(expr, tz)?)),
            _ => Ok(RunMode::Once),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn five_field_expression_fires_on_the_minute() {
        let schedule = Schedule::parse("*/5 * * * *", Tz::UTC).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 2, 30).unwrap();

        let next = schedule.next_after(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap());
    }

    #[test]
    fn six_field_expression_keeps_seconds() {
        let schedule = Schedule::parse("30 * * * * *", Tz::UTC).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 2, 0).unwrap();

        assert_eq!(schedule.next_after(now).unwrap().second(), 30);
    }

    #[test]
    fn evaluated_in_configured_timezone() {
        // 03:00 in Tokyo (UTC+9, no DST) is 18:00 UTC the previous day
        let schedule = Schedule::parse("0 3 * * *", chrono_tz::Asia::Tokyo).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let next = schedule.next_after(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap());
    }

    #[test]
    fn shorthand_is_accepted() {
        let schedule = Schedule::parse("@hourly", Tz::UTC).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 15, 0).unwrap();
        assert_eq!(
            schedule.next_after(now).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn malformed_expressions_are_config_errors() {
        for expr in ["", "* * *", "61 * * * *", "not a cron at all"] {
            let err = Schedule::parse(expr, Tz::UTC).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{:?} should be rejected", expr);
        }
    }

    #[test]
    fn mode_selection_is_explicit() {
        assert!(matches!(
            RunMode::select(None, Tz::UTC, false).unwrap(),
            RunMode::Once
        ));
        assert!(matches!(
            RunMode::select(Some("  "), Tz::UTC, false).unwrap(),
            RunMode::Once
        ));
        assert!(matches!(
            RunMode::select(Some("*/5 * * * *"), Tz::UTC, true).unwrap(),
            RunMode::Once
        ));
        assert!(matches!(
            RunMode::select(Some("*/5 * * * *"), Tz::UTC, false).unwrap(),
            RunMode::Forever(_)
        ));
    }
}
