//! Lookback time window

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unit of a relative lookback amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookbackUnit {
    /// Minutes
    Minutes,
    /// Hours
    Hours,
}

impl LookbackUnit {
    fn suffix(self) -> &'static str {
        match self {
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }
}

/// Absolute lower bound for a query, resolved from a relative lookback.
///
/// `min_timestamp() <= now()` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    now: DateTime<Utc>,
    #[serde(skip)]
    lookback: Duration,
    amount: i64,
    unit: LookbackUnit,
    min_timestamp: DateTime<Utc>,
}

impl TimeWindow {
    /// Resolve a lookback against the current UTC wall clock
    pub fn resolve(amount: i64, unit: LookbackUnit) -> Result<Self> {
        Self::resolve_at(Utc::now(), amount, unit)
    }

    /// Resolve a lookback against an explicit `now`
    pub fn resolve_at(now: DateTime<Utc>, amount: i64, unit: LookbackUnit) -> Result<Self> {
        let name = match unit {
            LookbackUnit::Minutes => "minutes",
            LookbackUnit::Hours => "hours",
        };

        if amount < 0 {
            return Err(Error::invalid_parameter(
                name,
                format!("lookback must not be negative (got {amount})"),
            ));
        }

        let lookback = match unit {
            LookbackUnit::Minutes => Duration::try_minutes(amount),
            LookbackUnit::Hours => Duration::try_hours(amount),
        }
        .ok_or_else(|| Error::invalid_parameter(name, format!("lookback {amount} is too large")))?;

        let min_timestamp = now.checked_sub_signed(lookback).ok_or_else(|| {
            Error::invalid_parameter(
                name,
                format!("lookback {amount} reaches before the epoch range"),
            )
        })?;

        Ok(Self {
            now,
            lookback,
            amount,
            unit,
            min_timestamp,
        })
    }

    /// Instant the window was resolved at
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Length of the window
    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Earliest timestamp included by the window
    pub fn min_timestamp(&self) -> DateTime<Utc> {
        self.min_timestamp
    }

    /// Short human form, e.g. `24h` or `5m`
    pub fn describe(&self) -> String {
        format!("{}{}", self.amount, self.unit.suffix())
    }
}
