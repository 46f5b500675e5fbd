//! Retention policy: converts a `(amount, unit)` pair into an absolute
//! age cutoff. Pure computation, no I/O; the sweeper compares file mtimes
//! against the cutoff.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionUnit {
    #[serde(alias = "seconds")]
    Second,
    #[serde(alias = "minutes")]
    Minute,
    #[serde(alias = "hours")]
    Hour,
    #[serde(alias = "days")]
    Day,
}

impl RetentionUnit {
    pub fn as_seconds(self) -> i64 {
        match self {
            RetentionUnit::Second => 1,
            RetentionUnit::Minute => 60,
            RetentionUnit::Hour => 3_600,
            RetentionUnit::Day => 86_400,
        }
    }
}

/// How long a target's backups are kept. Absence of a rule on a target
/// means "never delete".
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetentionRule {
    pub amount: i64,
    pub unit: RetentionUnit,
}

#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("retention amount must be positive, got {0}")]
    InvalidAmount(i64),
    #[error("retention window of {amount} {unit:?}(s) does not fit in a timestamp")]
    CutoffOutOfRange { amount: i64, unit: RetentionUnit },
}

/// Absolute instant below which artifacts are expired.
///
/// Monotonic in `amount`: a larger amount yields an earlier cutoff.
pub fn cutoff_instant(
    rule: &RetentionRule,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, RetentionError> {
    if rule.amount <= 0 {
        return Err(RetentionError::InvalidAmount(rule.amount));
    }

    let out_of_range = || RetentionError::CutoffOutOfRange {
        amount: rule.amount,
        unit: rule.unit,
    };

    let seconds = rule
        .amount
        .checked_mul(rule.unit.as_seconds())
        .ok_or_else(out_of_range)?;
    let window = Duration::try_seconds(seconds).ok_or_else(out_of_range)?;
    now.checked_sub_signed(window).ok_or_else(out_of_range)
}
