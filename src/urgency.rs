//! Urgency classification for scheduled follow-ups.
//!
//! A follow-up's urgency only depends on how many whole days separate its date
//! from "today". Callers running a batch must pass the same `today` to every
//! call so that records near a tier boundary are judged consistently.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Last day offset (inclusive) that still counts as HIGH urgency.
pub const HIGH_MAX_DAYS: i64 = 2;
/// Last day offset (inclusive) that still counts as MEDIUM urgency.
pub const MEDIUM_MAX_DAYS: i64 = 7;

/// Urgency tier derived from the days remaining until a follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Overdue,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Overdue => "OVERDUE",
            Urgency::High => "HIGH",
            Urgency::Medium => "MEDIUM",
            Urgency::Low => "LOW",
        }
    }

    /// Tier for a signed day offset. First matching threshold wins.
    pub fn from_days(days_remaining: i64) -> Self {
        if days_remaining < 0 {
            Urgency::Overdue
        } else if days_remaining <= HIGH_MAX_DAYS {
            Urgency::High
        } else if days_remaining <= MEDIUM_MAX_DAYS {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored urgency label is not one of the known tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUrgency(pub String);

impl fmt::Display for UnknownUrgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown urgency tier: {}", self.0)
    }
}

impl std::error::Error for UnknownUrgency {}

impl FromStr for Urgency {
    type Err = UnknownUrgency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OVERDUE" => Ok(Urgency::Overdue),
            "HIGH" => Ok(Urgency::High),
            "MEDIUM" => Ok(Urgency::Medium),
            "LOW" => Ok(Urgency::Low),
            _ => Err(UnknownUrgency(s.to_string())),
        }
    }
}

impl TryFrom<String> for Urgency {
    type Error = UnknownUrgency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Result of classifying a follow-up date against a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub days_remaining: i64,
    pub urgency: Urgency,
}

/// Classify `followup_date` relative to `today`.
///
/// `days_remaining` is negative for dates in the past. The function is total:
/// every pair of dates maps to exactly one tier.
pub fn classify(followup_date: NaiveDate, today: NaiveDate) -> Classification {
    let days_remaining = (followup_date - today).num_days();
    Classification {
        days_remaining,
        urgency: Urgency::from_days(days_remaining),
    }
}
