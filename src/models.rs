use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::forecast::expected_value;
use crate::urgency::{Classification, Urgency};

/// Lifecycle label a new contact gets when the caller does not provide one.
pub const DEFAULT_CONTACT_STATUS: &str = "New Lead";

// ============ Database Models ============

/// A sales-pipeline contact.
///
/// `next_followup` is derived from the contact's pending follow-ups and is
/// never written by clients. `expected_value` always equals
/// `probability * opportunity_value`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub company: String,
    pub contact_name: String,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub date_contacted: NaiveDate,
    /// Soonest pending follow-up date, if any.
    pub next_followup: Option<NaiveDate>,
    /// Free-form lifecycle label (e.g. "New Lead").
    pub status: String,
    pub priority_score: f64,
    pub probability: f64,
    pub opportunity_value: f64,
    pub expected_value: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Applies a validated partial update and re-derives `expected_value`.
    pub fn apply_update(&mut self, update: &ContactUpdate) {
        if let Some(company) = &update.company {
            self.company = company.clone();
        }
        if let Some(contact_name) = &update.contact_name {
            self.contact_name = contact_name.clone();
        }
        if let Some(designation) = &update.designation {
            self.designation = designation.clone();
        }
        if let Some(department) = &update.department {
            self.department = department.clone();
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(linkedin) = &update.linkedin {
            self.linkedin = linkedin.clone();
        }
        if let Some(date_contacted) = update.date_contacted {
            self.date_contacted = date_contacted;
        }
        if let Some(status) = &update.status {
            self.status = status.clone();
        }
        if let Some(priority_score) = update.priority_score {
            self.priority_score = priority_score;
        }
        if let Some(probability) = update.probability {
            self.probability = probability;
        }
        if let Some(opportunity_value) = update.opportunity_value {
            self.opportunity_value = opportunity_value;
        }
        if let Some(notes) = &update.notes {
            self.notes = notes.clone();
        }
        self.expected_value = expected_value(self.probability, self.opportunity_value);
    }
}

/// Follow-up status. Only `Pending` takes part in scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowupStatus {
    Pending,
    Completed,
    Cancelled,
}

impl FollowupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowupStatus::Pending => "PENDING",
            FollowupStatus::Completed => "COMPLETED",
            FollowupStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FollowupStatus::Pending)
    }
}

impl fmt::Display for FollowupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown follow-up status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for FollowupStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(FollowupStatus::Pending),
            "COMPLETED" => Ok(FollowupStatus::Completed),
            "CANCELLED" | "CANCELED" => Ok(FollowupStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for FollowupStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A scheduled follow-up attached to exactly one contact.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Followup {
    pub id: i64,
    pub contact_id: i64,
    pub followup_date: NaiveDate,
    /// Signed days from the last classification day to `followup_date`.
    pub days_remaining: i64,
    #[sqlx(try_from = "String")]
    pub urgency: Urgency,
    #[sqlx(try_from = "String")]
    pub status: FollowupStatus,
}

impl Followup {
    pub fn apply_classification(&mut self, classification: Classification) {
        self.days_remaining = classification.days_remaining;
        self.urgency = classification.urgency;
    }
}

/// Follow-up joined with the owning contact's display fields.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FollowupView {
    pub id: i64,
    pub contact_id: i64,
    pub followup_date: NaiveDate,
    pub days_remaining: i64,
    #[sqlx(try_from = "String")]
    pub urgency: Urgency,
    #[sqlx(try_from = "String")]
    pub status: FollowupStatus,
    pub company: String,
    pub contact_name: String,
}

impl FollowupView {
    pub fn from_parts(followup: &Followup, contact: &Contact) -> Self {
        Self {
            id: followup.id,
            contact_id: followup.contact_id,
            followup_date: followup.followup_date,
            days_remaining: followup.days_remaining,
            urgency: followup.urgency,
            status: followup.status,
            company: contact.company.clone(),
            contact_name: contact.contact_name.clone(),
        }
    }
}

/// Weekly funnel counters.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub week: NaiveDate,
    pub contacts_added: i64,
    pub responses: i64,
    pub interviews: i64,
    pub offers: i64,
}

// ============ Write Models ============

/// A contact that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub company: String,
    pub contact_name: String,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    pub date_contacted: NaiveDate,
    pub status: String,
    pub priority_score: f64,
    pub probability: f64,
    pub opportunity_value: f64,
    pub notes: Option<String>,
}

impl NewContact {
    pub fn expected_value(&self) -> f64 {
        expected_value(self.probability, self.opportunity_value)
    }
}

/// Validated partial contact update. `None` leaves a field unchanged; for the
/// optional text fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactUpdate {
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub designation: Option<Option<String>>,
    pub department: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub linkedin: Option<Option<String>>,
    pub date_contacted: Option<NaiveDate>,
    pub status: Option<String>,
    pub priority_score: Option<f64>,
    pub probability: Option<f64>,
    pub opportunity_value: Option<f64>,
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMetric {
    pub week: NaiveDate,
    pub contacts_added: i64,
    pub responses: i64,
    pub interviews: i64,
    pub offers: i64,
}

// ============ Request Payloads ============

/// Body of `POST /contacts` and `PATCH /contacts/:id`.
///
/// On PATCH a blank `designation`, `department`, `email`, `linkedin` or
/// `notes` clears the field; an absent one leaves it unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPayload {
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub linkedin: Option<String>,
    /// `YYYY-MM-DD`; defaults to today on creation.
    pub date_contacted: Option<String>,
    pub status: Option<String>,
    pub priority_score: Option<f64>,
    pub probability: Option<f64>,
    pub opportunity_value: Option<f64>,
    pub notes: Option<String>,
}

/// Body of `POST /followups`, e.g. `{"contact_id": 1, "followup_date": "2026-02-18"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowupPayload {
    pub contact_id: i64,
    pub followup_date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowupListParams {
    #[serde(default)]
    pub include_completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricPayload {
    pub week: String,
    #[serde(default)]
    pub contacts_added: i64,
    #[serde(default)]
    pub responses: i64,
    #[serde(default)]
    pub interviews: i64,
    #[serde(default)]
    pub offers: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastParams {
    pub week: Option<String>,
}
