/// Input validation for contact, follow-up and metric payloads.
///
/// Everything here runs before the store is invoked, so the store can rely on
/// non-empty names, `probability` in [0, 1], `opportunity_value` >= 0 and
/// well-formed dates.
use chrono::NaiveDate;
use regex::Regex;

use crate::errors::AppError;
use crate::models::{
    ContactPayload, ContactUpdate, FollowupStatus, MetricPayload, NewContact, NewMetric,
    DEFAULT_CONTACT_STATUS,
};

/// Wire format for every date accepted by the API.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Upper bound for a single week's funnel counter. Keeps sums over many weeks
/// far away from `i64` overflow.
pub const MAX_FUNNEL_COUNT: i64 = 1_000_000_000;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Check that an email address looks like `local@domain.tld`.
pub fn is_valid_email(email: &str) -> bool {
    match Regex::new(EMAIL_PATTERN) {
        Ok(re) => re.is_match(email),
        Err(e) => {
            tracing::error!("Email pattern failed to compile: {}", e);
            false
        }
    }
}

/// Parse a `YYYY-MM-DD` date, naming the offending field on failure.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        AppError::InvalidInput(format!(
            "{} must be a valid date in YYYY-MM-DD format, got '{}'",
            field, raw
        ))
    })
}

pub fn parse_status(raw: &str) -> Result<FollowupStatus, AppError> {
    raw.parse()
        .map_err(|e: crate::models::UnknownStatus| AppError::InvalidInput(e.to_string()))
}

fn required_text(field: &str, value: Option<&str>) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::InvalidInput(format!(
            "{} must be a non-empty string.",
            field
        ))),
    }
}

/// Trim optional text; blank strings count as absent.
fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// PATCH semantics for optional text: absent stays unchanged, blank clears.
fn clearable_text(value: Option<&str>) -> Option<Option<String>> {
    value.map(|v| optional_text(Some(v)))
}

fn check_email(email: Option<String>) -> Result<Option<String>, AppError> {
    match email {
        Some(e) if !is_valid_email(&e) => {
            Err(AppError::InvalidInput("Invalid email format.".to_string()))
        }
        other => Ok(other),
    }
}

fn check_probability(probability: f64) -> Result<f64, AppError> {
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(AppError::InvalidInput(
            "Probability must be between 0 and 1.".to_string(),
        ));
    }
    Ok(probability)
}

fn check_opportunity_value(value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::InvalidInput(
            "Opportunity value cannot be negative.".to_string(),
        ));
    }
    Ok(value)
}

fn check_priority_score(score: f64) -> Result<f64, AppError> {
    if !score.is_finite() {
        return Err(AppError::InvalidInput(
            "Priority score must be a finite number.".to_string(),
        ));
    }
    Ok(score)
}

/// Validate a creation payload. `date_contacted` falls back to `today`.
pub fn validate_new_contact(
    payload: &ContactPayload,
    today: NaiveDate,
) -> Result<NewContact, AppError> {
    let company = required_text("Company name", payload.company.as_deref())?;
    let contact_name = required_text("Contact name", payload.contact_name.as_deref())?;
    let email = check_email(optional_text(payload.email.as_deref()))?;
    let probability = check_probability(payload.probability.unwrap_or(0.0))?;
    let opportunity_value = check_opportunity_value(payload.opportunity_value.unwrap_or(0.0))?;
    let priority_score = check_priority_score(payload.priority_score.unwrap_or(0.0))?;

    let date_contacted = match payload.date_contacted.as_deref() {
        Some(raw) => parse_date("date_contacted", raw)?,
        None => today,
    };

    Ok(NewContact {
        company,
        contact_name,
        designation: optional_text(payload.designation.as_deref()),
        department: optional_text(payload.department.as_deref()),
        email,
        linkedin: optional_text(payload.linkedin.as_deref()),
        date_contacted,
        status: optional_text(payload.status.as_deref())
            .unwrap_or_else(|| DEFAULT_CONTACT_STATUS.to_string()),
        priority_score,
        probability,
        opportunity_value,
        notes: payload.notes.clone(),
    })
}

/// Validate a partial update. Fields present in the payload obey the same
/// rules as on creation; absent fields stay untouched.
pub fn validate_contact_update(payload: &ContactPayload) -> Result<ContactUpdate, AppError> {
    let company = payload
        .company
        .as_deref()
        .map(|c| required_text("Company name", Some(c)))
        .transpose()?;
    let contact_name = payload
        .contact_name
        .as_deref()
        .map(|c| required_text("Contact name", Some(c)))
        .transpose()?;

    Ok(ContactUpdate {
        company,
        contact_name,
        designation: clearable_text(payload.designation.as_deref()),
        department: clearable_text(payload.department.as_deref()),
        email: clearable_text(payload.email.as_deref())
            .map(check_email)
            .transpose()?,
        linkedin: clearable_text(payload.linkedin.as_deref()),
        date_contacted: payload
            .date_contacted
            .as_deref()
            .map(|raw| parse_date("date_contacted", raw))
            .transpose()?,
        status: optional_text(payload.status.as_deref()),
        priority_score: payload.priority_score.map(check_priority_score).transpose()?,
        probability: payload.probability.map(check_probability).transpose()?,
        opportunity_value: payload
            .opportunity_value
            .map(check_opportunity_value)
            .transpose()?,
        notes: clearable_text(payload.notes.as_deref()),
    })
}

pub fn validate_metric(payload: &MetricPayload) -> Result<NewMetric, AppError> {
    let week = parse_date("week", &payload.week)?;
    for (name, value) in [
        ("contacts_added", payload.contacts_added),
        ("responses", payload.responses),
        ("interviews", payload.interviews),
        ("offers", payload.offers),
    ] {
        if value < 0 {
            return Err(AppError::InvalidInput(format!(
                "{} cannot be negative.",
                name
            )));
        }
        if value > MAX_FUNNEL_COUNT {
            return Err(AppError::InvalidInput(format!(
                "{} cannot exceed {}.",
                name, MAX_FUNNEL_COUNT
            )));
        }
    }

    Ok(NewMetric {
        week,
        contacts_added: payload.contacts_added,
        responses: payload.responses,
        interviews: payload.interviews,
        offers: payload.offers,
    })
}
