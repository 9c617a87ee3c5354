//! Store contract for contacts, follow-ups and funnel metrics.
//!
//! Every implementation maintains one invariant: a contact's `next_followup`
//! is the minimum `followup_date` over its PENDING follow-ups, or `None` when
//! it has none. Each mutation and the re-derivation that follows it run in one
//! critical section scoped to the owning contact.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::AppError;
use crate::models::{
    Contact, ContactUpdate, Followup, FollowupStatus, FollowupView, Metric, NewContact, NewMetric,
};

/// Pluggable persistence for the pipeline.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    // ---- contacts ----

    async fn create_contact(&self, contact: NewContact) -> Result<Contact, AppError>;

    async fn get_contact(&self, id: i64) -> Result<Contact, AppError>;

    /// All contacts ordered by id.
    async fn list_contacts(&self) -> Result<Vec<Contact>, AppError>;

    /// Partial update; `expected_value` is re-derived, `next_followup` untouched.
    async fn update_contact(&self, id: i64, update: ContactUpdate) -> Result<Contact, AppError>;

    /// Removes the contact and its follow-ups. Absent ids are a no-op.
    async fn delete_contact(&self, id: i64) -> Result<(), AppError>;

    // ---- follow-ups ----

    /// Inserts a PENDING follow-up classified against `today` and re-derives
    /// the contact's `next_followup` with the new row included.
    async fn create_followup(
        &self,
        contact_id: i64,
        followup_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Followup, AppError>;

    /// Changes a follow-up's status. Leaving PENDING drops the row from the
    /// contact's `next_followup` candidates; re-entering PENDING re-classifies
    /// it against `today`.
    async fn set_status(
        &self,
        followup_id: i64,
        status: FollowupStatus,
        today: NaiveDate,
    ) -> Result<Followup, AppError>;

    /// Tolerant delete: removing an absent follow-up succeeds.
    async fn delete_followup(&self, followup_id: i64) -> Result<(), AppError>;

    /// PENDING follow-ups (or all of them) joined with contact display
    /// fields, by `followup_date` then arrival order.
    async fn list_followups(&self, include_completed: bool) -> Result<Vec<FollowupView>, AppError>;

    async fn followups_for_contact(&self, contact_id: i64) -> Result<Vec<Followup>, AppError>;

    // ---- batch ----

    /// Re-classifies every PENDING follow-up against `today`. Returns how many
    /// rows were visited.
    async fn recompute_all_pending(&self, today: NaiveDate) -> Result<usize, AppError>;

    /// Re-derives `next_followup` for every contact. Returns how many contacts
    /// changed.
    async fn repair_next_followups(&self) -> Result<usize, AppError>;

    // ---- metrics ----

    async fn record_metric(&self, metric: NewMetric) -> Result<Metric, AppError>;

    /// All metrics ordered by week, then id.
    async fn list_metrics(&self) -> Result<Vec<Metric>, AppError>;
}

/// Soonest PENDING date among `followups` belonging to `contact_id`,
/// ignoring the row `excluding` (the one currently being mutated).
pub fn derive_next_followup<'a, I>(
    followups: I,
    contact_id: i64,
    excluding: Option<i64>,
) -> Option<NaiveDate>
where
    I: IntoIterator<Item = &'a Followup>,
{
    followups
        .into_iter()
        .filter(|f| f.contact_id == contact_id)
        .filter(|f| f.status.is_pending())
        .filter(|f| Some(f.id) != excluding)
        .map(|f| f.followup_date)
        .min()
}
