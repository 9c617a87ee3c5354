//! Process-local pipeline store.
//!
//! Data lives only as long as the process. A single write guard covers each
//! mutation together with its `next_followup` re-derivation, which is a
//! superset of the per-contact critical section the store contract asks for.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{
    Contact, ContactUpdate, Followup, FollowupStatus, FollowupView, Metric, NewContact, NewMetric,
};
use crate::store::{derive_next_followup, PipelineStore};
use crate::urgency::classify;

#[derive(Debug, Default)]
struct MemoryState {
    contacts: BTreeMap<i64, Contact>,
    followups: BTreeMap<i64, Followup>,
    metrics: Vec<Metric>,
    last_contact_id: i64,
    last_followup_id: i64,
    last_metric_id: i64,
}

impl MemoryState {
    /// Re-derive one contact's `next_followup`. Returns true when it changed.
    fn refresh_next_followup(&mut self, contact_id: i64, excluding: Option<i64>) -> bool {
        let next = derive_next_followup(self.followups.values(), contact_id, excluding);
        match self.contacts.get_mut(&contact_id) {
            Some(contact) if contact.next_followup != next => {
                contact.next_followup = next;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPipelineStore {
    state: RwLock<MemoryState>,
}

impl InMemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn create_contact(&self, new: NewContact) -> Result<Contact, AppError> {
        let mut state = self.state.write().await;
        state.last_contact_id += 1;

        let contact = Contact {
            id: state.last_contact_id,
            expected_value: new.expected_value(),
            company: new.company,
            contact_name: new.contact_name,
            designation: new.designation,
            department: new.department,
            email: new.email,
            linkedin: new.linkedin,
            date_contacted: new.date_contacted,
            next_followup: None,
            status: new.status,
            priority_score: new.priority_score,
            probability: new.probability,
            opportunity_value: new.opportunity_value,
            notes: new.notes,
            created_at: Utc::now(),
        };
        state.contacts.insert(contact.id, contact.clone());

        Ok(contact)
    }

    async fn get_contact(&self, id: i64) -> Result<Contact, AppError> {
        self.state
            .read()
            .await
            .contacts
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Contact with id {} not found", id)))
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, AppError> {
        Ok(self.state.read().await.contacts.values().cloned().collect())
    }

    async fn update_contact(&self, id: i64, update: ContactUpdate) -> Result<Contact, AppError> {
        let mut state = self.state.write().await;
        let contact = state
            .contacts
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Contact with id {} not found", id)))?;
        contact.apply_update(&update);
        Ok(contact.clone())
    }

    async fn delete_contact(&self, id: i64) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if state.contacts.remove(&id).is_some() {
            state.followups.retain(|_, f| f.contact_id != id);
        }
        Ok(())
    }

    async fn create_followup(
        &self,
        contact_id: i64,
        followup_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Followup, AppError> {
        let mut state = self.state.write().await;
        if !state.contacts.contains_key(&contact_id) {
            return Err(AppError::NotFound(format!(
                "Contact with id {} not found",
                contact_id
            )));
        }

        let classification = classify(followup_date, today);
        state.last_followup_id += 1;
        let followup = Followup {
            id: state.last_followup_id,
            contact_id,
            followup_date,
            days_remaining: classification.days_remaining,
            urgency: classification.urgency,
            status: FollowupStatus::Pending,
        };
        state.followups.insert(followup.id, followup.clone());
        state.refresh_next_followup(contact_id, None);

        Ok(followup)
    }

    async fn set_status(
        &self,
        followup_id: i64,
        status: FollowupStatus,
        today: NaiveDate,
    ) -> Result<Followup, AppError> {
        let mut state = self.state.write().await;
        let followup = state
            .followups
            .get_mut(&followup_id)
            .ok_or_else(|| AppError::NotFound(format!("Followup with id {} not found", followup_id)))?;

        followup.status = status;
        if status.is_pending() {
            followup.apply_classification(classify(followup.followup_date, today));
        }
        let updated = followup.clone();

        let excluding = (!status.is_pending()).then_some(followup_id);
        state.refresh_next_followup(updated.contact_id, excluding);

        Ok(updated)
    }

    async fn delete_followup(&self, followup_id: i64) -> Result<(), AppError> {
        let mut state = self.state.write().await;
        if let Some(removed) = state.followups.remove(&followup_id) {
            state.refresh_next_followup(removed.contact_id, Some(followup_id));
        }
        Ok(())
    }

    async fn list_followups(&self, include_completed: bool) -> Result<Vec<FollowupView>, AppError> {
        let state = self.state.read().await;
        let mut rows: Vec<FollowupView> = state
            .followups
            .values()
            .filter(|f| include_completed || f.status.is_pending())
            .filter_map(|f| {
                state
                    .contacts
                    .get(&f.contact_id)
                    .map(|c| FollowupView::from_parts(f, c))
            })
            .collect();
        // BTreeMap iteration is already in id order, so a stable sort keeps arrival order on ties
        rows.sort_by_key(|r| r.followup_date);
        Ok(rows)
    }

    async fn followups_for_contact(&self, contact_id: i64) -> Result<Vec<Followup>, AppError> {
        let state = self.state.read().await;
        if !state.contacts.contains_key(&contact_id) {
            return Err(AppError::NotFound(format!(
                "Contact with id {} not found",
                contact_id
            )));
        }
        let mut rows: Vec<Followup> = state
            .followups
            .values()
            .filter(|f| f.contact_id == contact_id)
            .cloned()
            .collect();
        rows.sort_by_key(|f| f.followup_date);
        Ok(rows)
    }

    async fn recompute_all_pending(&self, today: NaiveDate) -> Result<usize, AppError> {
        let mut state = self.state.write().await;
        let mut visited = 0;
        for followup in state.followups.values_mut().filter(|f| f.status.is_pending()) {
            followup.apply_classification(classify(followup.followup_date, today));
            visited += 1;
        }
        Ok(visited)
    }

    async fn repair_next_followups(&self) -> Result<usize, AppError> {
        let mut state = self.state.write().await;
        let ids: Vec<i64> = state.contacts.keys().copied().collect();
        let mut repaired = 0;
        for id in ids {
            if state.refresh_next_followup(id, None) {
                tracing::info!(
                    "Repaired next_followup for contact {}: {:?}",
                    id,
                    state.contacts.get(&id).and_then(|c| c.next_followup)
                );
                repaired += 1;
            }
        }
        Ok(repaired)
    }

    async fn record_metric(&self, new: NewMetric) -> Result<Metric, AppError> {
        let mut state = self.state.write().await;
        state.last_metric_id += 1;
        let metric = Metric {
            id: state.last_metric_id,
            week: new.week,
            contacts_added: new.contacts_added,
            responses: new.responses,
            interviews: new.interviews,
            offers: new.offers,
        };
        state.metrics.push(metric.clone());
        Ok(metric)
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>, AppError> {
        let mut metrics = self.state.read().await.metrics.clone();
        metrics.sort_by_key(|m| (m.week, m.id));
        Ok(metrics)
    }
}
