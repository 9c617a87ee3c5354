//! Daily follow-up sweep.
//!
//! Urgency drifts as days pass even when nothing is written, so every PENDING
//! follow-up is re-classified once a day against a single shared "today".
//! Optionally the sweep also re-derives every contact's `next_followup`; both
//! passes are idempotent within a day.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::errors::{AppError, ResultExt};
use crate::store::PipelineStore;

/// Reference day for classification (server local time).
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub today: NaiveDate,
    pub followups_updated: usize,
    /// `None` when the repair pass was not requested.
    pub contacts_repaired: Option<usize>,
}

/// Run the sweep against `store` with one `today` for every record.
pub async fn run_sweep(
    store: &dyn PipelineStore,
    today: NaiveDate,
    repair: bool,
) -> Result<SweepReport, AppError> {
    let followups_updated = store
        .recompute_all_pending(today)
        .await
        .context("recomputing pending follow-ups")?;

    let contacts_repaired = if repair {
        Some(
            store
                .repair_next_followups()
                .await
                .context("repairing next_followup")?,
        )
    } else {
        None
    };

    tracing::info!(
        "Sweep for {}: updated {} active follow-ups, repaired {:?} contacts",
        today,
        followups_updated,
        contacts_repaired
    );

    Ok(SweepReport {
        today,
        followups_updated,
        contacts_repaired,
    })
}

/// Build (but do not start) a scheduler that runs the sweep on `cron`
/// (six fields, seconds first).
pub async fn build_scheduler(
    store: Arc<dyn PipelineStore>,
    cron: &str,
    repair: bool,
) -> anyhow::Result<JobScheduler> {
    use anyhow::Context;

    let sched = JobScheduler::new().await.context("creating scheduler")?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let store = store.clone();
        Box::pin(async move {
            if let Err(e) = run_sweep(store.as_ref(), today(), repair).await {
                tracing::error!("Scheduled follow-up sweep failed: {}", e);
            }
        })
    })
    .with_context(|| format!("creating sweep job for cron {cron}"))?;

    sched.add(job).await.context("adding sweep job")?;
    tracing::info!("Follow-up sweep scheduled ({})", cron);

    Ok(sched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryPipelineStore;
    use crate::models::{FollowupStatus, NewContact};
    use crate::urgency::Urgency;
    use chrono::Duration;

    fn contact() -> NewContact {
        NewContact {
            company: "Initech".into(),
            contact_name: "Peter".into(),
            designation: None,
            department: None,
            email: None,
            linkedin: None,
            date_contacted: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            status: "New Lead".into(),
            priority_score: 0.0,
            probability: 0.3,
            opportunity_value: 1_000.0,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_sweep_moves_tiers_as_days_pass() {
        let store = InMemoryPipelineStore::new();
        let day0 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let c = store.create_contact(contact()).await.unwrap();
        let f = store
            .create_followup(c.id, day0 + Duration::days(3), day0)
            .await
            .unwrap();
        assert_eq!(f.urgency, Urgency::Medium);

        let report = run_sweep(&store, day0 + Duration::days(2), false).await.unwrap();
        assert_eq!(report.followups_updated, 1);
        assert_eq!(report.contacts_repaired, None);

        let rows = store.followups_for_contact(c.id).await.unwrap();
        assert_eq!(rows[0].days_remaining, 1);
        assert_eq!(rows[0].urgency, Urgency::High);

        run_sweep(&store, day0 + Duration::days(4), false).await.unwrap();
        let rows = store.followups_for_contact(c.id).await.unwrap();
        assert_eq!(rows[0].days_remaining, -1);
        assert_eq!(rows[0].urgency, Urgency::Overdue);
    }

    #[tokio::test]
    async fn test_sweep_skips_completed_rows() {
        let store = InMemoryPipelineStore::new();
        let day0 = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let c = store.create_contact(contact()).await.unwrap();
        let f = store
            .create_followup(c.id, day0 + Duration::days(10), day0)
            .await
            .unwrap();
        store
            .set_status(f.id, FollowupStatus::Completed, day0)
            .await
            .unwrap();

        let report = run_sweep(&store, day0 + Duration::days(20), true).await.unwrap();
        assert_eq!(report.followups_updated, 0);
        assert_eq!(report.contacts_repaired, Some(0));

        let rows = store.followups_for_contact(c.id).await.unwrap();
        assert_eq!(rows[0].days_remaining, 10);
        assert_eq!(rows[0].urgency, Urgency::Low);
    }
}
