use chrono::{Duration, NaiveDate};
use std::env;
use std::sync::Arc;

use rust_followup_api::data::db_storage::PgPipelineStore;
use rust_followup_api::db::Database;
use rust_followup_api::models::{FollowupStatus, NewContact};
use rust_followup_api::store::PipelineStore;
use rust_followup_api::sweep::run_sweep;
use rust_followup_api::urgency::Urgency;

async fn connect() -> anyhow::Result<PgPipelineStore> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url, 2).await?;
    db.ensure_schema().await?;
    Ok(PgPipelineStore::new(db.pool.clone()))
}

fn new_contact(company: &str) -> NewContact {
    NewContact {
        company: company.to_string(),
        contact_name: "Integration Test".to_string(),
        designation: None,
        department: None,
        email: Some("it@example.com".to_string()),
        linkedin: None,
        date_contacted: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        status: "New Lead".to_string(),
        priority_score: 1.0,
        probability: 0.5,
        opportunity_value: 2_000.0,
        notes: None,
    }
}

/// Completion moves `next_followup` to the remaining pending follow-up.
/// Marked ignored so it only runs against a disposable database; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn completing_followup_advances_next_followup() -> anyhow::Result<()> {
    let store = connect().await?;
    let today = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();

    let contact = store.create_contact(new_contact("Pg Completion Co")).await?;
    assert_eq!(contact.expected_value, 1_000.0);

    let first = store
        .create_followup(contact.id, today + Duration::days(2), today)
        .await?;
    let second = store
        .create_followup(contact.id, today + Duration::days(10), today)
        .await?;
    assert_eq!(first.urgency, Urgency::High);
    assert_eq!(second.urgency, Urgency::Low);

    let c = store.get_contact(contact.id).await?;
    assert_eq!(c.next_followup, Some(first.followup_date));

    store
        .set_status(first.id, FollowupStatus::Completed, today)
        .await?;
    let c = store.get_contact(contact.id).await?;
    assert_eq!(c.next_followup, Some(second.followup_date));

    store.delete_followup(second.id).await?;
    store.delete_followup(second.id).await?;
    let c = store.get_contact(contact.id).await?;
    assert_eq!(c.next_followup, None);

    store.delete_contact(contact.id).await?;
    assert!(store.get_contact(contact.id).await.is_err());
    Ok(())
}

/// The sweep re-classifies pending rows and leaves consistent contacts alone.
#[tokio::test]
#[ignore]
async fn sweep_reclassifies_pending_rows() -> anyhow::Result<()> {
    let store = connect().await?;
    let today = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();

    let contact = store.create_contact(new_contact("Pg Sweep Co")).await?;
    let f = store
        .create_followup(contact.id, today + Duration::days(5), today)
        .await?;
    assert_eq!(f.urgency, Urgency::Medium);

    let later = today + Duration::days(6);
    run_sweep(&store, later, true).await?;
    let rows = store.followups_for_contact(contact.id).await?;
    assert_eq!(rows[0].days_remaining, -1);
    assert_eq!(rows[0].urgency, Urgency::Overdue);

    let c = store.get_contact(contact.id).await?;
    assert_eq!(c.next_followup, Some(f.followup_date));

    store.delete_contact(contact.id).await?;
    Ok(())
}

/// Concurrent completes and deletes on one contact leave no stale pointer.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_complete_and_delete_clear_pointer() -> anyhow::Result<()> {
    let store = Arc::new(connect().await?);
    let today = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();

    let contact = store.create_contact(new_contact("Pg Concurrent Close Co")).await?;
    let mut ids = Vec::new();
    for d in 1..=12 {
        let f = store
            .create_followup(contact.id, today + Duration::days(d), today)
            .await?;
        ids.push(f.id);
    }

    let mut handles = Vec::new();
    for (i, id) in ids.into_iter().enumerate() {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                store
                    .set_status(id, FollowupStatus::Completed, today)
                    .await
                    .map(|_| ())
            } else {
                store.delete_followup(id).await
            }
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let c = store.get_contact(contact.id).await?;
    assert_eq!(c.next_followup, None);

    store.delete_contact(contact.id).await?;
    Ok(())
}

/// Concurrent creates on one contact leave the pointer at the minimum date.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_creates_keep_minimum() -> anyhow::Result<()> {
    let store = Arc::new(connect().await?);
    let today = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();

    let contact = store.create_contact(new_contact("Pg Concurrent Create Co")).await?;
    let contact_id = contact.id;

    let mut handles = Vec::new();
    for d in (1..=12).rev() {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .create_followup(contact_id, today + Duration::days(d), today)
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let c = store.get_contact(contact_id).await?;
    assert_eq!(c.next_followup, Some(today + Duration::days(1)));

    store.delete_contact(contact_id).await?;
    Ok(())
}
