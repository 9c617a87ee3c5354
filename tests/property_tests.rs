/// Property-based tests using proptest
/// Tests invariants and properties that should hold for all inputs
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_followup_api::data::memory_store::InMemoryPipelineStore;
use rust_followup_api::data::store::PipelineStore;
use rust_followup_api::forecast::{expected_value, funnel_forecast};
use rust_followup_api::models::{Contact, Followup, FollowupStatus, NewContact};
use rust_followup_api::sweep::run_sweep;
use rust_followup_api::urgency::{classify, Urgency};

fn base_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

// Property: urgency tiers partition the day offsets
proptest! {
    #[test]
    fn urgency_matches_thresholds(today_offset in -3650i64..3650, delta in -400i64..400) {
        let today = base_day() + Duration::days(today_offset);
        let date = today + Duration::days(delta);
        let c = classify(date, today);

        prop_assert_eq!(c.days_remaining, delta);
        prop_assert_eq!(c.urgency == Urgency::Overdue, date < today);
        prop_assert_eq!(
            c.urgency == Urgency::High,
            today <= date && date <= today + Duration::days(2)
        );
        prop_assert_eq!(
            c.urgency == Urgency::Medium,
            today + Duration::days(3) <= date && date <= today + Duration::days(7)
        );
        prop_assert_eq!(c.urgency == Urgency::Low, date > today + Duration::days(7));
    }

    #[test]
    fn expected_value_bounded_by_opportunity(p in 0.0f64..=1.0, v in 0.0f64..1e9) {
        let ev = expected_value(p, v);
        prop_assert!(ev >= 0.0);
        prop_assert!(ev <= v);
    }

    #[test]
    fn funnel_rates_never_nan(
        contacts in 0i64..10_000,
        responses in 0i64..10_000,
        interviews in 0i64..10_000,
        offers in 0i64..10_000
    ) {
        let f = funnel_forecast(contacts, responses, interviews, offers);
        prop_assert!(f.response_rate.is_finite());
        prop_assert!(f.interview_rate.is_finite());
        prop_assert!(f.offer_rate.is_finite());
        prop_assert!(f.forecast_offers.is_finite());
    }
}

#[derive(Debug, Clone)]
enum Op {
    Create { contact: usize, offset: i64 },
    Complete { pick: usize },
    Cancel { pick: usize },
    Reopen { pick: usize },
    Delete { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..3, -10i64..30).prop_map(|(contact, offset)| Op::Create { contact, offset }),
        2 => any::<usize>().prop_map(|pick| Op::Complete { pick }),
        1 => any::<usize>().prop_map(|pick| Op::Cancel { pick }),
        1 => any::<usize>().prop_map(|pick| Op::Reopen { pick }),
        2 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
    ]
}

fn new_contact(i: usize) -> NewContact {
    NewContact {
        company: format!("Company {}", i),
        contact_name: format!("Person {}", i),
        designation: None,
        department: None,
        email: None,
        linkedin: None,
        date_contacted: base_day(),
        status: "New Lead".to_string(),
        priority_score: 0.0,
        probability: 0.5,
        opportunity_value: 1_000.0,
        notes: None,
    }
}

/// Apply `ops` to a fresh store and return the final contacts and follow-ups.
fn run_ops(ops: &[Op]) -> (Vec<Contact>, Vec<Followup>) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    rt.block_on(async {
        let store = InMemoryPipelineStore::new();
        let today = base_day();
        let mut contact_ids = Vec::new();
        for i in 0..3 {
            contact_ids.push(store.create_contact(new_contact(i)).await.unwrap().id);
        }
        // Ids ever issued, including deleted ones, so ops also hit absent rows
        let mut followup_ids: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Create { contact, offset } => {
                    let f = store
                        .create_followup(contact_ids[*contact], today + Duration::days(*offset), today)
                        .await
                        .unwrap();
                    followup_ids.push(f.id);
                }
                Op::Complete { pick } | Op::Cancel { pick } | Op::Reopen { pick } => {
                    if followup_ids.is_empty() {
                        continue;
                    }
                    let id = followup_ids[pick % followup_ids.len()];
                    let status = match op {
                        Op::Complete { .. } => FollowupStatus::Completed,
                        Op::Cancel { .. } => FollowupStatus::Cancelled,
                        _ => FollowupStatus::Pending,
                    };
                    // Deleted ids answer NotFound; anything else is a bug
                    if let Err(e) = store.set_status(id, status, today).await {
                        assert!(e.is_not_found());
                    }
                }
                Op::Delete { pick } => {
                    if followup_ids.is_empty() {
                        continue;
                    }
                    let id = followup_ids[pick % followup_ids.len()];
                    store.delete_followup(id).await.unwrap();
                }
            }
        }

        let contacts = store.list_contacts().await.unwrap();
        let mut followups = Vec::new();
        for id in &contact_ids {
            followups.extend(store.followups_for_contact(*id).await.unwrap());
        }
        (contacts, followups)
    })
}

// Property: next_followup always equals the minimum pending date
proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn next_followup_tracks_min_pending(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let (contacts, followups) = run_ops(&ops);

        for contact in &contacts {
            let expected = followups
                .iter()
                .filter(|f| f.contact_id == contact.id && f.status == FollowupStatus::Pending)
                .map(|f| f.followup_date)
                .min();
            prop_assert_eq!(contact.next_followup, expected, "contact {}", contact.id);
        }
    }

    #[test]
    fn sweep_is_idempotent_within_a_day(
        offsets in prop::collection::vec(-20i64..40, 0..20),
        sweep_offset in 0i64..30
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let (first, second) = rt.block_on(async {
            let store = InMemoryPipelineStore::new();
            let c = store.create_contact(new_contact(0)).await.unwrap();
            for offset in &offsets {
                store
                    .create_followup(c.id, base_day() + Duration::days(*offset), base_day())
                    .await
                    .unwrap();
            }
            let sweep_day = base_day() + Duration::days(sweep_offset);
            run_sweep(&store, sweep_day, true).await.unwrap();
            let first = store.list_followups(true).await.unwrap();
            run_sweep(&store, sweep_day, true).await.unwrap();
            let second = store.list_followups(true).await.unwrap();
            (first, second)
        });

        prop_assert_eq!(first, second);
    }
}
