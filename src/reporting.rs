//! Read-only aggregates for the dashboard and the funnel forecast.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::forecast::{FunnelCounts, FunnelForecast};
use crate::models::{Contact, Metric};

/// Probability at or above which a lead counts as "High".
pub const HIGH_PROBABILITY: f64 = 0.7;
/// Probability at or above which a lead counts as "Medium".
pub const MEDIUM_PROBABILITY: f64 = 0.4;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One bar of the monthly expected-value projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionPoint {
    pub name: String,
    pub year: Option<i32>,
    pub value: f64,
}

/// One slice of the lead-probability distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionSlice {
    pub name: &'static str,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub contacts: usize,
    pub expected_value: f64,
    pub total_pipeline: f64,
    pub projection_data: Vec<ProjectionPoint>,
    pub distribution_data: Vec<DistributionSlice>,
}

/// Sum of expected value per calendar month of `date_contacted`, oldest first.
/// An empty pipeline yields a single "No Data" point so charts still render.
pub fn monthly_projection(contacts: &[Contact]) -> Vec<ProjectionPoint> {
    let mut by_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for c in contacts {
        *by_month
            .entry((c.date_contacted.year(), c.date_contacted.month()))
            .or_default() += c.expected_value;
    }

    if by_month.is_empty() {
        return vec![ProjectionPoint {
            name: "No Data".to_string(),
            year: None,
            value: 0.0,
        }];
    }

    by_month
        .into_iter()
        .map(|((year, month), value)| ProjectionPoint {
            name: MONTH_ABBREVIATIONS[month0(month)].to_string(),
            year: Some(year),
            value,
        })
        .collect()
}

fn month0(month: u32) -> usize {
    (month.clamp(1, 12) - 1) as usize
}

/// Lead counts bucketed by win probability.
pub fn lead_distribution(contacts: &[Contact]) -> Vec<DistributionSlice> {
    let high = contacts
        .iter()
        .filter(|c| c.probability >= HIGH_PROBABILITY)
        .count();
    let medium = contacts
        .iter()
        .filter(|c| c.probability >= MEDIUM_PROBABILITY && c.probability < HIGH_PROBABILITY)
        .count();
    let low = contacts
        .iter()
        .filter(|c| c.probability < MEDIUM_PROBABILITY)
        .count();

    vec![
        DistributionSlice { name: "High (>70%)", value: high },
        DistributionSlice { name: "Medium (40-70%)", value: medium },
        DistributionSlice { name: "Low (<40%)", value: low },
    ]
}

pub fn build_dashboard(contacts: &[Contact]) -> Dashboard {
    Dashboard {
        contacts: contacts.len(),
        expected_value: contacts.iter().map(|c| c.expected_value).sum(),
        total_pipeline: contacts.iter().map(|c| c.opportunity_value).sum(),
        projection_data: monthly_projection(contacts),
        distribution_data: lead_distribution(contacts),
    }
}

/// Funnel forecast plus the counters it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelReport {
    pub week: Option<NaiveDate>,
    pub weeks_included: usize,
    pub totals: FunnelCounts,
    #[serde(flatten)]
    pub forecast: FunnelForecast,
}

/// Forecast over every recorded week, or only `week` when given.
pub fn funnel_report(metrics: &[Metric], week: Option<NaiveDate>) -> FunnelReport {
    let selected: Vec<&Metric> = metrics
        .iter()
        .filter(|m| week.map_or(true, |w| m.week == w))
        .collect();

    let totals: FunnelCounts = selected
        .iter()
        .map(|m| FunnelCounts {
            contacts_added: m.contacts_added,
            responses: m.responses,
            interviews: m.interviews,
            offers: m.offers,
        })
        .sum();

    FunnelReport {
        week,
        weeks_included: selected.len(),
        totals,
        forecast: totals.forecast(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn contact(date: (i32, u32, u32), probability: f64, value: f64) -> Contact {
        Contact {
            id: 0,
            company: "Acme".into(),
            contact_name: "Ada".into(),
            designation: None,
            department: None,
            email: None,
            linkedin: None,
            date_contacted: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            next_followup: None,
            status: "New Lead".into(),
            priority_score: 0.0,
            probability,
            opportunity_value: value,
            expected_value: probability * value,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_dashboard() {
        let d = build_dashboard(&[]);
        assert_eq!(d.contacts, 0);
        assert_eq!(d.expected_value, 0.0);
        assert_eq!(d.projection_data.len(), 1);
        assert_eq!(d.projection_data[0].name, "No Data");
        assert!(d.distribution_data.iter().all(|s| s.value == 0));
    }

    #[test]
    fn test_projection_groups_by_month_chronologically() {
        let contacts = vec![
            contact((2025, 3, 2), 0.5, 1_000.0),
            contact((2024, 12, 30), 1.0, 200.0),
            contact((2025, 3, 28), 0.25, 400.0),
        ];
        let points = monthly_projection(&contacts);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].name, "Dec");
        assert_eq!(points[0].year, Some(2024));
        assert_eq!(points[0].value, 200.0);
        assert_eq!(points[1].name, "Mar");
        assert_eq!(points[1].value, 600.0);
    }

    #[test]
    fn test_distribution_thresholds() {
        let contacts = vec![
            contact((2025, 1, 1), 0.7, 1.0),
            contact((2025, 1, 1), 0.69, 1.0),
            contact((2025, 1, 1), 0.4, 1.0),
            contact((2025, 1, 1), 0.39, 1.0),
            contact((2025, 1, 1), 0.0, 1.0),
        ];
        let slices = lead_distribution(&contacts);
        assert_eq!(slices[0].value, 1);
        assert_eq!(slices[1].value, 2);
        assert_eq!(slices[2].value, 2);
    }

    #[test]
    fn test_dashboard_totals() {
        let contacts = vec![
            contact((2025, 1, 1), 0.5, 10_000.0),
            contact((2025, 2, 1), 0.1, 2_000.0),
        ];
        let d = build_dashboard(&contacts);
        assert_eq!(d.contacts, 2);
        assert_eq!(d.total_pipeline, 12_000.0);
        assert!((d.expected_value - 5_200.0).abs() < 1e-9);
    }

    #[test]
    fn test_funnel_report_filters_week() {
        let w1 = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let w2 = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        let metrics = vec![
            Metric { id: 1, week: w1, contacts_added: 60, responses: 12, interviews: 3, offers: 1 },
            Metric { id: 2, week: w2, contacts_added: 40, responses: 8, interviews: 2, offers: 0 },
        ];

        let all = funnel_report(&metrics, None);
        assert_eq!(all.weeks_included, 2);
        assert_eq!(all.totals.contacts_added, 100);
        assert!((all.forecast.forecast_offers - 1.0).abs() < 1e-9);

        let second = funnel_report(&metrics, Some(w2));
        assert_eq!(second.weeks_included, 1);
        assert_eq!(second.forecast.offer_rate, 0.0);
    }

    #[test]
    fn test_funnel_report_large_counts_do_not_overflow() {
        let w = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let metrics = vec![
            Metric { id: 1, week: w, contacts_added: i64::MAX, responses: 0, interviews: 0, offers: 0 },
            Metric { id: 2, week: w, contacts_added: i64::MAX, responses: 0, interviews: 0, offers: 0 },
        ];

        let report = funnel_report(&metrics, Some(w));
        assert_eq!(report.weeks_included, 2);
        assert_eq!(report.totals.contacts_added, i64::MAX);
        assert_eq!(report.forecast.forecast_offers, 0.0);
    }
}
