use serde::{Deserialize, Serialize};

/// Probability-weighted value of an opportunity.
///
/// Inputs are expected to be validated already (`probability` in [0, 1],
/// `opportunity_value` >= 0).
pub fn expected_value(probability: f64, opportunity_value: f64) -> f64 {
    probability * opportunity_value
}

/// Raw funnel counters for one period (or a sum of periods).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelCounts {
    #[serde(default)]
    pub contacts_added: i64,
    #[serde(default)]
    pub responses: i64,
    #[serde(default)]
    pub interviews: i64,
    #[serde(default)]
    pub offers: i64,
}

impl FunnelCounts {
    pub fn forecast(&self) -> FunnelForecast {
        funnel_forecast(
            self.contacts_added,
            self.responses,
            self.interviews,
            self.offers,
        )
    }
}

/// Saturates instead of overflowing.
impl std::ops::Add for FunnelCounts {
    type Output = FunnelCounts;

    fn add(self, rhs: Self) -> Self::Output {
        FunnelCounts {
            contacts_added: self.contacts_added.saturating_add(rhs.contacts_added),
            responses: self.responses.saturating_add(rhs.responses),
            interviews: self.interviews.saturating_add(rhs.interviews),
            offers: self.offers.saturating_add(rhs.offers),
        }
    }
}

impl std::iter::Sum for FunnelCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(FunnelCounts::default(), |acc, c| acc + c)
    }
}

/// Stage conversion rates and the resulting offer forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FunnelForecast {
    pub response_rate: f64,
    pub interview_rate: f64,
    pub offer_rate: f64,
    pub forecast_offers: f64,
}

/// A zero denominator yields a rate of 0 instead of an error.
fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn funnel_forecast(
    contacts_added: i64,
    responses: i64,
    interviews: i64,
    offers: i64,
) -> FunnelForecast {
    let response_rate = rate(responses, contacts_added);
    let interview_rate = rate(interviews, responses);
    let offer_rate = rate(offers, interviews);

    FunnelForecast {
        response_rate,
        interview_rate,
        offer_rate,
        forecast_offers: contacts_added as f64 * response_rate * interview_rate * offer_rate,
    }
}
