use libgivematch_macros::scoring_feature;

use crate::{
  matching::Feature,
  model::{Donation, Request, Urgency},
  params::Thresholds,
};

/// Bonus for perishable donations meeting pressing needs.
const URGENT_PAIRING_BOOST: f64 = 0.1;

#[scoring_feature(UrgencyAlignment, name = "urgency_alignment", reason = "pressing need", fallback = 0.5)]
fn score_feature(&self, _thresholds: &Thresholds, lhs: &Donation, rhs: &Request) -> Option<f64> {
  let urgency = rhs.urgency?;

  let score = match urgency {
    Urgency::Low => 0.25,
    Urgency::Medium => 0.5,
    Urgency::High => 0.75,
    Urgency::Critical => 1.0,
  };

  match lhs.urgent && urgency >= Urgency::High {
    true => Some((score + URGENT_PAIRING_BOOST).min(1.0)),
    false => Some(score),
  }
}
