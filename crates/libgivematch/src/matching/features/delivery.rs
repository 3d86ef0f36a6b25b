use libgivematch_macros::scoring_feature;

use crate::{
  matching::Feature,
  model::{DeliveryMode, Donation, Request},
  params::Thresholds,
};

#[scoring_feature(DeliveryCompatibility, name = "delivery_compatibility", reason = "compatible delivery", fallback = 0.5)]
fn score_feature(&self, _thresholds: &Thresholds, lhs: &Donation, rhs: &Request) -> Option<f64> {
  let preference = rhs.delivery_preference?;

  match (lhs.delivery_mode, preference) {
    (offered, wanted) if offered == wanted => Some(1.0),
    (DeliveryMode::Volunteer, _) | (_, DeliveryMode::Volunteer) => Some(0.8),
    _ => Some(0.3),
  }
}
