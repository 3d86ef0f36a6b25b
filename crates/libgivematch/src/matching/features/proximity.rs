use libgivematch_macros::scoring_feature;

use crate::{
  matching::{
    Feature,
    geo::{distance_decay, haversine_km},
    text::same_label,
  },
  model::Located,
  params::Thresholds,
};

// Coordinates win over cities; the city fallback is all-or-nothing.
#[scoring_feature(Proximity, name = "proximity", reason = "nearby", fallback = 0.0)]
fn score_feature<L: Located, R: Located>(&self, thresholds: &Thresholds, lhs: &L, rhs: &R) -> Option<f64> {
  let (lhs, rhs) = (lhs.location(), rhs.location());

  if let (Some(lhs), Some(rhs)) = (lhs.point(), rhs.point()) {
    return Some(distance_decay(haversine_km(lhs, rhs), thresholds.max_distance_km));
  }

  match (lhs.city.as_deref(), rhs.city.as_deref()) {
    (Some(lhs), Some(rhs)) if !lhs.trim().is_empty() && !rhs.trim().is_empty() => match same_label(lhs, rhs) {
      true => Some(1.0),
      false => Some(0.0),
    },

    _ => None,
  }
}
