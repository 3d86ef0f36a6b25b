use libgivematch_macros::scoring_feature;

use crate::{
  matching::{
    Feature,
    text::{same_label, token_overlap},
  },
  model::{Donation, Request},
  params::Thresholds,
};

const CATEGORY_BASE: f64 = 0.6;
const QUANTITY_SHARE: f64 = 0.4;
const TITLE_BONUS: f64 = 0.2;

/// Quantity used when the donor did not say how much is offered.
const UNKNOWN_QUANTITY_RATIO: f64 = 0.5;

#[scoring_feature(ItemCompatibility, name = "item_compatibility", reason = "same category", fallback = 0.0)]
fn score_feature(&self, _thresholds: &Thresholds, lhs: &Donation, rhs: &Request) -> Option<f64> {
  if lhs.category.trim().is_empty() || rhs.category.trim().is_empty() {
    return None;
  }

  let title_overlap = token_overlap(&lhs.title, &rhs.title);

  if !same_label(&lhs.category, &rhs.category) {
    return Some(TITLE_BONUS * title_overlap);
  }

  let quantity = quantity_ratio(lhs.quantity, rhs.quantity_needed);

  Some((CATEGORY_BASE + QUANTITY_SHARE * quantity + TITLE_BONUS * title_overlap).min(1.0))
}

/// How much of the need the offer covers, capped at 1.0.
pub(crate) fn quantity_ratio(offered: Option<f64>, needed: Option<f64>) -> f64 {
  match (offered.filter(|q| q.is_finite()), needed.filter(|q| q.is_finite())) {
    (Some(offered), _) if offered <= 0.0 => 0.0,
    (Some(offered), Some(needed)) if needed > 0.0 => (offered / needed).min(1.0),
    (Some(_), _) => 1.0,
    (None, _) => UNKNOWN_QUANTITY_RATIO,
  }
}
