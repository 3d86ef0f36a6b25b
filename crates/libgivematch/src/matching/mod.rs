mod features;

use std::cmp::Ordering;

use itertools::Itertools;
use serde::Serialize;

use crate::params::{ParameterGroup, ParameterSnapshot, Thresholds};

pub(crate) mod donation_request;
pub(crate) mod geo;
pub(crate) mod task_volunteer;
pub(crate) mod text;

pub use self::{donation_request::DonationRequest, task_volunteer::TaskVolunteer};

/// Number of contributions named in a match reason.
const REASON_PARTS: usize = 2;
const WEAK_FIT_REASON: &str = "weak overall fit";

/// A pairing strategy: which features are scored for a kind of pair, and
/// which parameter group weighs them.
pub trait MatchingAlgorithm {
  type Lhs: 'static;
  type Rhs: 'static;

  fn name() -> &'static str;
  fn group() -> ParameterGroup;
  fn features() -> &'static [&'static dyn Feature<Self::Lhs, Self::Rhs>];

  fn score(snapshot: &ParameterSnapshot, lhs: &Self::Lhs, rhs: &Self::Rhs) -> Scored {
    run_features(snapshot, Self::features(), lhs, rhs)
  }
}

/// A single normalized sub-score between two records.
///
/// `score_feature` returns `None` when the records lack the data needed to
/// compare them. The aggregator then substitutes `fallback` and flags the
/// feature as unobserved.
pub trait Feature<L, R>: Send + Sync {
  fn name(&self) -> &'static str;
  fn reason(&self) -> &'static str;
  fn fallback(&self) -> f64;
  fn score_feature(&self, thresholds: &Thresholds, lhs: &L, rhs: &R) -> Option<f64>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureScore {
  pub name: &'static str,
  pub score: f64,
  pub weight: f64,
  pub observed: bool,
  #[serde(skip)]
  pub reason: &'static str,
}

impl FeatureScore {
  pub fn contribution(&self) -> f64 {
    self.score * self.weight
  }
}

/// Outcome of scoring one pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Scored {
  pub score: f64,
  pub features: Vec<FeatureScore>,
  pub reason: String,
}

impl Scored {
  pub fn feature(&self, name: &str) -> Option<&FeatureScore> {
    self.features.iter().find(|feature| feature.name == name)
  }

  /// Features that fell back to their default for lack of data.
  pub fn unobserved(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.features.iter().filter(|feature| !feature.observed).map(|feature| feature.name)
  }
}

/// Weighted sum of every feature, without renormalization.
pub(crate) fn run_features<L, R>(snapshot: &ParameterSnapshot, features: &[&dyn Feature<L, R>], lhs: &L, rhs: &R) -> Scored {
  let thresholds = snapshot.thresholds();
  let mut results = Vec::with_capacity(features.len());

  let score = features.iter().fold(0.0f64, |score, feature| {
    let weight = snapshot.weight(feature.name());

    let (feature_score, observed) = match feature.score_feature(thresholds, lhs, rhs) {
      Some(value) if value.is_finite() => (value.clamp(0.0, 1.0), true),
      _ => (feature.fallback(), false),
    };

    tracing::debug!(feature = feature.name(), score = feature_score, observed, "computed feature score");

    results.push(FeatureScore {
      name: feature.name(),
      score: feature_score,
      weight,
      observed,
      reason: feature.reason(),
    });

    score + (feature_score * weight)
  });

  let reason = match_reason(&results);

  Scored { score, features: results, reason }
}

/// Names the largest observed contributions, for display only.
fn match_reason(features: &[FeatureScore]) -> String {
  let reasons = features
    .iter()
    .filter(|feature| feature.observed && feature.contribution() > 0.0)
    .sorted_by(|lhs, rhs| rhs.contribution().partial_cmp(&lhs.contribution()).unwrap_or(Ordering::Equal))
    .take(REASON_PARTS)
    .map(|feature| feature.reason)
    .join(", ");

  match reasons.is_empty() {
    true => WEAK_FIT_REASON.to_string(),
    false => reasons,
  }
}

#[cfg(test)]
mod tests {
  use super::{FeatureScore, match_reason};

  fn feature(name: &'static str, reason: &'static str, score: f64, weight: f64) -> FeatureScore {
    FeatureScore {
      name,
      score,
      weight,
      observed: true,
      reason,
    }
  }

  #[test]
  fn reason_names_top_contributions() {
    let features = [feature("a", "nearby", 0.2, 0.5), feature("b", "same category", 1.0, 0.35), feature("c", "pressing need", 0.5, 0.3)];

    assert_eq!(match_reason(&features), "same category, pressing need");
  }

  #[test]
  fn reason_for_weak_fit() {
    let features = [feature("a", "nearby", 0.0, 0.5), feature("b", "same category", 1.0, 0.0)];

    assert_eq!(match_reason(&features), "weak overall fit");
  }

  #[test]
  fn reason_skips_fallbacks() {
    let mut fallback = feature("a", "nearby", 0.5, 0.5);
    fallback.observed = false;

    let features = [fallback, feature("b", "same category", 0.2, 0.35)];

    assert_eq!(match_reason(&features), "same category");
  }
}
