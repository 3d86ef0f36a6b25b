use std::{borrow::Cow, collections::BTreeMap, fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use validator::{Validate, ValidationError};

use crate::{
  error::GivematchError,
  matching::{DonationRequest, MatchingAlgorithm, TaskVolunteer},
};

/// Tolerance under which a weight vector is considered to sum to one.
const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Independent sets of matching parameters, one per kind of pairing.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ParameterGroup {
  DonationRequest,
  TaskVolunteer,
}

impl ParameterGroup {
  pub fn as_str(self) -> &'static str {
    match self {
      ParameterGroup::DonationRequest => "donation_request",
      ParameterGroup::TaskVolunteer => "task_volunteer",
    }
  }

  /// Names of the features scored for this group, in evaluation order.
  pub fn feature_names(self) -> Vec<&'static str> {
    match self {
      ParameterGroup::DonationRequest => DonationRequest::features().iter().map(|feature| feature.name()).collect(),
      ParameterGroup::TaskVolunteer => TaskVolunteer::features().iter().map(|feature| feature.name()).collect(),
    }
  }
}

impl fmt::Display for ParameterGroup {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ParameterGroup {
  type Err = GivematchError;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "donation_request" => Ok(ParameterGroup::DonationRequest),
      "task_volunteer" => Ok(ParameterGroup::TaskVolunteer),
      other => Err(GivematchError::InvalidParameters(format!("unknown parameter group: {other}"))),
    }
  }
}

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Validate)]
#[validate(schema(function = "validate_thresholds"))]
pub struct Thresholds {
  /// Top score at or above which a pairing is committed automatically.
  #[serde_inline_default(0.85)]
  #[validate(range(min = 0.0, max = 1.0, message = "auto_claim must be between 0 and 1"))]
  pub auto_claim: f64,
  /// Score at or above which the other party is notified of the pairing.
  #[serde_inline_default(0.7)]
  #[validate(range(min = 0.0, max = 1.0, message = "auto_match must be between 0 and 1"))]
  pub auto_match: f64,
  /// Distance at which proximity decays to zero.
  #[serde_inline_default(50.0)]
  #[validate(range(exclusive_min = 0.0, message = "max_distance_km must be positive"))]
  pub max_distance_km: f64,
  #[serde_inline_default(200)]
  #[validate(range(min = 1, max = 1000, message = "candidate_limit must be between 1 and 1000"))]
  pub candidate_limit: usize,
  #[serde_inline_default(10)]
  #[validate(range(min = 1, max = 100, message = "top_k must be between 1 and 100"))]
  pub top_k: usize,
}

impl Default for Thresholds {
  fn default() -> Self {
    Thresholds {
      auto_claim: 0.85,
      auto_match: 0.7,
      max_distance_km: 50.0,
      candidate_limit: 200,
      top_k: 10,
    }
  }
}

fn validate_thresholds(thresholds: &Thresholds) -> Result<(), ValidationError> {
  if ![thresholds.auto_claim, thresholds.auto_match, thresholds.max_distance_km].iter().all(|value| value.is_finite()) {
    return Err(ValidationError::new("non_finite").with_message(Cow::Borrowed("thresholds must be finite numbers")));
  }

  if thresholds.auto_match > thresholds.auto_claim {
    return Err(ValidationError::new("threshold_order").with_message(Cow::Borrowed("auto_match cannot be above auto_claim")));
  }

  Ok(())
}

fn validate_weights(weights: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
  for (name, weight) in weights {
    if !weight.is_finite() || !(0.0..=1.0).contains(weight) {
      return Err(ValidationError::new("weight_range").with_message(Cow::Owned(format!("weight {name} must be between 0 and 1"))));
    }
  }

  Ok(())
}

/// Admin-editable settings governing one parameter group.
///
/// Weights are deliberately not required to sum to one: a vector summing
/// above one yields scores above one. [`MatchingParameters::weight_sum`] is
/// exposed so callers can report on it.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Validate)]
pub struct MatchingParameters {
  #[validate(custom(function = "validate_weights"), length(min = 1, message = "at least one weight must be given"))]
  pub weights: BTreeMap<String, f64>,
  #[serde(default)]
  #[validate(nested)]
  pub thresholds: Thresholds,
}

impl MatchingParameters {
  pub fn defaults(group: ParameterGroup) -> MatchingParameters {
    let weights: &[(&str, f64)] = match group {
      ParameterGroup::DonationRequest => &[
        ("proximity", 0.30),
        ("item_compatibility", 0.35),
        ("urgency_alignment", 0.15),
        ("delivery_compatibility", 0.10),
        ("donor_reliability", 0.10),
      ],
      ParameterGroup::TaskVolunteer => &[("proximity", 0.40), ("availability", 0.25), ("skills", 0.20), ("volunteer_reliability", 0.15)],
    };

    MatchingParameters {
      weights: weights.iter().map(|(name, weight)| (name.to_string(), *weight)).collect(),
      thresholds: Thresholds::default(),
    }
  }

  /// Weight assigned to a feature, zero when unset.
  pub fn weight(&self, feature: &str) -> f64 {
    self.weights.get(feature).copied().unwrap_or(0.0)
  }

  pub fn weight_sum(&self) -> f64 {
    self.weights.values().sum()
  }

  pub fn is_normalized(&self) -> bool {
    (self.weight_sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
  }

  /// Validates field ranges and rejects weights for features the group does not score.
  pub fn validate_for(&self, group: ParameterGroup) -> Result<(), GivematchError> {
    self.validate().map_err(|err| GivematchError::InvalidParameters(err.to_string()))?;

    let known = group.feature_names();

    if let Some(unknown) = self.weights.keys().find(|name| !known.contains(&name.as_str())) {
      return Err(GivematchError::InvalidParameters(format!("unknown feature {unknown} for group {group}")));
    }

    Ok(())
  }
}

/// An immutable, versioned view of a parameter group.
///
/// A scoring batch holds on to one snapshot for its whole duration, so
/// concurrent edits only apply to subsequent batches.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ParameterSnapshot {
  pub group: ParameterGroup,
  pub version: u64,
  pub parameters: MatchingParameters,
  pub loaded_at: Timestamp,
}

impl ParameterSnapshot {
  pub fn new(group: ParameterGroup, version: u64, parameters: MatchingParameters) -> ParameterSnapshot {
    if !parameters.is_normalized() {
      tracing::warn!(group = group.as_str(), version, sum = parameters.weight_sum(), "matching weights do not sum to 1, scores are not bounded to [0, 1]");
    }

    ParameterSnapshot {
      group,
      version,
      parameters,
      loaded_at: Timestamp::now(),
    }
  }

  /// Built-in parameters, used when the store holds none for the group.
  pub fn defaults(group: ParameterGroup) -> ParameterSnapshot {
    ParameterSnapshot::new(group, 0, MatchingParameters::defaults(group))
  }

  pub fn weight(&self, feature: &str) -> f64 {
    self.parameters.weight(feature)
  }

  pub fn thresholds(&self) -> &Thresholds {
    &self.parameters.thresholds
  }
}
