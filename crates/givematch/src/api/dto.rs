use std::{borrow::Cow, sync::Arc};

use libgivematch::prelude::*;
use serde::{Deserialize, Serialize};
use serde_inline_default::serde_inline_default;
use validator::{Validate, ValidationError};

#[serde_inline_default]
#[derive(Clone, Debug, Deserialize, Validate)]
pub(crate) struct MatchQuery {
  #[serde(default)]
  #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
  pub limit: Option<usize>,
  #[serde_inline_default(false)]
  pub apply: bool,
}

impl From<MatchQuery> for MatchOptions {
  fn from(query: MatchQuery) -> Self {
    MatchOptions { limit: query.limit, apply: query.apply }
  }
}

/// Ad-hoc pair to score without touching the datastore.
#[derive(Clone, Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_locations"))]
pub(crate) struct ScorePayload {
  pub donation: Donation,
  pub request: Request,
}

fn validate_locations(payload: &ScorePayload) -> Result<(), ValidationError> {
  for location in [&payload.donation.location, &payload.request.location] {
    if location.coordinates.is_some_and(|point| !point.is_valid()) {
      return Err(ValidationError::new("coordinates").with_message(Cow::Borrowed("coordinates must be a valid latitude and longitude")));
    }
  }

  Ok(())
}

#[derive(Serialize)]
pub(crate) struct ScoreResponse {
  pub parameters_version: u64,
  #[serde(flatten)]
  pub scored: Scored,
  pub unobserved: Vec<&'static str>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub(crate) struct UpdateParameters {
  pub expected_version: u64,
  #[serde(flatten)]
  #[validate(nested)]
  pub parameters: MatchingParameters,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub(crate) struct StatusPayload {
  pub status: DonationStatus,
}

#[derive(Serialize)]
pub(crate) struct ParametersResponse {
  #[serde(flatten)]
  pub snapshot: Arc<ParameterSnapshot>,
  pub weight_sum: f64,
  pub normalized: bool,
}

impl From<Arc<ParameterSnapshot>> for ParametersResponse {
  fn from(snapshot: Arc<ParameterSnapshot>) -> Self {
    ParametersResponse {
      weight_sum: snapshot.parameters.weight_sum(),
      normalized: snapshot.parameters.is_normalized(),
      snapshot,
    }
  }
}
