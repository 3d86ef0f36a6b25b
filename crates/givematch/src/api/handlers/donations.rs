use axum::{
  Json,
  extract::{Path, State},
};
use libgivematch::prelude::*;
use tracing::instrument;

use crate::api::{
  AppState,
  dto::StatusPayload,
  errors::AppError,
  middlewares::{auth::Auth, json_rejection::TypedJson},
};

#[instrument(skip_all, fields(donation_id = %id, to = %body.status))]
pub async fn transition_donation<S: Store>(
  State(state): State<AppState<S>>,
  _: Auth<S>,
  Path(id): Path<String>,
  TypedJson(body): TypedJson<StatusPayload>,
) -> Result<Json<Donation>, AppError> {
  Ok(Json(state.givematch.transition_donation(&id, body.status).await?))
}
