use axum::{Json, extract::State};
use libgivematch::prelude::*;
use tracing::instrument;

use crate::api::{
  AppState,
  dto::{ScorePayload, ScoreResponse},
  errors::AppError,
  middlewares::{auth::Auth, json_rejection::TypedJson},
};

#[instrument(skip_all)]
pub async fn score<S: Store>(State(state): State<AppState<S>>, _: Auth<S>, TypedJson(payload): TypedJson<ScorePayload>) -> Result<Json<ScoreResponse>, AppError> {
  let (parameters_version, scored) = state.givematch.score_pair(&payload.donation, &payload.request).await?;

  Ok(Json(ScoreResponse {
    parameters_version,
    unobserved: scored.unobserved().collect(),
    scored,
  }))
}
