use axum::{
  Json,
  extract::{Path, State},
};
use axum_extra::extract::{Query, WithRejection};
use libgivematch::prelude::*;
use tracing::instrument;
use validator::Validate;

use crate::api::{AppState, dto::MatchQuery, errors::AppError, middlewares::auth::Auth};

type MatchParams = WithRejection<Query<MatchQuery>, AppError>;

#[instrument(skip_all, fields(donation_id = %id))]
pub async fn match_donation<S: Store>(
  State(state): State<AppState<S>>,
  _: Auth<S>,
  Path(id): Path<String>,
  WithRejection(Query(query), _): MatchParams,
) -> Result<Json<MatchReport<Request>>, AppError> {
  query.validate()?;

  Ok(Json(state.givematch.match_donation(&id, query.into()).await?))
}

#[instrument(skip_all, fields(request_id = %id))]
pub async fn match_request<S: Store>(
  State(state): State<AppState<S>>,
  _: Auth<S>,
  Path(id): Path<String>,
  WithRejection(Query(query), _): MatchParams,
) -> Result<Json<MatchReport<Donation>>, AppError> {
  query.validate()?;

  Ok(Json(state.givematch.match_request(&id, query.into()).await?))
}

#[instrument(skip_all, fields(task_id = %id))]
pub async fn match_task<S: Store>(
  State(state): State<AppState<S>>,
  _: Auth<S>,
  Path(id): Path<String>,
  WithRejection(Query(query), _): MatchParams,
) -> Result<Json<MatchReport<Volunteer>>, AppError> {
  query.validate()?;

  Ok(Json(state.givematch.match_task(&id, query.into()).await?))
}
