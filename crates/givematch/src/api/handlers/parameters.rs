use axum::{
  Json,
  extract::{Path, State},
};
use libgivematch::prelude::*;
use tracing::instrument;

use crate::api::{
  AppState,
  dto::{ParametersResponse, UpdateParameters},
  errors::AppError,
  middlewares::{auth::Auth, json_rejection::TypedJson},
};

fn parse_group(group: &str) -> Result<ParameterGroup, AppError> {
  group.parse().map_err(|_| AppError::ResourceNotFound)
}

#[instrument(skip_all, fields(group = %group))]
pub async fn get_parameters<S: Store>(State(state): State<AppState<S>>, _: Auth<S>, Path(group): Path<String>) -> Result<Json<ParametersResponse>, AppError> {
  let snapshot = state.givematch.parameters(parse_group(&group)?).await?;

  Ok(Json(snapshot.into()))
}

#[instrument(skip_all, fields(group = %group))]
pub async fn put_parameters<S: Store>(
  State(state): State<AppState<S>>,
  _: Auth<S>,
  Path(group): Path<String>,
  TypedJson(body): TypedJson<UpdateParameters>,
) -> Result<Json<ParametersResponse>, AppError> {
  let group = parse_group(&group)?;
  let snapshot = state.givematch.update_parameters(group, body.parameters, body.expected_version).await?;

  tracing::info!(group = group.as_str(), version = snapshot.version, "matching parameters updated");

  Ok(Json(snapshot.into()))
}
