mod donations;
mod matching;
mod parameters;
mod score;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use libgivematch::prelude::*;

use crate::api::AppState;
use crate::api::errors::AppError;

pub(super) use self::donations::transition_donation;
pub(super) use self::matching::{match_donation, match_request, match_task};
pub(super) use self::parameters::{get_parameters, put_parameters};
pub(super) use self::score::score;

pub async fn not_found() -> impl IntoResponse {
  AppError::ResourceNotFound
}

pub async fn healthz() -> StatusCode {
  StatusCode::OK
}

pub async fn readyz<S: Store>(State(state): State<AppState<S>>) -> StatusCode {
  match state.givematch.health().await {
    Ok(true) => StatusCode::OK,
    Ok(false) => StatusCode::SERVICE_UNAVAILABLE,

    Err(err) => {
      tracing::warn!(error = %err, "could not reach datastore");

      StatusCode::SERVICE_UNAVAILABLE
    }
  }
}

pub async fn prometheus<S: Store>(State(state): State<AppState<S>>) -> Result<impl IntoResponse, AppError> {
  match state.prometheus {
    Some(handle) => Ok(handle.render()),
    None => Err(AppError::ResourceNotFound),
  }
}
