use std::{borrow::Cow, error::Error};

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use axum_extra::extract::QueryRejection;
use libgivematch::prelude::*;
use serde_json::json;
use tracing::*;
use validator::{ValidationErrors, ValidationErrorsKind};

pub(crate) struct ApiError(pub StatusCode, pub String, pub Option<Vec<String>>);

#[derive(Debug, thiserror::Error)]
pub enum AppError {
  #[error("invalid credentials")]
  InvalidCredentials,
  #[error("missing resource")]
  ResourceNotFound,
  #[error(transparent)]
  OtherError(#[from] anyhow::Error),

  #[error("invalid configuration: {0}")]
  ConfigError(String),
  #[error("invalid matching parameters")]
  InvalidParameters(String),
  #[error("conflicting update")]
  Conflict(String),
  #[error("error from datastore")]
  StoreError(String),

  #[error("invalid query parameter")]
  InvalidQuery(#[from] QueryRejection),
  #[error("query failed validation")]
  ValidationFailed(#[from] ValidationErrors),
}

impl From<GivematchError> for AppError {
  fn from(value: GivematchError) -> Self {
    match value {
      GivematchError::ConfigError(err) => AppError::ConfigError(err),
      GivematchError::ResourceNotFound => AppError::ResourceNotFound,
      GivematchError::InvalidParameters(err) => AppError::InvalidParameters(err),
      err @ GivematchError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
      GivematchError::Conflict(err) => AppError::Conflict(err),
      GivematchError::StoreError(err) => AppError::StoreError(err.to_string()),
      GivematchError::OtherError(err) => AppError::OtherError(err),
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let response = ApiError::from(&self);

    match response.0.is_server_error() {
      true => error!(error = self.source(), "{}", self.to_string()),
      false => warn!(status = response.0.as_u16(), "{}", self.to_string()),
    }

    response.into_response()
  }
}

impl From<&AppError> for ApiError {
  fn from(value: &AppError) -> Self {
    match value {
      AppError::InvalidCredentials => ApiError(StatusCode::UNAUTHORIZED, value.to_string(), None),
      AppError::ResourceNotFound => ApiError(StatusCode::NOT_FOUND, value.to_string(), None),
      AppError::InvalidParameters(err) => ApiError(StatusCode::UNPROCESSABLE_ENTITY, value.to_string(), Some(vec![err.clone()])),
      AppError::Conflict(err) => ApiError(StatusCode::CONFLICT, value.to_string(), Some(vec![err.clone()])),
      AppError::StoreError(_) => ApiError(StatusCode::BAD_GATEWAY, value.to_string(), None),
      AppError::InvalidQuery(err) => ApiError(StatusCode::BAD_REQUEST, value.to_string(), Some(vec![err.to_string()])),
      AppError::ValidationFailed(errs) => ApiError(StatusCode::UNPROCESSABLE_ENTITY, value.to_string(), Some(validation_messages(errs))),
      AppError::OtherError(inner) if inner.is::<AppError>() => match inner.downcast_ref::<AppError>() {
        Some(inner) => inner.into(),
        _ => ApiError(StatusCode::INTERNAL_SERVER_ERROR, value.to_string(), None),
      },
      _ => ApiError(StatusCode::INTERNAL_SERVER_ERROR, value.to_string(), None),
    }
  }
}

/// Flattens nested validation errors into their messages.
pub(crate) fn validation_messages(errs: &ValidationErrors) -> Vec<String> {
  errs
    .errors()
    .iter()
    .flat_map(|(field, kind)| match kind {
      ValidationErrorsKind::Field(errors) => errors
        .iter()
        .map(|err| err.message.clone().map(Cow::into_owned).unwrap_or_else(|| format!("invalid value for {field}")))
        .collect::<Vec<_>>(),
      ValidationErrorsKind::Struct(errors) => validation_messages(errors),
      ValidationErrorsKind::List(errors) => errors.values().flat_map(|errors| validation_messages(errors)).collect(),
    })
    .collect()
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let payload = match self.2 {
      Some(details) => json!({
          "message": self.1.to_string(),
          "details": details,
      }),
      None => json!({
          "message": self.1.to_string(),
      }),
    };

    (self.0, Json(payload)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use axum::http::StatusCode;
  use libgivematch::prelude::*;

  use super::{ApiError, AppError};

  fn status(err: GivematchError) -> StatusCode {
    ApiError::from(&AppError::from(err)).0
  }

  #[test]
  fn library_errors_to_statuses() {
    assert_eq!(status(GivematchError::ResourceNotFound), StatusCode::NOT_FOUND);
    assert_eq!(status(GivematchError::InvalidParameters("weights".into())), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(status(GivematchError::Conflict("taken".into())), StatusCode::CONFLICT);
    assert_eq!(
      status(GivematchError::InvalidTransition {
        from: DonationStatus::Completed,
        to: DonationStatus::Available
      }),
      StatusCode::CONFLICT
    );
    assert_eq!(status(GivematchError::ConfigError("url".into())), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(status(GivematchError::OtherError(anyhow::anyhow!("boom"))), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn nested_validation_messages() {
    let mut params = MatchingParameters::defaults(ParameterGroup::DonationRequest);
    params.thresholds.auto_match = 1.5;

    let errs = validator::Validate::validate(&params).unwrap_err();

    assert!(super::validation_messages(&errs).contains(&"auto_match must be between 0 and 1".to_string()));
  }

  #[test]
  fn wrapped_app_errors() {
    let err = AppError::OtherError(anyhow::Error::from(AppError::InvalidCredentials));

    assert_eq!(ApiError::from(&err).0, StatusCode::UNAUTHORIZED);
  }
}
