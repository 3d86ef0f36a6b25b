use std::marker::PhantomData;

use anyhow::Context;
use axum::{
  RequestPartsExt,
  extract::{FromRef, FromRequestParts},
  http::request::Parts,
};
use axum_extra::{
  TypedHeader,
  headers::{Authorization, authorization::Bearer},
};
use libgivematch::prelude::Store;

use crate::api::{AppState, errors::AppError};

/// Rejects requests lacking the configured bearer API key.
///
/// Lets everything through when no key is configured.
#[non_exhaustive]
pub(crate) struct Auth<S> {
  _marker: PhantomData<S>,
}

impl<T, S> FromRequestParts<T> for Auth<S>
where
  S: Store,
  T: Send + Sync,
  AppState<S>: FromRef<T>,
{
  type Rejection = AppError;

  async fn from_request_parts(parts: &mut Parts, state: &T) -> Result<Self, Self::Rejection> {
    let app_state = AppState::<S>::from_ref(state);

    let Some(api_key) = app_state.config.api_key else {
      return Ok(Auth { _marker: PhantomData });
    };

    let header = parts
      .extract::<TypedHeader<Authorization<Bearer>>>()
      .await
      .context("no authorization header found")
      .context(AppError::InvalidCredentials)?;

    if header.token() != api_key {
      return Err(AppError::InvalidCredentials);
    }

    Ok(Auth { _marker: PhantomData })
  }
}
