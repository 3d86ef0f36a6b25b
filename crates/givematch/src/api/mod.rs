use std::time::Duration;

use axum::{
  Router, middleware,
  http::StatusCode,
  routing::{get, post, put},
};
use jiff::Timestamp;
use libgivematch::prelude::*;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{api::config::Config, trace::build_prometheus};

pub mod config;
pub mod dto;
pub mod errors;

pub mod handlers;
mod middlewares;

#[derive(Clone)]
pub struct AppState<S: Store> {
  pub config: Config,
  pub prometheus: Option<PrometheusHandle>,
  pub givematch: Givematch<S>,
}

pub async fn routes<S: Store>(config: &Config, store: S) -> anyhow::Result<Router> {
  let givematch = Givematch::new(store)
    .config(GivematchConfig {
      parameters_ttl: config.parameters_ttl,
    })
    .build();

  if !config.expiry_interval.is_zero() {
    tokio::spawn(expire_donations(givematch.clone(), config.expiry_interval));
  }

  let prometheus = match config.enable_prometheus {
    true => Some(build_prometheus()?),
    false => None,
  };

  let state = AppState {
    config: config.clone(),
    prometheus,
    givematch,
  };

  Ok(router(state))
}

pub fn router<S: Store>(state: AppState<S>) -> Router {
  Router::new()
    .route("/score", post(handlers::score::<S>))
    .route("/match/donations/{id}", post(handlers::match_donation::<S>))
    .route("/match/requests/{id}", post(handlers::match_request::<S>))
    .route("/match/tasks/{id}", post(handlers::match_task::<S>))
    .route("/parameters/{group}", get(handlers::get_parameters::<S>).put(handlers::put_parameters::<S>))
    .route("/donations/{id}/status", put(handlers::transition_donation::<S>))
    .fallback(handlers::not_found)
    .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.config.request_timeout))
    .layer(middleware::from_fn(middlewares::metrics))
    .layer(TraceLayer::new_for_http().make_span_with(middlewares::create_request_span))
    // The routes below will not go through the observability middlewares above
    .route("/healthz", get(handlers::healthz))
    .route("/readyz", get(handlers::readyz::<S>))
    .route("/metrics", get(handlers::prometheus::<S>))
    .layer(middleware::from_fn(middlewares::logging::api_logger))
    .layer(middleware::from_fn(middlewares::request_id))
    .with_state(state)
}

async fn expire_donations<S: Store>(givematch: Givematch<S>, every: Duration) {
  let mut interval = tokio::time::interval(every);

  loop {
    interval.tick().await;

    match givematch.expire_stale_donations(Timestamp::now()).await {
      Ok(0) => {}
      Ok(count) => tracing::info!(count, "expired stale donations"),
      Err(err) => tracing::error!(error = %err, "could not expire stale donations"),
    }
  }
}
