use std::sync::{Arc, Mutex};

use axum::http::{StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use libgivematch::prelude::*;

use crate::{
  api::{self, AppState, config::Config},
  tests::{log_writer::VecLogWriter, state, store},
  trace::{build_prometheus, init_tracing},
};

fn secured() -> Config {
  Config {
    api_key: Some("myapikey".into()),
    ..Default::default()
  }
}

#[tokio::test]
async fn api_invalid_credentials() {
  let server = TestServer::new(api::router(state(secured(), store()))).unwrap();
  let response = server.post("/match/donations/rice").await;

  assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

  response.assert_text_contains("invalid credentials");

  let response = server.post("/match/donations/rice").add_header(AUTHORIZATION, "Bearer invalidkey").await;

  assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

  response.assert_text_contains("invalid credentials");
}

#[tokio::test]
async fn api_valid_credentials() {
  let server = TestServer::new(api::router(state(secured(), store()))).unwrap();

  let response = server.post("/match/donations/rice").add_header(AUTHORIZATION, "Bearer myapikey").await;

  response.assert_status_ok();

  let response = server.post("/score").add_header(AUTHORIZATION, "Bearer myapikey").await;

  assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn health_is_not_authenticated() {
  let server = TestServer::new(api::router(state(secured(), MockStore::default()))).unwrap();

  server.get("/healthz").await.assert_status_ok();
  server.get("/readyz").await.assert_status_ok();
}

#[tokio::test]
async fn logging() {
  let buf = Arc::new(Mutex::new(Vec::default()));
  let guards = init_tracing(&Config::default(), VecLogWriter::new(Arc::clone(&buf)));

  let server = TestServer::new(api::router(state(Config::default(), store()))).unwrap();
  let _ = server
    .post("/match/donations/missing")
    .add_header("traceparent", "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01")
    .await;

  drop(guards);

  let lines = buf.lock().unwrap();
  let access = lines.iter().find(|line| line.contains("POST http://localhost/match/donations/missing"));

  assert!(access.is_some_and(|line| line.contains("trace_id=0af7651916cd43dd8448eb211c80319c")));
  assert!(access.is_some_and(|line| line.contains(r#"remote="-" method=POST path="/match/donations/missing" status=404"#)));
}

#[tokio::test]
async fn metrics() {
  let state = AppState {
    config: Config {
      enable_prometheus: true,
      ..Default::default()
    },
    prometheus: Some(build_prometheus().unwrap()),
    givematch: Givematch::new(store()).build(),
  };

  let server = TestServer::new(api::router(state)).unwrap();
  let _ = server.post("/score").await;
  let _ = server.post("/match/donations/rice").await;
  let _ = server.post("/match/donations/beans").await;
  let _ = server.get("/nowhere").await;
  let resp = server.get("/metrics").await;
  let text = resp.text();

  let has_series = |route: &str, status: &str| {
    text
      .lines()
      .filter(|line| line.starts_with("http_requests_total{"))
      .any(|line| line.contains(&format!(r#"route="{route}""#)) && line.contains(&format!(r#"status="{status}""#)))
  };

  assert!(has_series("/score", "415"));
  assert!(has_series("/match/donations/{id}", "200"));
  assert!(has_series("/match/donations/{id}", "404"));
  assert!(has_series("unmatched", "404"));
  assert!(!text.contains("/match/donations/rice"));
  assert!(text.contains("givematch_candidates_total"));
}
