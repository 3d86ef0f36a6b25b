use std::net::SocketAddr;

use axum::{
  RequestPartsExt,
  body::{Body, HttpBody},
  extract::ConnectInfo,
  http::{Request, StatusCode},
  middleware::Next,
  response::Response,
};
use jiff::Timestamp;
use opentelemetry::{global, trace::TraceContextExt};
use opentelemetry_http::HeaderExtractor;
use tokio::time::Instant;

/// Emits one access log line per request.
pub async fn api_logger(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
  let parent = global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(request.headers())));
  let trace_id = parent.span().span_context().trace_id();

  let time = Timestamp::now().strftime("%Y-%m-%dT%H:%M:%S%z").to_string();
  let method = request.method().clone();
  let uri = request.uri().clone();

  let (mut parts, body) = request.into_parts();
  let ip = if let Ok(ConnectInfo(addr)) = parts.extract::<ConnectInfo<SocketAddr>>().await {
    addr.ip().to_string()
  } else {
    "-".to_string()
  };

  let then = Instant::now();
  let response = next.run(Request::from_parts(parts, body)).await;

  global::meter("givematch").f64_histogram("request_latency").build().record(then.elapsed().as_secs_f64() * 1000.0, &[]);

  let span = tracing::info_span!("request", trace_id = %trace_id);
  let _guard = span.enter();

  tracing::info!(
    time = time,
    remote = ip,
    method = %method,
    path = uri.path(),
    status = response.status().as_u16(),
    latency = then.elapsed().as_millis(),
    size = response.size_hint().exact().unwrap_or(0),
    "{} {}",
    method,
    uri,
  );

  Ok(response)
}
