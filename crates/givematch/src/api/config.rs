use std::{
  env::{self, VarError},
  fmt::Display,
  str::FromStr,
  time::Duration,
};

use crate::api::errors::AppError;

#[derive(Clone, Debug)]
pub struct Config {
  pub env: Env,
  pub listen_addr: String,
  pub api_key: Option<String>,
  pub request_timeout: Duration,

  // Datastore
  pub store_url: String,
  pub store_api_key: String,
  pub store_timeout: Duration,

  // Matching
  pub parameters_ttl: Duration,
  pub expiry_interval: Duration,

  // Observability
  pub enable_tracing: bool,
  pub enable_prometheus: bool,
}

impl Default for Config {
  fn default() -> Self {
    Config {
      env: Env::Dev,
      listen_addr: "0.0.0.0:8000".into(),
      api_key: None,
      request_timeout: Duration::from_secs(30),
      store_url: "http://localhost:54321".into(),
      store_api_key: String::new(),
      store_timeout: Duration::from_secs(10),
      parameters_ttl: Duration::from_secs(60),
      expiry_interval: Duration::from_secs(300),
      enable_tracing: false,
      enable_prometheus: false,
    }
  }
}

impl Config {
  pub fn from_env() -> Result<Config, AppError> {
    let config = Config {
      env: Env::from(env::var("ENV").unwrap_or("dev".into())),
      listen_addr: env::var("LISTEN_ADDR").unwrap_or("0.0.0.0:8000".into()),
      api_key: env::var("API_KEY").ok().filter(|key| !key.is_empty()),
      request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 30)?),
      store_url: env::var("STORE_URL").unwrap_or("http://localhost:54321".into()),
      store_api_key: env::var("STORE_API_KEY").unwrap_or_default(),
      store_timeout: Duration::from_secs(parse_env("STORE_TIMEOUT_SECS", 10)?),
      parameters_ttl: Duration::from_secs(parse_env("PARAMETERS_TTL_SECS", 60)?),
      expiry_interval: Duration::from_secs(parse_env("EXPIRY_INTERVAL_SECS", 300)?),
      enable_tracing: env::var("ENABLE_TRACING").unwrap_or_default() == "1",
      enable_prometheus: env::var("ENABLE_PROMETHEUS").unwrap_or_default() == "1",
    };

    if config.store_timeout.is_zero() {
      return Err(AppError::ConfigError("STORE_TIMEOUT_SECS must be positive".into()));
    }

    Ok(config)
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Env {
  Dev,
  Production,
}

impl From<String> for Env {
  fn from(value: String) -> Self {
    match value.as_ref() {
      "dev" => Env::Dev,
      "production" => Env::Production,
      _ => Env::Dev,
    }
  }
}

pub fn parse_env<T>(name: &str, default: T) -> anyhow::Result<T>
where
  T: FromStr,
  T::Err: Display,
{
  match env::var(name) {
    Ok(value) if value.is_empty() => Ok(default),
    Ok(value) => Ok(value.parse::<T>().map_err(|err| AppError::ConfigError(format!("could not read {name}: {err}")))?),
    Err(err) => match err {
      VarError::NotPresent => Ok(default),
      _ => Err(AppError::ConfigError(format!("could not read {name}: {err}")).into()),
    },
  }
}
