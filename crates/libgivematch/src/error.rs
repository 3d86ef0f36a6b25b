use crate::status::DonationStatus;

#[derive(Debug, thiserror::Error)]
pub enum GivematchError {
  #[error("invalid configuration: {0}")]
  ConfigError(String),
  #[error("resource not found")]
  ResourceNotFound,
  #[error("invalid matching parameters: {0}")]
  InvalidParameters(String),
  #[error("cannot move donation from {from} to {to}")]
  InvalidTransition { from: DonationStatus, to: DonationStatus },
  #[error("conflicting update: {0}")]
  Conflict(String),
  #[error(transparent)]
  StoreError(#[from] reqwest::Error),
  #[error(transparent)]
  OtherError(#[from] anyhow::Error),
}
