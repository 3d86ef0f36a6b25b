pub mod mock;
pub mod postgrest;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::GivematchError,
  model::{Assignment, Claim, Donation, Notification, Request, Task, Volunteer},
  params::{MatchingParameters, ParameterGroup, ParameterSnapshot},
  status::DonationStatus,
};

/// Everything needed to hand a donation to a recipient in one step.
///
/// Stores must apply a command atomically: the status check, the status
/// updates, the claim and its notifications either all happen or none does.
/// Replaying a command with the same idempotency key returns the original
/// claim while it is live. Once the donation is released, the key is free
/// again and a new claim is recorded.
///
/// Notifications are deduplicated per claim: their keys are scoped to the
/// claim they come with, so a new claim on the same pair notifies again.
#[derive(Clone, Debug, Serialize)]
pub struct ClaimCommand {
  pub donation_id: String,
  pub request_id: String,
  pub recipient_id: String,
  pub score: f64,
  pub idempotency_key: Uuid,
  pub notifications: Vec<Notification>,
}

/// Everything needed to put a volunteer in charge of a task in one step.
///
/// Same atomicity and idempotency rules as [`ClaimCommand`].
#[derive(Clone, Debug, Serialize)]
pub struct AssignCommand {
  pub task_id: String,
  pub volunteer_id: String,
  pub score: f64,
  pub idempotency_key: Uuid,
  pub notifications: Vec<Notification>,
}

/// A claim or assignment as recorded, with how many of its notifications
/// were actually inserted. Replays insert none.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Committed<T> {
  pub record: T,
  #[serde(default)]
  pub notified: usize,
}

/// Backing datastore for donations, requests, tasks, volunteers and the
/// matching parameters.
#[allow(async_fn_in_trait)]
pub trait Store: Clone + Send + Sync + 'static {
  fn health(&self) -> impl Future<Output = Result<bool, GivematchError>> + Send;

  fn get_donation(&self, id: &str) -> impl Future<Output = Result<Donation, GivematchError>> + Send;
  fn get_request(&self, id: &str) -> impl Future<Output = Result<Request, GivematchError>> + Send;
  fn get_task(&self, id: &str) -> impl Future<Output = Result<Task, GivematchError>> + Send;

  /// Open or partially matched requests, newest first.
  fn open_requests(&self, limit: usize) -> impl Future<Output = Result<Vec<Request>, GivematchError>> + Send;
  /// Donations still up for grabs at `now`, newest first.
  fn available_donations(&self, limit: usize, now: Timestamp) -> impl Future<Output = Result<Vec<Donation>, GivematchError>> + Send;
  fn active_volunteers(&self, limit: usize) -> impl Future<Output = Result<Vec<Volunteer>, GivematchError>> + Send;

  fn load_parameters(&self, group: ParameterGroup) -> impl Future<Output = Result<Option<ParameterSnapshot>, GivematchError>> + Send;
  /// Replaces the parameters of a group if its current version is
  /// `expected_version`, returning the new snapshot.
  fn save_parameters(&self, group: ParameterGroup, parameters: &MatchingParameters, expected_version: u64) -> impl Future<Output = Result<ParameterSnapshot, GivematchError>> + Send;

  fn claim_donation(&self, command: &ClaimCommand) -> impl Future<Output = Result<Committed<Claim>, GivematchError>> + Send;
  fn assign_volunteer(&self, command: &AssignCommand) -> impl Future<Output = Result<Committed<Assignment>, GivematchError>> + Send;
  /// Records a notification, returning whether it was new.
  fn notify(&self, notification: &Notification) -> impl Future<Output = Result<bool, GivematchError>> + Send;

  /// Moves a donation from `from` to `to`, failing if its status changed
  /// meanwhile. Leaving `claimed` for `available` or `cancelled` releases the
  /// live claim.
  fn transition_donation(&self, id: &str, from: DonationStatus, to: DonationStatus) -> impl Future<Output = Result<Donation, GivematchError>> + Send;
  /// Expires every claimable donation past its expiry date, returning how many were.
  fn expire_donations(&self, now: Timestamp) -> impl Future<Output = Result<usize, GivematchError>> + Send;
}
