use std::{
  collections::{BTreeMap, HashMap},
  sync::{Arc, Mutex, MutexGuard},
};

use anyhow::anyhow;
use bon::bon;
use jiff::Timestamp;
use uuid::Uuid;

use crate::{
  error::GivematchError,
  model::{Assignment, Claim, Donation, Notification, Request, Task, Volunteer},
  params::{MatchingParameters, ParameterGroup, ParameterSnapshot},
  status::{DonationStatus, RequestStatus, TaskStatus},
  store::{AssignCommand, ClaimCommand, Committed, Store},
};

#[derive(Default)]
struct State {
  donations: BTreeMap<String, Donation>,
  requests: BTreeMap<String, Request>,
  tasks: BTreeMap<String, Task>,
  volunteers: BTreeMap<String, Volunteer>,
  parameters: HashMap<ParameterGroup, ParameterSnapshot>,
  claims: Vec<Claim>,
  assignments: Vec<Assignment>,
  notifications: Vec<Notification>,
}

impl State {
  fn push_notification(&mut self, notification: &Notification) -> bool {
    if self.notifications.iter().any(|existing| existing.idempotency_key == notification.idempotency_key) {
      return false;
    }

    self.notifications.push(notification.clone());

    true
  }

  /// Inserts a batch of notifications keyed under `scope`, returning how many were new.
  fn push_scoped(&mut self, notifications: &[Notification], scope: &str) -> usize {
    notifications
      .iter()
      .filter(|notification| {
        let scoped = Notification {
          idempotency_key: Uuid::new_v5(&notification.idempotency_key, scope.as_bytes()),
          ..(*notification).clone()
        };

        self.push_notification(&scoped)
      })
      .count()
  }
}

/// In-memory store, applying every operation under a single lock.
#[derive(Clone)]
pub struct MockStore {
  healthy: bool,
  state: Arc<Mutex<State>>,
}

#[bon]
impl MockStore {
  #[builder]
  pub fn new(
    #[builder(default = true)] healthy: bool,
    #[builder(default)] donations: Vec<Donation>,
    #[builder(default)] requests: Vec<Request>,
    #[builder(default)] tasks: Vec<Task>,
    #[builder(default)] volunteers: Vec<Volunteer>,
    #[builder(default)] parameters: Vec<ParameterSnapshot>,
  ) -> MockStore {
    let state = State {
      donations: donations.into_iter().map(|d| (d.id.clone(), d)).collect(),
      requests: requests.into_iter().map(|r| (r.id.clone(), r)).collect(),
      tasks: tasks.into_iter().map(|t| (t.id.clone(), t)).collect(),
      volunteers: volunteers.into_iter().map(|v| (v.id.clone(), v)).collect(),
      parameters: parameters.into_iter().map(|p| (p.group, p)).collect(),
      ..Default::default()
    };

    MockStore {
      healthy,
      state: Arc::new(Mutex::new(state)),
    }
  }
}

impl Default for MockStore {
  fn default() -> Self {
    MockStore::builder().build()
  }
}

impl MockStore {
  fn lock(&self) -> Result<MutexGuard<'_, State>, GivematchError> {
    self.state.lock().map_err(|_| GivematchError::OtherError(anyhow!("mock store lock was poisoned")))
  }

  pub fn donation(&self, id: &str) -> Option<Donation> {
    self.lock().ok()?.donations.get(id).cloned()
  }

  pub fn request(&self, id: &str) -> Option<Request> {
    self.lock().ok()?.requests.get(id).cloned()
  }

  pub fn task(&self, id: &str) -> Option<Task> {
    self.lock().ok()?.tasks.get(id).cloned()
  }

  pub fn claims(&self) -> Vec<Claim> {
    self.lock().map(|state| state.claims.clone()).unwrap_or_default()
  }

  pub fn assignments(&self) -> Vec<Assignment> {
    self.lock().map(|state| state.assignments.clone()).unwrap_or_default()
  }

  pub fn notifications(&self) -> Vec<Notification> {
    self.lock().map(|state| state.notifications.clone()).unwrap_or_default()
  }

  /// Overwrites a donation, simulating a concurrent writer.
  pub fn put_donation(&self, donation: Donation) {
    if let Ok(mut state) = self.lock() {
      state.donations.insert(donation.id.clone(), donation);
    }
  }
}

impl Store for MockStore {
  async fn health(&self) -> Result<bool, GivematchError> {
    Ok(self.healthy)
  }

  async fn get_donation(&self, id: &str) -> Result<Donation, GivematchError> {
    self.lock()?.donations.get(id).cloned().ok_or(GivematchError::ResourceNotFound)
  }

  async fn get_request(&self, id: &str) -> Result<Request, GivematchError> {
    self.lock()?.requests.get(id).cloned().ok_or(GivematchError::ResourceNotFound)
  }

  async fn get_task(&self, id: &str) -> Result<Task, GivematchError> {
    self.lock()?.tasks.get(id).cloned().ok_or(GivematchError::ResourceNotFound)
  }

  async fn open_requests(&self, limit: usize) -> Result<Vec<Request>, GivematchError> {
    Ok(self.lock()?.requests.values().filter(|request| request.status.is_open()).take(limit).cloned().collect())
  }

  async fn available_donations(&self, limit: usize, now: Timestamp) -> Result<Vec<Donation>, GivematchError> {
    Ok(self.lock()?.donations.values().filter(|donation| donation.is_claimable(now)).take(limit).cloned().collect())
  }

  async fn active_volunteers(&self, limit: usize) -> Result<Vec<Volunteer>, GivematchError> {
    Ok(self.lock()?.volunteers.values().filter(|volunteer| volunteer.active).take(limit).cloned().collect())
  }

  async fn load_parameters(&self, group: ParameterGroup) -> Result<Option<ParameterSnapshot>, GivematchError> {
    Ok(self.lock()?.parameters.get(&group).cloned())
  }

  async fn save_parameters(&self, group: ParameterGroup, parameters: &MatchingParameters, expected_version: u64) -> Result<ParameterSnapshot, GivematchError> {
    let mut state = self.lock()?;
    let current = state.parameters.get(&group).map(|snapshot| snapshot.version).unwrap_or(0);

    if current != expected_version {
      return Err(GivematchError::Conflict(format!("parameters for {group} are at version {current}, not {expected_version}")));
    }

    let snapshot = ParameterSnapshot::new(group, current + 1, parameters.clone());

    state.parameters.insert(group, snapshot.clone());

    Ok(snapshot)
  }

  async fn claim_donation(&self, command: &ClaimCommand) -> Result<Committed<Claim>, GivematchError> {
    let mut state = self.lock()?;

    let live = state.claims.iter().find(|claim| claim.idempotency_key == command.idempotency_key && claim.is_live());

    if let Some(claim) = live
      && state.donations.get(&claim.donation_id).is_some_and(|donation| donation.status == DonationStatus::Claimed)
    {
      return Ok(Committed { record: claim.clone(), notified: 0 });
    }

    let now = Timestamp::now();

    let donation = state.donations.get(&command.donation_id).ok_or(GivematchError::ResourceNotFound)?;

    if !donation.is_claimable(now) {
      return Err(GivematchError::Conflict(format!("donation {} is {}", donation.id, donation.status)));
    }

    let request = state.requests.get(&command.request_id).ok_or(GivematchError::ResourceNotFound)?;

    if !request.status.is_open() {
      return Err(GivematchError::Conflict(format!("request {} is no longer open", request.id)));
    }

    let claim = Claim {
      id: Uuid::new_v4().to_string(),
      donation_id: command.donation_id.clone(),
      request_id: command.request_id.clone(),
      recipient_id: command.recipient_id.clone(),
      score: command.score,
      idempotency_key: command.idempotency_key,
      released_at: None,
      created_at: now,
    };

    if let Some(donation) = state.donations.get_mut(&command.donation_id) {
      donation.status = DonationStatus::Claimed;
    }

    if let Some(request) = state.requests.get_mut(&command.request_id) {
      request.status = RequestStatus::Matched;
    }

    state.claims.push(claim.clone());

    let notified = state.push_scoped(&command.notifications, &claim.id);

    Ok(Committed { record: claim, notified })
  }

  async fn assign_volunteer(&self, command: &AssignCommand) -> Result<Committed<Assignment>, GivematchError> {
    let mut state = self.lock()?;

    if let Some(assignment) = state.assignments.iter().find(|assignment| assignment.idempotency_key == command.idempotency_key) {
      return Ok(Committed { record: assignment.clone(), notified: 0 });
    }

    let task = state.tasks.get_mut(&command.task_id).ok_or(GivematchError::ResourceNotFound)?;

    if task.status != TaskStatus::Open {
      return Err(GivematchError::Conflict(format!("task {} is no longer open", task.id)));
    }

    task.status = TaskStatus::Assigned;

    let assignment = Assignment {
      id: Uuid::new_v4().to_string(),
      task_id: command.task_id.clone(),
      volunteer_id: command.volunteer_id.clone(),
      score: command.score,
      idempotency_key: command.idempotency_key,
      created_at: Timestamp::now(),
    };

    state.assignments.push(assignment.clone());

    let notified = state.push_scoped(&command.notifications, &assignment.id);

    Ok(Committed { record: assignment, notified })
  }

  async fn notify(&self, notification: &Notification) -> Result<bool, GivematchError> {
    Ok(self.lock()?.push_notification(notification))
  }

  async fn transition_donation(&self, id: &str, from: DonationStatus, to: DonationStatus) -> Result<Donation, GivematchError> {
    let mut state = self.lock()?;
    let donation = state.donations.get_mut(id).ok_or(GivematchError::ResourceNotFound)?;

    if donation.status != from {
      return Err(GivematchError::Conflict(format!("donation {id} is {}, not {from}", donation.status)));
    }

    donation.status = to;

    let donation = donation.clone();

    if from == DonationStatus::Claimed && matches!(to, DonationStatus::Available | DonationStatus::Cancelled) {
      let now = Timestamp::now();

      for claim in state.claims.iter_mut().filter(|claim| claim.donation_id == id && claim.is_live()) {
        claim.released_at = Some(now);
      }
    }

    Ok(donation)
  }

  async fn expire_donations(&self, now: Timestamp) -> Result<usize, GivematchError> {
    let mut state = self.lock()?;
    let mut count = 0;

    for donation in state.donations.values_mut() {
      if matches!(donation.status, DonationStatus::Available | DonationStatus::Matched) && donation.is_expired(now) {
        donation.status = DonationStatus::Expired;
        count += 1;
      }
    }

    Ok(count)
  }
}
