use std::{collections::HashMap, sync::Arc, time::Duration};

use ahash::RandomState;
use bon::bon;
use jiff::Timestamp;
use metrics::counter;
use serde::Serialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use crate::{
  error::GivematchError,
  matching::{DonationRequest, MatchingAlgorithm, Scored, TaskVolunteer},
  model::{Assignment, Claim, Donation, Keyed, Notification, NotificationKind, Request, Task, Volunteer},
  params::{MatchingParameters, ParameterGroup, ParameterSnapshot, Thresholds},
  scoring::{self, Match},
  status::{DonationStatus, TaskStatus},
  store::{AssignCommand, ClaimCommand, Committed, Store},
};

/// Namespace for the deterministic idempotency keys of claims, assignments
/// and notifications.
const IDEMPOTENCY_NAMESPACE: Uuid = Uuid::from_u128(0x6d0c_0a35_41d2_4b0e_9d8f_52c7_a4f1_e203);

#[derive(Clone, Debug)]
pub struct GivematchConfig {
  /// How long a parameter snapshot is served from cache before being reloaded.
  pub parameters_ttl: Duration,
}

impl Default for GivematchConfig {
  fn default() -> Self {
    GivematchConfig {
      parameters_ttl: Duration::from_secs(60),
    }
  }
}

/// Per-call knobs of the match operations.
#[derive(Clone, Copy, Debug, Default)]
pub struct MatchOptions {
  /// Caps the number of returned matches below the group's `top_k`.
  pub limit: Option<usize>,
  /// Perform the auto-claim and suggestion side effects instead of only
  /// reporting them.
  pub apply: bool,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Commitment {
  Claim(Claim),
  Assignment(Assignment),
}

/// What the thresholds call for on a ranked list, and what was done about it.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Outcome {
  pub applied: bool,
  /// Top candidate at or above the auto-claim threshold.
  pub auto_claim: Option<String>,
  /// Other candidates at or above the auto-match threshold.
  pub suggestions: Vec<String>,
  pub commitment: Option<Commitment>,
  /// Set when the auto-claim lost a race against another writer.
  pub conflict: Option<String>,
  /// Notifications recorded by this call, duplicates excluded.
  pub notifications: usize,
}

impl Outcome {
  fn plan<C: Keyed>(matches: &[Match<C>], thresholds: &Thresholds, apply: bool) -> Outcome {
    let auto_claim = matches.first().filter(|top| top.score() >= thresholds.auto_claim).map(|top| top.candidate.id().to_string());

    let suggestions = matches
      .iter()
      .skip(usize::from(auto_claim.is_some()))
      .filter(|candidate| candidate.score() >= thresholds.auto_match)
      .map(|candidate| candidate.candidate.id().to_string())
      .collect();

    Outcome {
      applied: apply,
      auto_claim,
      suggestions,
      ..Default::default()
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchReport<C> {
  pub subject_id: String,
  pub group: ParameterGroup,
  pub parameters_version: u64,
  pub matches: Vec<Match<C>>,
  pub outcome: Outcome,
}

/// Entrypoint of the matching library.
///
/// Wraps a [`Store`] and keeps a per-group cache of parameter snapshots.
/// Every match operation scores its whole batch against a single snapshot.
///
/// ```rust
/// # use libgivematch::prelude::*;
/// # tokio_test::block_on(async {
/// let store = MockStore::builder()
///   .donations(vec![Donation::builder("food").id("d1").location(Location::city("Lyon")).build()])
///   .requests(vec![Request::builder("food").id("r1").location(Location::city("Lyon")).build()])
///   .build();
///
/// let givematch = Givematch::new(store).build();
/// let report = givematch.match_donation("d1", MatchOptions::default()).await.unwrap();
///
/// assert_eq!(report.matches[0].candidate.id, "r1");
/// # });
/// ```
#[derive(Clone)]
pub struct Givematch<S: Store> {
  store: S,
  config: GivematchConfig,
  snapshots: Arc<RwLock<HashMap<ParameterGroup, Arc<ParameterSnapshot>, RandomState>>>,
}

#[bon]
impl<S: Store> Givematch<S> {
  #[allow(clippy::new_ret_no_self)]
  #[builder(start_fn = new, finish_fn = build)]
  pub fn _new(#[builder(start_fn)] store: S, #[builder(default)] config: GivematchConfig) -> Givematch<S> {
    Givematch {
      store,
      config,
      snapshots: Default::default(),
    }
  }
}

impl<S: Store> Givematch<S> {
  pub fn store(&self) -> &S {
    &self.store
  }

  pub async fn health(&self) -> Result<bool, GivematchError> {
    self.store.health().await
  }

  /// Current parameters of a group, from cache while fresh.
  pub async fn parameters(&self, group: ParameterGroup) -> Result<Arc<ParameterSnapshot>, GivematchError> {
    if let Some(snapshot) = self.snapshots.read().await.get(&group)
      && self.is_fresh(snapshot)
    {
      return Ok(Arc::clone(snapshot));
    }

    self.refresh_parameters(group).await
  }

  /// Reloads the parameters of a group from the store.
  ///
  /// Built-in defaults are used when the store has none. If the store
  /// cannot be reached, a previously cached snapshot keeps being served.
  pub async fn refresh_parameters(&self, group: ParameterGroup) -> Result<Arc<ParameterSnapshot>, GivematchError> {
    let snapshot = match self.store.load_parameters(group).await {
      Ok(Some(snapshot)) => snapshot,
      Ok(None) => ParameterSnapshot::defaults(group),

      Err(err) => match self.snapshots.read().await.get(&group) {
        Some(stale) => {
          tracing::warn!(group = group.as_str(), error = err.to_string(), "could not refresh matching parameters, serving cached snapshot");

          return Ok(Arc::clone(stale));
        }

        None => return Err(err),
      },
    };

    Ok(self.cache(snapshot).await)
  }

  /// Validates and saves new parameters if the group is still at `expected_version`.
  #[instrument(skip(self, parameters))]
  pub async fn update_parameters(&self, group: ParameterGroup, parameters: MatchingParameters, expected_version: u64) -> Result<Arc<ParameterSnapshot>, GivematchError> {
    parameters.validate_for(group)?;

    let snapshot = self.store.save_parameters(group, &parameters, expected_version).await?;

    tracing::info!(group = group.as_str(), version = snapshot.version, "matching parameters updated");

    Ok(self.cache(snapshot).await)
  }

  /// Scores an arbitrary donation against an arbitrary request.
  pub async fn score_pair(&self, donation: &Donation, request: &Request) -> Result<(u64, Scored), GivematchError> {
    let snapshot = self.parameters(ParameterGroup::DonationRequest).await?;

    Ok((snapshot.version, DonationRequest::score(&snapshot, donation, request)))
  }

  /// Ranks open requests for a donation.
  #[instrument(skip(self))]
  pub async fn match_donation(&self, id: &str, options: MatchOptions) -> Result<MatchReport<Request>, GivematchError> {
    let snapshot = self.parameters(ParameterGroup::DonationRequest).await?;
    let thresholds = snapshot.thresholds();
    let donation = self.store.get_donation(id).await?;

    if !donation.is_claimable(Timestamp::now()) {
      return Err(GivematchError::Conflict(format!("donation {id} is {} and cannot be matched", donation.status)));
    }

    let candidates = self.store.open_requests(thresholds.candidate_limit).await?.into_iter().filter(|request| !same_owner(&donation, request)).collect();
    let matches = scoring::score::<DonationRequest>(&snapshot, &donation, candidates, limit(thresholds, options));
    let mut outcome = Outcome::plan(&matches, thresholds, options.apply);

    if options.apply {
      if let Some(top) = matches.first().filter(|_| outcome.auto_claim.is_some()) {
        self.claim(&mut outcome, &donation, &top.candidate, &top.scored).await?;
      }

      for suggestion in matches.iter().filter(|candidate| outcome.suggestions.contains(&candidate.candidate.id)) {
        let request = &suggestion.candidate;
        let notification = notification(
          NotificationKind::MatchSuggested,
          &request.recipient_id,
          "A donation matches your request",
          &suggestion.scored,
          [donation.id.as_str(), request.id.as_str()],
          json!({ "donation_id": donation.id, "request_id": request.id, "score": suggestion.score() }),
        );

        outcome.notifications += usize::from(self.store.notify(&notification).await?);
      }
    }

    Ok(MatchReport {
      subject_id: donation.id,
      group: snapshot.group,
      parameters_version: snapshot.version,
      matches,
      outcome,
    })
  }

  /// Ranks available donations for a request.
  #[instrument(skip(self))]
  pub async fn match_request(&self, id: &str, options: MatchOptions) -> Result<MatchReport<Donation>, GivematchError> {
    let snapshot = self.parameters(ParameterGroup::DonationRequest).await?;
    let thresholds = snapshot.thresholds();
    let request = self.store.get_request(id).await?;

    if !request.status.is_open() {
      return Err(GivematchError::Conflict(format!("request {id} is no longer open")));
    }

    let now = Timestamp::now();
    let candidates = self
      .store
      .available_donations(thresholds.candidate_limit, now)
      .await?
      .into_iter()
      .filter(|donation| donation.is_claimable(now) && !same_owner(&request, donation))
      .collect();

    let matches = scoring::score_reverse::<DonationRequest>(&snapshot, candidates, &request, limit(thresholds, options));
    let mut outcome = Outcome::plan(&matches, thresholds, options.apply);

    if options.apply {
      if let Some(top) = matches.first().filter(|_| outcome.auto_claim.is_some()) {
        self.claim(&mut outcome, &top.candidate, &request, &top.scored).await?;
      }

      for suggestion in matches.iter().filter(|candidate| outcome.suggestions.contains(&candidate.candidate.id)) {
        let donation = &suggestion.candidate;
        let notification = notification(
          NotificationKind::MatchSuggested,
          &donation.donor_id,
          "A request matches your donation",
          &suggestion.scored,
          [donation.id.as_str(), request.id.as_str()],
          json!({ "donation_id": donation.id, "request_id": request.id, "score": suggestion.score() }),
        );

        outcome.notifications += usize::from(self.store.notify(&notification).await?);
      }
    }

    Ok(MatchReport {
      subject_id: request.id,
      group: snapshot.group,
      parameters_version: snapshot.version,
      matches,
      outcome,
    })
  }

  /// Ranks active volunteers for an open task.
  #[instrument(skip(self))]
  pub async fn match_task(&self, id: &str, options: MatchOptions) -> Result<MatchReport<Volunteer>, GivematchError> {
    let snapshot = self.parameters(ParameterGroup::TaskVolunteer).await?;
    let thresholds = snapshot.thresholds();
    let task = self.store.get_task(id).await?;

    if task.status != TaskStatus::Open {
      return Err(GivematchError::Conflict(format!("task {id} is no longer open")));
    }

    let candidates = self.store.active_volunteers(thresholds.candidate_limit).await?.into_iter().filter(|volunteer| volunteer.active).collect();
    let matches = scoring::score::<TaskVolunteer>(&snapshot, &task, candidates, limit(thresholds, options));
    let mut outcome = Outcome::plan(&matches, thresholds, options.apply);

    if options.apply {
      if let Some(top) = matches.first().filter(|_| outcome.auto_claim.is_some()) {
        self.assign(&mut outcome, &task, &top.candidate, &top.scored).await?;
      }

      for suggestion in matches.iter().filter(|candidate| outcome.suggestions.contains(&candidate.candidate.id)) {
        let volunteer = &suggestion.candidate;
        let notification = notification(
          NotificationKind::TaskSuggested,
          &volunteer.user_id,
          "A delivery task needs a hand near you",
          &suggestion.scored,
          [task.id.as_str(), volunteer.id.as_str()],
          json!({ "task_id": task.id, "volunteer_id": volunteer.id, "score": suggestion.score() }),
        );

        outcome.notifications += usize::from(self.store.notify(&notification).await?);
      }
    }

    Ok(MatchReport {
      subject_id: task.id,
      group: snapshot.group,
      parameters_version: snapshot.version,
      matches,
      outcome,
    })
  }

  /// Moves a donation along its lifecycle, rejecting transitions the
  /// lifecycle does not allow.
  #[instrument(skip(self))]
  pub async fn transition_donation(&self, id: &str, to: DonationStatus) -> Result<Donation, GivematchError> {
    let donation = self.store.get_donation(id).await?;
    let to = donation.status.transition(to)?;
    let donation = self.store.transition_donation(id, donation.status, to).await?;

    tracing::info!(donation = id, status = to.as_str(), "donation status changed");

    Ok(donation)
  }

  /// Expires every claimable donation past its expiry date.
  pub async fn expire_stale_donations(&self, now: Timestamp) -> Result<usize, GivematchError> {
    let count = self.store.expire_donations(now).await?;

    if count > 0 {
      tracing::info!(count, "expired stale donations");
    }

    Ok(count)
  }

  fn is_fresh(&self, snapshot: &ParameterSnapshot) -> bool {
    Timestamp::now().duration_since(snapshot.loaded_at).as_secs_f64() < self.config.parameters_ttl.as_secs_f64()
  }

  async fn cache(&self, snapshot: ParameterSnapshot) -> Arc<ParameterSnapshot> {
    let snapshot = Arc::new(snapshot);

    self.snapshots.write().await.insert(snapshot.group, Arc::clone(&snapshot));

    snapshot
  }

  async fn claim(&self, outcome: &mut Outcome, donation: &Donation, request: &Request, scored: &Scored) -> Result<(), GivematchError> {
    let key = idempotency_key(&["claim", &donation.id, &request.id]);
    let pair = [donation.id.as_str(), request.id.as_str()];
    let data = json!({ "donation_id": donation.id, "request_id": request.id, "score": scored.score });

    let command = ClaimCommand {
      donation_id: donation.id.clone(),
      request_id: request.id.clone(),
      recipient_id: request.recipient_id.clone(),
      score: scored.score,
      idempotency_key: key,
      notifications: vec![
        notification(NotificationKind::DonationClaimed, &donation.donor_id, "Your donation was claimed", scored, pair, data.clone()),
        notification(NotificationKind::ClaimReceived, &request.recipient_id, "A donation was reserved for you", scored, pair, data),
      ],
    };

    match self.store.claim_donation(&command).await {
      Ok(Committed { record, notified }) => {
        tracing::info!(donation = donation.id, request = request.id, score = scored.score, notified, "donation auto-claimed");
        counter!("givematch_auto_claims_total", "group" => ParameterGroup::DonationRequest.as_str(), "outcome" => "committed").increment(1);

        outcome.notifications += notified;
        outcome.commitment = Some(Commitment::Claim(record));
      }

      Err(GivematchError::Conflict(message)) => {
        tracing::warn!(donation = donation.id, request = request.id, reason = message.as_str(), "auto-claim lost to a concurrent update");
        counter!("givematch_auto_claims_total", "group" => ParameterGroup::DonationRequest.as_str(), "outcome" => "conflict").increment(1);

        outcome.conflict = Some(message);
      }

      Err(err) => return Err(err),
    }

    Ok(())
  }

  async fn assign(&self, outcome: &mut Outcome, task: &Task, volunteer: &Volunteer, scored: &Scored) -> Result<(), GivematchError> {
    let key = idempotency_key(&["assign", &task.id, &volunteer.id]);
    let pair = [task.id.as_str(), volunteer.id.as_str()];
    let data = json!({ "task_id": task.id, "volunteer_id": volunteer.id, "score": scored.score });

    let command = AssignCommand {
      task_id: task.id.clone(),
      volunteer_id: volunteer.id.clone(),
      score: scored.score,
      idempotency_key: key,
      notifications: vec![notification(NotificationKind::TaskAssigned, &volunteer.user_id, "You were assigned a delivery task", scored, pair, data)],
    };

    match self.store.assign_volunteer(&command).await {
      Ok(Committed { record, notified }) => {
        tracing::info!(task = task.id, volunteer = volunteer.id, score = scored.score, notified, "volunteer auto-assigned");
        counter!("givematch_auto_claims_total", "group" => ParameterGroup::TaskVolunteer.as_str(), "outcome" => "committed").increment(1);

        outcome.notifications += notified;
        outcome.commitment = Some(Commitment::Assignment(record));
      }

      Err(GivematchError::Conflict(message)) => {
        tracing::warn!(task = task.id, volunteer = volunteer.id, reason = message.as_str(), "auto-assignment lost to a concurrent update");
        counter!("givematch_auto_claims_total", "group" => ParameterGroup::TaskVolunteer.as_str(), "outcome" => "conflict").increment(1);

        outcome.conflict = Some(message);
      }

      Err(err) => return Err(err),
    }

    Ok(())
  }
}

fn limit(thresholds: &Thresholds, options: MatchOptions) -> usize {
  options.limit.map_or(thresholds.top_k, |limit| limit.min(thresholds.top_k))
}

/// Whether both records belong to the same known user.
fn same_owner(lhs: &impl Keyed, rhs: &impl Keyed) -> bool {
  !lhs.owner_id().is_empty() && lhs.owner_id() == rhs.owner_id()
}

fn idempotency_key(parts: &[&str]) -> Uuid {
  Uuid::new_v5(&IDEMPOTENCY_NAMESPACE, parts.join(":").as_bytes())
}

/// Keyed on who is told what about which pair, so a new score for the same
/// pair does not notify twice.
fn notification(kind: NotificationKind, user_id: &str, title: &str, scored: &Scored, pair: [&str; 2], data: serde_json::Value) -> Notification {
  let key = idempotency_key(&[kind.as_str(), user_id, pair[0], pair[1]]);

  Notification {
    user_id: user_id.to_string(),
    kind,
    title: title.to_string(),
    message: scored.reason.clone(),
    data,
    idempotency_key: key,
  }
}
