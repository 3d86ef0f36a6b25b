use std::{collections::BTreeMap, time::Duration};

use anyhow::anyhow;
use jiff::{Timestamp, civil::Date};
use reqwest::{
  Client, Response, StatusCode, Url,
  header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::instrument;

use crate::{
  error::GivematchError,
  model::{Assignment, Claim, Coordinates, Day, DeliveryMode, Donation, Location, Notification, ReliabilityStats, Request, Task, Urgency, Volunteer},
  params::{MatchingParameters, ParameterGroup, ParameterSnapshot, Thresholds},
  status::{DonationStatus, RequestStatus, TaskStatus},
  store::{AssignCommand, ClaimCommand, Committed, Store},
};

const CLAIMABLE_STATUSES: &str = "in.(available,matched)";
const OPEN_REQUEST_STATUSES: &str = "in.(open,matched)";

/// Store backed by a PostgREST endpoint in front of the matching database.
///
/// Reads go through the `matching_*` views, multi-row writes go through the
/// RPC functions shipped in `sql/`, so that their atomicity is enforced by
/// the database.
#[derive(Clone)]
pub struct PostgrestStore {
  client: Client,
  base: String,
}

impl PostgrestStore {
  pub fn new(url: &str, api_key: &str, timeout: Duration) -> Result<PostgrestStore, GivematchError> {
    Url::parse(url).map_err(|err| GivematchError::ConfigError(format!("invalid store URL: {err}")))?;

    let mut headers = HeaderMap::new();

    if !api_key.is_empty() {
      let mut key = HeaderValue::from_str(api_key).map_err(|_| GivematchError::ConfigError("store API key is not a valid header value".into()))?;
      let mut bearer = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|_| GivematchError::ConfigError("store API key is not a valid header value".into()))?;

      key.set_sensitive(true);
      bearer.set_sensitive(true);

      headers.insert(HeaderName::from_static("apikey"), key);
      headers.insert(AUTHORIZATION, bearer);
    }

    let client = Client::builder().default_headers(headers).timeout(timeout).build()?;

    Ok(PostgrestStore {
      client,
      base: url.trim_end_matches('/').to_string(),
    })
  }

  fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, GivematchError> {
    let mut url = Url::parse(&format!("{}/{path}", self.base)).map_err(|err| GivematchError::ConfigError(format!("invalid store URL: {err}")))?;

    if !query.is_empty() {
      url.query_pairs_mut().extend_pairs(query);
    }

    Ok(url)
  }

  #[instrument(level = "debug", skip(self, query))]
  async fn select<T: DeserializeOwned>(&self, relation: &str, query: &[(&str, &str)]) -> Result<Vec<T>, GivematchError> {
    let url = self.endpoint(&format!("rest/v1/{relation}"), query)?;
    let response = check(self.client.get(url).send().await?).await?;

    Ok(response.json().await?)
  }

  #[instrument(level = "debug", skip(self))]
  async fn select_one<T: DeserializeOwned>(&self, relation: &str, id: &str) -> Result<T, GivematchError> {
    let filter = format!("eq.{id}");

    self.select::<T>(relation, &[("id", filter.as_str()), ("limit", "1")]).await?.into_iter().next().ok_or(GivematchError::ResourceNotFound)
  }

  #[instrument(level = "debug", skip(self, body))]
  async fn rpc<B: Serialize, T: DeserializeOwned>(&self, function: &str, body: &B) -> Result<T, GivematchError> {
    let url = self.endpoint(&format!("rest/v1/rpc/{function}"), &[])?;
    let response = check(self.client.post(url).json(body).send().await?).await?;

    Ok(response.json().await?)
  }

  #[instrument(level = "debug", skip(self, query))]
  async fn update_donations(&self, query: &[(&str, &str)], status: DonationStatus) -> Result<Vec<IdRow>, GivematchError> {
    let url = self.endpoint("rest/v1/donations", query)?;
    let response = self
      .client
      .patch(url)
      .header("Prefer", "return=representation")
      .json(&json!({ "status": status }))
      .send()
      .await?;

    Ok(check(response).await?.json().await?)
  }
}

#[derive(Deserialize)]
struct PostgrestError {
  #[serde(default)]
  message: String,
}

#[derive(Deserialize)]
struct IdRow {
  #[allow(dead_code)]
  id: String,
}

/// Maps PostgREST failures onto domain errors.
///
/// The RPC functions raise custom SQLSTATEs `PT404` and `PT409`, which
/// PostgREST turns into the matching HTTP statuses.
async fn check(response: Response) -> Result<Response, GivematchError> {
  match response.status() {
    status if status.is_success() => Ok(response),
    StatusCode::NOT_FOUND => Err(GivematchError::ResourceNotFound),
    StatusCode::CONFLICT => {
      let message = response.json::<PostgrestError>().await.map(|err| err.message).unwrap_or_default();

      Err(GivematchError::Conflict(message))
    }
    status => match response.error_for_status() {
      Err(err) => Err(err.into()),
      Ok(_) => Err(GivematchError::OtherError(anyhow!("unexpected store response status {status}"))),
    },
  }
}

fn location(latitude: Option<f64>, longitude: Option<f64>, city: Option<String>) -> Location {
  Location {
    coordinates: latitude.zip(longitude).map(|(lat, lon)| Coordinates::new(lat, lon)),
    city: city.filter(|city| !city.trim().is_empty()),
  }
}

fn stats(completed: Option<u32>, cancelled: Option<u32>) -> Option<ReliabilityStats> {
  match (completed, cancelled) {
    (None, None) => None,
    (completed, cancelled) => Some(ReliabilityStats {
      completed: completed.unwrap_or(0),
      cancelled: cancelled.unwrap_or(0),
    }),
  }
}

#[derive(Deserialize)]
pub(crate) struct DonationRow {
  id: String,
  donor_id: String,
  category: String,
  title: Option<String>,
  quantity: Option<f64>,
  pickup_latitude: Option<f64>,
  pickup_longitude: Option<f64>,
  city: Option<String>,
  #[serde(default)]
  is_urgent: bool,
  delivery_mode: Option<DeliveryMode>,
  donor_completed: Option<u32>,
  donor_cancelled: Option<u32>,
  status: DonationStatus,
  expires_at: Option<Timestamp>,
}

impl From<DonationRow> for Donation {
  fn from(row: DonationRow) -> Self {
    Donation {
      id: row.id,
      donor_id: row.donor_id,
      category: row.category,
      title: row.title.unwrap_or_default(),
      quantity: row.quantity,
      location: location(row.pickup_latitude, row.pickup_longitude, row.city),
      urgent: row.is_urgent,
      delivery_mode: row.delivery_mode.unwrap_or_default(),
      donor_stats: stats(row.donor_completed, row.donor_cancelled),
      status: row.status,
      expires_at: row.expires_at,
    }
  }
}

#[derive(Deserialize)]
pub(crate) struct RequestRow {
  id: String,
  recipient_id: String,
  category: String,
  title: Option<String>,
  quantity_needed: Option<f64>,
  urgency: Option<Urgency>,
  latitude: Option<f64>,
  longitude: Option<f64>,
  city: Option<String>,
  delivery_preference: Option<DeliveryMode>,
  status: RequestStatus,
}

impl From<RequestRow> for Request {
  fn from(row: RequestRow) -> Self {
    Request {
      id: row.id,
      recipient_id: row.recipient_id,
      category: row.category,
      title: row.title.unwrap_or_default(),
      quantity_needed: row.quantity_needed,
      urgency: row.urgency,
      location: location(row.latitude, row.longitude, row.city),
      delivery_preference: row.delivery_preference,
      status: row.status,
    }
  }
}

#[derive(Deserialize)]
pub(crate) struct TaskRow {
  id: String,
  donation_id: Option<String>,
  latitude: Option<f64>,
  longitude: Option<f64>,
  city: Option<String>,
  scheduled_for: Option<Date>,
  required_skills: Option<Vec<String>>,
  status: TaskStatus,
}

impl From<TaskRow> for Task {
  fn from(row: TaskRow) -> Self {
    Task {
      id: row.id,
      donation_id: row.donation_id,
      location: location(row.latitude, row.longitude, row.city),
      scheduled_for: row.scheduled_for,
      required_skills: row.required_skills.unwrap_or_default(),
      status: row.status,
    }
  }
}

#[derive(Deserialize)]
pub(crate) struct VolunteerRow {
  id: String,
  user_id: String,
  latitude: Option<f64>,
  longitude: Option<f64>,
  city: Option<String>,
  available_days: Option<Vec<Day>>,
  skills: Option<Vec<String>>,
  completed: Option<u32>,
  cancelled: Option<u32>,
  #[serde(default)]
  active: bool,
}

impl From<VolunteerRow> for Volunteer {
  fn from(row: VolunteerRow) -> Self {
    Volunteer {
      id: row.id,
      user_id: row.user_id,
      location: location(row.latitude, row.longitude, row.city),
      available_days: row.available_days,
      skills: row.skills,
      stats: stats(row.completed, row.cancelled),
      active: row.active,
    }
  }
}

#[derive(Deserialize)]
pub(crate) struct ParametersRow {
  group_name: ParameterGroup,
  version: u64,
  weights: BTreeMap<String, f64>,
  #[serde(default)]
  thresholds: Thresholds,
}

impl From<ParametersRow> for ParameterSnapshot {
  fn from(row: ParametersRow) -> Self {
    ParameterSnapshot::new(
      row.group_name,
      row.version,
      MatchingParameters {
        weights: row.weights,
        thresholds: row.thresholds,
      },
    )
  }
}

impl Store for PostgrestStore {
  async fn health(&self) -> Result<bool, GivematchError> {
    let url = self.endpoint("rest/v1/", &[])?;

    Ok(self.client.head(url).send().await?.status().is_success())
  }

  async fn get_donation(&self, id: &str) -> Result<Donation, GivematchError> {
    Ok(self.select_one::<DonationRow>("matching_donations", id).await?.into())
  }

  async fn get_request(&self, id: &str) -> Result<Request, GivematchError> {
    Ok(self.select_one::<RequestRow>("matching_requests", id).await?.into())
  }

  async fn get_task(&self, id: &str) -> Result<Task, GivematchError> {
    Ok(self.select_one::<TaskRow>("matching_tasks", id).await?.into())
  }

  async fn open_requests(&self, limit: usize) -> Result<Vec<Request>, GivematchError> {
    let limit = limit.to_string();
    let rows = self
      .select::<RequestRow>("matching_requests", &[("status", OPEN_REQUEST_STATUSES), ("order", "created_at.desc"), ("limit", limit.as_str())])
      .await?;

    Ok(rows.into_iter().map(Request::from).collect())
  }

  async fn available_donations(&self, limit: usize, now: Timestamp) -> Result<Vec<Donation>, GivematchError> {
    let limit = limit.to_string();
    let expiry = format!("(expires_at.is.null,expires_at.gt.{now})");
    let rows = self
      .select::<DonationRow>("matching_donations", &[("status", CLAIMABLE_STATUSES), ("or", expiry.as_str()), ("order", "created_at.desc"), ("limit", limit.as_str())])
      .await?;

    Ok(rows.into_iter().map(Donation::from).collect())
  }

  async fn active_volunteers(&self, limit: usize) -> Result<Vec<Volunteer>, GivematchError> {
    let limit = limit.to_string();
    let rows = self
      .select::<VolunteerRow>("matching_volunteers", &[("active", "eq.true"), ("order", "created_at.desc"), ("limit", limit.as_str())])
      .await?;

    Ok(rows.into_iter().map(Volunteer::from).collect())
  }

  async fn load_parameters(&self, group: ParameterGroup) -> Result<Option<ParameterSnapshot>, GivematchError> {
    let filter = format!("eq.{group}");
    let rows = self.select::<ParametersRow>("matching_parameters", &[("group_name", filter.as_str()), ("limit", "1")]).await?;

    Ok(rows.into_iter().next().map(ParameterSnapshot::from))
  }

  async fn save_parameters(&self, group: ParameterGroup, parameters: &MatchingParameters, expected_version: u64) -> Result<ParameterSnapshot, GivematchError> {
    let body = json!({
      "p_group": group,
      "p_weights": parameters.weights,
      "p_thresholds": parameters.thresholds,
      "p_expected_version": expected_version,
    });

    Ok(self.rpc::<_, ParametersRow>("save_matching_parameters", &body).await?.into())
  }

  async fn claim_donation(&self, command: &ClaimCommand) -> Result<Committed<Claim>, GivematchError> {
    let body = json!({
      "p_donation_id": command.donation_id,
      "p_request_id": command.request_id,
      "p_recipient_id": command.recipient_id,
      "p_score": command.score,
      "p_idempotency_key": command.idempotency_key,
      "p_notifications": command.notifications,
    });

    self.rpc("claim_donation", &body).await
  }

  async fn assign_volunteer(&self, command: &AssignCommand) -> Result<Committed<Assignment>, GivematchError> {
    let body = json!({
      "p_task_id": command.task_id,
      "p_volunteer_id": command.volunteer_id,
      "p_score": command.score,
      "p_idempotency_key": command.idempotency_key,
      "p_notifications": command.notifications,
    });

    self.rpc("assign_volunteer", &body).await
  }

  async fn notify(&self, notification: &Notification) -> Result<bool, GivematchError> {
    let url = self.endpoint("rest/v1/notifications", &[("on_conflict", "idempotency_key"), ("select", "id")])?;
    let response = self
      .client
      .post(url)
      .header("Prefer", "resolution=ignore-duplicates,return=representation")
      .json(notification)
      .send()
      .await?;

    let inserted: Vec<IdRow> = check(response).await?.json().await?;

    Ok(!inserted.is_empty())
  }

  async fn transition_donation(&self, id: &str, from: DonationStatus, to: DonationStatus) -> Result<Donation, GivematchError> {
    let id_filter = format!("eq.{id}");
    let status_filter = format!("eq.{from}");
    let updated = self.update_donations(&[("id", id_filter.as_str()), ("status", status_filter.as_str()), ("select", "id")], to).await?;

    let donation = self.get_donation(id).await?;

    if updated.is_empty() {
      return Err(GivematchError::Conflict(format!("donation {id} is {}, not {from}", donation.status)));
    }

    Ok(donation)
  }

  async fn expire_donations(&self, now: Timestamp) -> Result<usize, GivematchError> {
    let expiry = format!("lte.{now}");
    let expired = self
      .update_donations(&[("status", CLAIMABLE_STATUSES), ("expires_at", expiry.as_str()), ("select", "id")], DonationStatus::Expired)
      .await?;

    Ok(expired.len())
  }
}
