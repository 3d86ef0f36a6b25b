use bon::Builder;
use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::{DonationStatus, RequestStatus, TaskStatus};

/// Anything carrying a stable identifier and an owning user.
pub trait Keyed {
  fn id(&self) -> &str;
  fn owner_id(&self) -> &str;
}

/// Anything that can be placed on a map, even roughly.
pub trait Located {
  fn location(&self) -> &Location;
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct Coordinates {
  pub lat: f64,
  pub lon: f64,
}

impl Coordinates {
  pub fn new(lat: f64, lon: f64) -> Coordinates {
    Coordinates { lat, lon }
  }

  /// Whether the pair designates an actual point on Earth.
  pub fn is_valid(&self) -> bool {
    self.lat.is_finite() && self.lon.is_finite() && (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
  }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Location {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub coordinates: Option<Coordinates>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
}

impl Location {
  pub fn at(lat: f64, lon: f64) -> Location {
    Location {
      coordinates: Some(Coordinates::new(lat, lon)),
      city: None,
    }
  }

  pub fn city(city: &str) -> Location {
    Location {
      coordinates: None,
      city: Some(city.to_string()),
    }
  }

  /// Coordinates, if present and valid.
  pub fn point(&self) -> Option<Coordinates> {
    self.coordinates.filter(Coordinates::is_valid)
  }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
  #[default]
  Pickup,
  Volunteer,
  Direct,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
  Low,
  Medium,
  High,
  Critical,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Day {
  Monday,
  Tuesday,
  Wednesday,
  Thursday,
  Friday,
  Saturday,
  Sunday,
}

impl From<jiff::civil::Weekday> for Day {
  fn from(value: jiff::civil::Weekday) -> Self {
    use jiff::civil::Weekday;

    match value {
      Weekday::Monday => Day::Monday,
      Weekday::Tuesday => Day::Tuesday,
      Weekday::Wednesday => Day::Wednesday,
      Weekday::Thursday => Day::Thursday,
      Weekday::Friday => Day::Friday,
      Weekday::Saturday => Day::Saturday,
      Weekday::Sunday => Day::Sunday,
    }
  }
}

/// Historical outcome counts for a donor or a volunteer.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReliabilityStats {
  pub completed: u32,
  pub cancelled: u32,
}

#[derive(Builder, Clone, Debug, Deserialize, Serialize, PartialEq)]
#[builder(on(String, into))]
pub struct Donation {
  #[builder(start_fn)]
  pub category: String,
  #[serde(default)]
  #[builder(default = Uuid::new_v4().to_string())]
  pub id: String,
  #[serde(default)]
  #[builder(default = Uuid::new_v4().to_string())]
  pub donor_id: String,
  #[serde(default)]
  #[builder(default)]
  pub title: String,
  pub quantity: Option<f64>,
  #[serde(default)]
  #[builder(default)]
  pub location: Location,
  #[serde(default)]
  #[builder(default)]
  pub urgent: bool,
  #[serde(default)]
  #[builder(default)]
  pub delivery_mode: DeliveryMode,
  #[serde(default)]
  pub donor_stats: Option<ReliabilityStats>,
  #[serde(default)]
  #[builder(default)]
  pub status: DonationStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub expires_at: Option<Timestamp>,
}

impl Donation {
  pub fn is_expired(&self, now: Timestamp) -> bool {
    self.expires_at.is_some_and(|expiry| expiry <= now)
  }

  /// Whether the donation can still be offered to someone.
  pub fn is_claimable(&self, now: Timestamp) -> bool {
    matches!(self.status, DonationStatus::Available | DonationStatus::Matched) && !self.is_expired(now)
  }
}

#[derive(Builder, Clone, Debug, Deserialize, Serialize, PartialEq)]
#[builder(on(String, into))]
pub struct Request {
  #[builder(start_fn)]
  pub category: String,
  #[serde(default)]
  #[builder(default = Uuid::new_v4().to_string())]
  pub id: String,
  #[serde(default)]
  #[builder(default = Uuid::new_v4().to_string())]
  pub recipient_id: String,
  #[serde(default)]
  #[builder(default)]
  pub title: String,
  pub quantity_needed: Option<f64>,
  #[serde(default)]
  pub urgency: Option<Urgency>,
  #[serde(default)]
  #[builder(default)]
  pub location: Location,
  #[serde(default)]
  pub delivery_preference: Option<DeliveryMode>,
  #[serde(default)]
  #[builder(default)]
  pub status: RequestStatus,
}

#[derive(Builder, Clone, Debug, Deserialize, Serialize, PartialEq)]
#[builder(on(String, into))]
pub struct Task {
  #[serde(default)]
  #[builder(default = Uuid::new_v4().to_string())]
  pub id: String,
  pub donation_id: Option<String>,
  #[serde(default)]
  #[builder(default)]
  pub location: Location,
  pub scheduled_for: Option<Date>,
  #[serde(default)]
  #[builder(default)]
  pub required_skills: Vec<String>,
  #[serde(default)]
  #[builder(default)]
  pub status: TaskStatus,
}

#[derive(Builder, Clone, Debug, Deserialize, Serialize, PartialEq)]
#[builder(on(String, into))]
pub struct Volunteer {
  #[serde(default)]
  #[builder(default = Uuid::new_v4().to_string())]
  pub id: String,
  #[serde(default)]
  #[builder(default = Uuid::new_v4().to_string())]
  pub user_id: String,
  #[serde(default)]
  #[builder(default)]
  pub location: Location,
  pub available_days: Option<Vec<Day>>,
  pub skills: Option<Vec<String>>,
  pub stats: Option<ReliabilityStats>,
  #[serde(default = "default_true")]
  #[builder(default = true)]
  pub active: bool,
}

fn default_true() -> bool {
  true
}

impl Keyed for Donation {
  fn id(&self) -> &str {
    &self.id
  }

  fn owner_id(&self) -> &str {
    &self.donor_id
  }
}

impl Keyed for Request {
  fn id(&self) -> &str {
    &self.id
  }

  fn owner_id(&self) -> &str {
    &self.recipient_id
  }
}

impl Keyed for Task {
  fn id(&self) -> &str {
    &self.id
  }

  fn owner_id(&self) -> &str {
    ""
  }
}

impl Keyed for Volunteer {
  fn id(&self) -> &str {
    &self.id
  }

  fn owner_id(&self) -> &str {
    &self.user_id
  }
}

impl Located for Donation {
  fn location(&self) -> &Location {
    &self.location
  }
}

impl Located for Request {
  fn location(&self) -> &Location {
    &self.location
  }
}

impl Located for Task {
  fn location(&self) -> &Location {
    &self.location
  }
}

impl Located for Volunteer {
  fn location(&self) -> &Location {
    &self.location
  }
}

/// A recipient holding on to a donation.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Claim {
  pub id: String,
  pub donation_id: String,
  pub request_id: String,
  pub recipient_id: String,
  pub score: f64,
  pub idempotency_key: Uuid,
  /// Set once the donation went back to available or was cancelled.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub released_at: Option<Timestamp>,
  pub created_at: Timestamp,
}

impl Claim {
  pub fn is_live(&self) -> bool {
    self.released_at.is_none()
  }
}

/// A volunteer put in charge of a task.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Assignment {
  pub id: String,
  pub task_id: String,
  pub volunteer_id: String,
  pub score: f64,
  pub idempotency_key: Uuid,
  pub created_at: Timestamp,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
  MatchSuggested,
  DonationClaimed,
  ClaimReceived,
  TaskSuggested,
  TaskAssigned,
}

impl NotificationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      NotificationKind::MatchSuggested => "match_suggested",
      NotificationKind::DonationClaimed => "donation_claimed",
      NotificationKind::ClaimReceived => "claim_received",
      NotificationKind::TaskSuggested => "task_suggested",
      NotificationKind::TaskAssigned => "task_assigned",
    }
  }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Notification {
  pub user_id: String,
  pub kind: NotificationKind,
  pub title: String,
  pub message: String,
  #[serde(default)]
  pub data: serde_json::Value,
  pub idempotency_key: Uuid,
}
