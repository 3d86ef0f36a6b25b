use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::GivematchError;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
  #[default]
  Available,
  Matched,
  Claimed,
  InTransit,
  Delivered,
  Completed,
  Cancelled,
  Expired,
}

impl DonationStatus {
  /// Statuses reachable in one step from this one.
  pub fn successors(self) -> &'static [DonationStatus] {
    use DonationStatus::*;

    match self {
      Available => &[Matched, Claimed, Cancelled, Expired],
      Matched => &[Available, Claimed, Cancelled, Expired],
      Claimed => &[Available, InTransit, Delivered, Cancelled],
      InTransit => &[Delivered, Cancelled],
      Delivered => &[Completed],
      Completed | Cancelled | Expired => &[],
    }
  }

  pub fn can_transition_to(self, to: DonationStatus) -> bool {
    self.successors().contains(&to)
  }

  pub fn is_terminal(self) -> bool {
    self.successors().is_empty()
  }

  /// Checks a transition against the table, returning the target status.
  pub fn transition(self, to: DonationStatus) -> Result<DonationStatus, GivematchError> {
    match self.can_transition_to(to) {
      true => Ok(to),
      false => Err(GivematchError::InvalidTransition { from: self, to }),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      DonationStatus::Available => "available",
      DonationStatus::Matched => "matched",
      DonationStatus::Claimed => "claimed",
      DonationStatus::InTransit => "in_transit",
      DonationStatus::Delivered => "delivered",
      DonationStatus::Completed => "completed",
      DonationStatus::Cancelled => "cancelled",
      DonationStatus::Expired => "expired",
    }
  }
}

impl Display for DonationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
  #[default]
  Open,
  Matched,
  Fulfilled,
  Cancelled,
}

impl RequestStatus {
  /// Whether donations can still be matched against the request.
  pub fn is_open(self) -> bool {
    matches!(self, RequestStatus::Open | RequestStatus::Matched)
  }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
  #[default]
  Open,
  Assigned,
  InProgress,
  Completed,
  Cancelled,
}
