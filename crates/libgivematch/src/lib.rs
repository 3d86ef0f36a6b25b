mod error;
mod givematch;
mod matching;
mod model;
mod params;
mod status;

pub mod scoring;
pub mod store;

pub mod prelude {
  pub use crate::error::GivematchError;
  pub use crate::givematch::{Commitment, Givematch, GivematchConfig, MatchOptions, MatchReport, Outcome};
  pub use crate::matching::{DonationRequest, FeatureScore, MatchingAlgorithm, Scored, TaskVolunteer};
  pub use crate::model::{Assignment, Claim, Coordinates, Day, DeliveryMode, Donation, Keyed, Located, Location, Notification, NotificationKind, ReliabilityStats, Request, Task, Urgency, Volunteer};
  pub use crate::params::{MatchingParameters, ParameterGroup, ParameterSnapshot, Thresholds};
  pub use crate::scoring::Match;
  pub use crate::status::{DonationStatus, RequestStatus, TaskStatus};
  pub use crate::store::{AssignCommand, ClaimCommand, Committed, Store, mock::MockStore, postgrest::PostgrestStore};
}
