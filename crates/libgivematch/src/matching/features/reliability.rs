use libgivematch_macros::scoring_feature;

use crate::{
  matching::Feature,
  model::{Donation, ReliabilityStats, Request, Task, Volunteer},
  params::Thresholds,
};

#[scoring_feature(DonorReliability, name = "donor_reliability", reason = "reliable donor", fallback = 0.5)]
fn score_feature(&self, _thresholds: &Thresholds, lhs: &Donation, _rhs: &Request) -> Option<f64> {
  lhs.donor_stats.map(bucket)
}

#[scoring_feature(VolunteerReliability, name = "volunteer_reliability", reason = "reliable volunteer", fallback = 0.5)]
fn score_feature(&self, _thresholds: &Thresholds, _lhs: &Task, rhs: &Volunteer) -> Option<f64> {
  rhs.stats.map(bucket)
}

/// Coarse completion-rate buckets, so a single cancellation does not swing
/// rankings around.
fn bucket(stats: ReliabilityStats) -> f64 {
  let total = u64::from(stats.completed) + u64::from(stats.cancelled);

  if total == 0 {
    return 0.5;
  }

  match stats.completed as f64 / total as f64 {
    rate if rate >= 0.9 => 1.0,
    rate if rate >= 0.75 => 0.75,
    rate if rate >= 0.5 => 0.5,
    _ => 0.25,
  }
}
