use itertools::Itertools;
use metrics::histogram;
use opentelemetry::global;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{Span, instrument};

use crate::{
  matching::{MatchingAlgorithm, Scored},
  model::Keyed,
  params::ParameterSnapshot,
};

/// A candidate and how well it fits the subject.
#[derive(Clone, Debug, Serialize)]
pub struct Match<C> {
  pub candidate: C,
  #[serde(flatten)]
  pub scored: Scored,
}

impl<C> Match<C> {
  pub fn score(&self) -> f64 {
    self.scored.score
  }
}

/// Ranks candidates on the right-hand side of an algorithm against a subject.
#[instrument(name = "compute_scores", skip_all, fields(algorithm = A::name(), version = snapshot.version))]
pub fn score<A>(snapshot: &ParameterSnapshot, subject: &A::Lhs, candidates: Vec<A::Rhs>, limit: usize) -> Vec<Match<A::Rhs>>
where
  A: MatchingAlgorithm,
  A::Rhs: Keyed,
{
  rank(candidates, limit, |candidate| A::score(snapshot, subject, candidate))
}

/// Ranks candidates on the left-hand side of an algorithm against a subject.
#[instrument(name = "compute_scores", skip_all, fields(algorithm = A::name(), version = snapshot.version))]
pub fn score_reverse<A>(snapshot: &ParameterSnapshot, candidates: Vec<A::Lhs>, subject: &A::Rhs, limit: usize) -> Vec<Match<A::Lhs>>
where
  A: MatchingAlgorithm,
  A::Lhs: Keyed,
{
  rank(candidates, limit, |candidate| A::score(snapshot, candidate, subject))
}

/// Scores every candidate, then keeps the `limit` best by non-increasing
/// score. Ties are broken on candidate IDs so rankings are stable.
fn rank<C, F>(candidates: Vec<C>, limit: usize, scorer: F) -> Vec<Match<C>>
where
  C: Keyed,
  F: Fn(&C) -> Scored,
{
  let span = Span::current();
  let then = Instant::now();

  histogram!("givematch_candidates_total").record(candidates.len() as f64);

  let matches = candidates
    .into_iter()
    .map(|candidate| {
      let _enter = span.enter();
      let scored = scorer(&candidate);

      tracing::debug!(candidate = candidate.id(), score = scored.score, "computed score");

      histogram!("givematch_scoring_scores").record(scored.score);

      Match { candidate, scored }
    })
    .sorted_by(|lhs, rhs| lhs.score().total_cmp(&rhs.score()).reverse().then_with(|| lhs.candidate.id().cmp(rhs.candidate.id())))
    .take(limit)
    .collect::<Vec<_>>();

  histogram!("givematch_scoring_latency_seconds").record(then.elapsed().as_secs_f64());

  global::meter("givematch").f64_histogram("scoring_latency").build().record(then.elapsed().as_secs_f64() * 1000.0, &[]);

  matches
}

#[cfg(test)]
mod tests {
  use crate::{
    matching::{DonationRequest, TaskVolunteer},
    model::{Donation, Location, Request, Task, Volunteer},
    params::{ParameterGroup, ParameterSnapshot},
  };

  fn requests() -> Vec<Request> {
    vec![
      Request::builder("clothing").id("r1").location(Location::city("Lyon")).build(),
      Request::builder("food").id("r2").quantity_needed(10.0).location(Location::city("Lyon")).build(),
      Request::builder("food").id("r3").quantity_needed(40.0).location(Location::city("Lyon")).build(),
      Request::builder("food").id("r4").quantity_needed(10.0).location(Location::city("Paris")).build(),
      Request::builder("food").id("r0").quantity_needed(10.0).location(Location::city("Lyon")).build(),
    ]
  }

  #[test]
  fn sorted_by_non_increasing_score() {
    let snapshot = ParameterSnapshot::defaults(ParameterGroup::DonationRequest);
    let donation = Donation::builder("food").quantity(10.0).location(Location::city("Lyon")).build();

    let matches = super::score::<DonationRequest>(&snapshot, &donation, requests(), 10);

    assert_eq!(matches.len(), 5);
    assert!(matches.windows(2).all(|pair| pair[0].score() >= pair[1].score()));

    let ids = matches.iter().map(|m| m.candidate.id.as_str()).collect::<Vec<_>>();

    assert_eq!(ids, vec!["r0", "r2", "r3", "r4", "r1"]);
  }

  #[test]
  fn truncated_to_limit() {
    let snapshot = ParameterSnapshot::defaults(ParameterGroup::DonationRequest);
    let donation = Donation::builder("food").quantity(10.0).location(Location::city("Lyon")).build();

    let matches = super::score::<DonationRequest>(&snapshot, &donation, requests(), 2);

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].candidate.id, "r0");
    assert_eq!(matches[1].candidate.id, "r2");
  }

  #[test]
  fn reverse_orientation() {
    let snapshot = ParameterSnapshot::defaults(ParameterGroup::DonationRequest);
    let request = Request::builder("food").quantity_needed(10.0).location(Location::city("Lyon")).build();
    let donations = vec![
      Donation::builder("food").id("d1").quantity(2.0).location(Location::city("Lyon")).build(),
      Donation::builder("food").id("d2").quantity(10.0).location(Location::city("Lyon")).build(),
    ];

    let matches = super::score_reverse::<DonationRequest>(&snapshot, donations, &request, 10);

    assert_eq!(matches[0].candidate.id, "d2");
    assert_eq!(matches[1].candidate.id, "d1");
  }

  #[test]
  fn empty_candidates() {
    let snapshot = ParameterSnapshot::defaults(ParameterGroup::TaskVolunteer);
    let task = Task::builder().build();

    assert!(super::score::<TaskVolunteer>(&snapshot, &task, Vec::<Volunteer>::new(), 10).is_empty());
  }
}
