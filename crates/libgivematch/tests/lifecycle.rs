use jiff::{Timestamp, ToSpan};
use libgivematch::prelude::*;
use serde_json::json;
use serde_json_assert::assert_json_include;

fn parameters() -> ParameterSnapshot {
  let mut params = MatchingParameters::defaults(ParameterGroup::DonationRequest);
  params.thresholds.auto_claim = 0.8;
  params.thresholds.auto_match = 0.6;

  ParameterSnapshot::new(ParameterGroup::DonationRequest, 7, params)
}

#[tokio::test]
async fn donation_from_posting_to_completion() {
  let store = MockStore::builder()
    .donations(vec![
      Donation::builder("food")
        .id("rice")
        .donor_id("dana")
        .title("Bags of rice")
        .quantity(5.0)
        .location(Location::at(48.8566, 2.3522))
        .donor_stats(ReliabilityStats { completed: 9, cancelled: 0 })
        .build(),
    ])
    .requests(vec![
      Request::builder("food")
        .id("family")
        .recipient_id("ryan")
        .title("rice and pasta")
        .quantity_needed(5.0)
        .urgency(Urgency::High)
        .location(Location::at(48.8606, 2.3376))
        .build(),
      Request::builder("clothing").id("coats").recipient_id("rosa").location(Location::city("Marseille")).build(),
    ])
    .parameters(vec![parameters()])
    .build();

  let givematch = Givematch::new(store.clone()).build();

  let report = givematch.match_donation("rice", MatchOptions { limit: None, apply: true }).await.unwrap();

  assert_eq!(report.parameters_version, 7);
  assert_eq!(report.matches.first().map(|m| m.candidate.id.as_str()), Some("family"));
  assert!(report.matches.windows(2).all(|pair| pair[0].score() >= pair[1].score()));
  assert!(matches!(report.outcome.commitment, Some(Commitment::Claim(ref claim)) if claim.recipient_id == "ryan"));

  assert_eq!(store.donation("rice").unwrap().status, DonationStatus::Claimed);

  // Matching a claimed donation again is refused rather than double-claimed.
  assert!(matches!(givematch.match_donation("rice", MatchOptions { limit: None, apply: true }).await, Err(GivematchError::Conflict(_))));
  assert_eq!(store.claims().len(), 1);

  for status in [DonationStatus::InTransit, DonationStatus::Delivered, DonationStatus::Completed] {
    assert_eq!(givematch.transition_donation("rice", status).await.unwrap().status, status);
  }

  assert!(matches!(
    givematch.transition_donation("rice", DonationStatus::Available).await,
    Err(GivematchError::InvalidTransition { .. })
  ));
}

#[tokio::test]
async fn volunteers_for_a_task() {
  let store = MockStore::builder()
    .tasks(vec![
      Task::builder()
        .id("pickup")
        .location(Location::at(45.764, 4.8357))
        .scheduled_for(jiff::civil::date(2026, 10, 18))
        .required_skills(vec!["driving".to_string()])
        .build(),
    ])
    .volunteers(vec![
      Volunteer::builder()
        .id("near")
        .user_id("vera")
        .location(Location::at(45.76, 4.83))
        .available_days(vec![Day::Sunday])
        .skills(vec!["driving".to_string()])
        .stats(ReliabilityStats { completed: 20, cancelled: 0 })
        .build(),
      Volunteer::builder().id("far").user_id("victor").location(Location::at(43.2965, 5.3698)).available_days(vec![Day::Monday]).build(),
      Volunteer::builder().id("retired").user_id("val").location(Location::at(45.76, 4.83)).active(false).build(),
    ])
    .build();

  let givematch = Givematch::new(store.clone()).build();
  let report = givematch.match_task("pickup", MatchOptions { limit: None, apply: true }).await.unwrap();

  assert_eq!(report.matches.iter().map(|m| m.candidate.id.as_str()).collect::<Vec<_>>(), vec!["near", "far"]);
  assert!(matches!(report.outcome.commitment, Some(Commitment::Assignment(ref assignment)) if assignment.volunteer_id == "near"));
  assert_eq!(store.task("pickup").unwrap().status, TaskStatus::Assigned);
  assert!(store.notifications().iter().any(|n| n.user_id == "vera" && n.kind == NotificationKind::TaskAssigned));
}

#[tokio::test]
async fn expired_donations_are_not_offered() {
  let now = Timestamp::now();
  let store = MockStore::builder()
    .donations(vec![
      Donation::builder("food").id("stale").donor_id("dana").location(Location::city("Lyon")).expires_at(now - 24.hours()).build(),
      Donation::builder("food").id("fresh").donor_id("dana").location(Location::city("Lyon")).expires_at(now + 24.hours()).build(),
    ])
    .requests(vec![Request::builder("food").id("need").recipient_id("ryan").location(Location::city("Lyon")).build()])
    .build();

  let givematch = Givematch::new(store.clone()).build();
  let report = givematch.match_request("need", MatchOptions::default()).await.unwrap();

  assert_eq!(report.matches.iter().map(|m| m.candidate.id.as_str()).collect::<Vec<_>>(), vec!["fresh"]);

  assert_eq!(givematch.expire_stale_donations(now).await.unwrap(), 1);
  assert_eq!(store.donation("stale").unwrap().status, DonationStatus::Expired);
}

#[tokio::test]
async fn report_shape() {
  let store = MockStore::builder()
    .donations(vec![Donation::builder("food").id("soup").donor_id("dana").quantity(3.0).location(Location::city("Lille")).build()])
    .requests(vec![Request::builder("food").id("need").recipient_id("ryan").quantity_needed(3.0).location(Location::city("Lille")).build()])
    .build();

  let report = Givematch::new(store).build().match_donation("soup", MatchOptions::default()).await.unwrap();

  assert_json_include!(
    actual: serde_json::to_value(&report).unwrap(),
    expected: json!({
      "subject_id": "soup",
      "group": "donation_request",
      "parameters_version": 0,
      "matches": [{ "candidate": { "id": "need", "recipient_id": "ryan" }, "reason": "same category, nearby" }],
      "outcome": { "applied": false, "commitment": null, "notifications": 0 }
    })
  );
}
