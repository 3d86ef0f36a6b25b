use crate::{
  matching::{
    Feature, MatchingAlgorithm,
    features::{delivery::DeliveryCompatibility, item::ItemCompatibility, proximity::Proximity, reliability::DonorReliability, urgency::UrgencyAlignment},
  },
  model::{Donation, Request},
  params::ParameterGroup,
};

const FEATURES: &[&dyn Feature<Donation, Request>] = &[&Proximity, &ItemCompatibility, &UrgencyAlignment, &DeliveryCompatibility, &DonorReliability];

/// Scores a donation against a recipient's request.
pub struct DonationRequest;

impl MatchingAlgorithm for DonationRequest {
  type Lhs = Donation;
  type Rhs = Request;

  fn name() -> &'static str {
    "donation-request"
  }

  fn group() -> ParameterGroup {
    ParameterGroup::DonationRequest
  }

  fn features() -> &'static [&'static dyn Feature<Donation, Request>] {
    FEATURES
  }
}

#[cfg(test)]
mod tests {
  use float_cmp::approx_eq;
  use itertools::Itertools;

  use crate::{
    matching::{DonationRequest, MatchingAlgorithm},
    model::{DeliveryMode, Donation, Location, ReliabilityStats, Request, Urgency},
    params::{MatchingParameters, ParameterGroup, ParameterSnapshot},
  };

  fn snapshot() -> ParameterSnapshot {
    ParameterSnapshot::defaults(ParameterGroup::DonationRequest)
  }

  #[test]
  fn same_city_same_category() {
    let donation = Donation::builder("food").quantity(10.0).location(Location::city("Lyon")).build();
    let request = Request::builder("food").quantity_needed(10.0).location(Location::city("Lyon")).build();
    let snapshot = snapshot();

    let scored = DonationRequest::score(&snapshot, &donation, &request);

    assert_eq!(scored.feature("item_compatibility").unwrap().score, 1.0);
    assert_eq!(scored.feature("proximity").unwrap().score, 1.0);

    // Urgency, delivery and reliability are unknown and fall back to 0.5.
    let expected = snapshot.weight("proximity") + snapshot.weight("item_compatibility") + 0.5 * (snapshot.weight("urgency_alignment") + snapshot.weight("delivery_compatibility") + snapshot.weight("donor_reliability"));

    assert!(approx_eq!(f64, scored.score, expected, epsilon = 1e-9));
    assert_eq!(scored.unobserved().collect_vec(), vec!["urgency_alignment", "delivery_compatibility", "donor_reliability"]);
  }

  #[test]
  fn only_location_and_item_weighted() {
    let mut params = MatchingParameters::defaults(ParameterGroup::DonationRequest);
    params.weights.retain(|name, _| name == "proximity" || name == "item_compatibility");

    let snapshot = ParameterSnapshot::new(ParameterGroup::DonationRequest, 1, params);
    let donation = Donation::builder("food").quantity(10.0).location(Location::city("Lyon")).build();
    let request = Request::builder("food").quantity_needed(10.0).location(Location::city("Lyon")).build();

    let scored = DonationRequest::score(&snapshot, &donation, &request);

    assert!(approx_eq!(f64, scored.score, 0.30 + 0.35, epsilon = 1e-9));
    assert_eq!(scored.reason, "same category, nearby");
  }

  #[test]
  fn mismatched_category_and_city() {
    let donation = Donation::builder("food").quantity(10.0).location(Location::city("Lyon")).urgent(true).build();
    let request = Request::builder("clothing").quantity_needed(10.0).location(Location::city("Paris")).urgency(Urgency::Critical).build();
    let snapshot = snapshot();

    let scored = DonationRequest::score(&snapshot, &donation, &request);

    assert_eq!(scored.feature("item_compatibility").unwrap().score, 0.0);
    assert_eq!(scored.feature("proximity").unwrap().score, 0.0);

    let expected = snapshot.weight("urgency_alignment") + 0.5 * (snapshot.weight("delivery_compatibility") + snapshot.weight("donor_reliability"));

    assert!(approx_eq!(f64, scored.score, expected, epsilon = 1e-9));
    assert_eq!(scored.reason, "pressing need");
  }

  #[test]
  fn unnormalized_weights_exceed_one() {
    let mut params = MatchingParameters::defaults(ParameterGroup::DonationRequest);
    params.weights.values_mut().for_each(|weight| *weight = 0.5);

    let snapshot = ParameterSnapshot::new(ParameterGroup::DonationRequest, 1, params);
    let donation = Donation::builder("food")
      .quantity(10.0)
      .location(Location::at(45.76, 4.83))
      .urgent(true)
      .delivery_mode(DeliveryMode::Pickup)
      .donor_stats(ReliabilityStats { completed: 10, cancelled: 0 })
      .build();
    let request = Request::builder("food")
      .quantity_needed(10.0)
      .location(Location::at(45.76, 4.83))
      .urgency(Urgency::Critical)
      .delivery_preference(DeliveryMode::Pickup)
      .build();

    let scored = DonationRequest::score(&snapshot, &donation, &request);

    assert!(approx_eq!(f64, scored.score, 2.5, epsilon = 1e-9));
    assert!(scored.score > 1.0);
  }

  #[test]
  fn deterministic() {
    let donation = Donation::builder("clothing").title("Winter coats").quantity(3.0).location(Location::at(48.85, 2.35)).build();
    let request = Request::builder("clothing").title("coat for a child").quantity_needed(1.0).location(Location::at(48.80, 2.30)).build();
    let snapshot = snapshot();

    let first = DonationRequest::score(&snapshot, &donation, &request);

    for _ in 0..10 {
      assert_eq!(DonationRequest::score(&snapshot, &donation, &request), first);
    }
  }

  #[test]
  fn features_are_bounded() {
    let donations = [
      Donation::builder("food").quantity(1e9).location(Location::at(0.0, 0.0)).build(),
      Donation::builder("").quantity(-5.0).build(),
      Donation::builder("food").quantity(f64::NAN).location(Location::at(f64::INFINITY, 0.0)).urgent(true).build(),
    ];
    let requests = [
      Request::builder("food").quantity_needed(0.0).location(Location::at(0.0, 0.0)).urgency(Urgency::Critical).build(),
      Request::builder("FOOD").quantity_needed(-1.0).location(Location::city("")).build(),
      Request::builder("toys").title("food food food").build(),
    ];
    let snapshot = snapshot();

    for (donation, request) in donations.iter().cartesian_product(requests.iter()) {
      let scored = DonationRequest::score(&snapshot, donation, request);

      for feature in &scored.features {
        assert!((0.0..=1.0).contains(&feature.score), "{} out of bounds: {}", feature.name, feature.score);
      }

      assert!((0.0..=1.0).contains(&scored.score));
    }
  }
}
