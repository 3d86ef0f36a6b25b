use crate::model::Coordinates;

/// Mean Earth radius, in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two points, in kilometers.
pub(crate) fn haversine_km(lhs: Coordinates, rhs: Coordinates) -> f64 {
  let (lat1, lat2) = (lhs.lat.to_radians(), rhs.lat.to_radians());
  let dlat = (rhs.lat - lhs.lat).to_radians();
  let dlon = (rhs.lon - lhs.lon).to_radians();

  let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

  2.0 * EARTH_RADIUS_KM * a.sqrt().clamp(0.0, 1.0).asin()
}

/// Linear decay from 1.0 at zero distance to 0.0 at `max_km` and beyond.
pub(crate) fn distance_decay(distance_km: f64, max_km: f64) -> f64 {
  if !distance_km.is_finite() || max_km <= 0.0 {
    return 0.0;
  }

  (1.0 - distance_km / max_km).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
  use float_cmp::approx_eq;

  use crate::model::Coordinates;

  #[test]
  fn haversine_km() {
    let paris = Coordinates::new(48.8566, 2.3522);
    let london = Coordinates::new(51.5074, -0.1278);

    assert!(approx_eq!(f64, super::haversine_km(paris, paris), 0.0, epsilon = 1e-9));
    assert!(approx_eq!(f64, super::haversine_km(paris, london), 343.5, epsilon = 1.0));
    assert!(approx_eq!(f64, super::haversine_km(paris, london), super::haversine_km(london, paris), epsilon = 1e-9));
  }

  #[test]
  fn antipodes_are_half_the_circumference_away() {
    let distance = super::haversine_km(Coordinates::new(0.0, 0.0), Coordinates::new(0.0, 180.0));

    assert!(approx_eq!(f64, distance, std::f64::consts::PI * super::EARTH_RADIUS_KM, epsilon = 1e-6));
  }

  #[test]
  fn distance_decay() {
    assert_eq!(super::distance_decay(0.0, 50.0), 1.0);
    assert_eq!(super::distance_decay(25.0, 50.0), 0.5);
    assert_eq!(super::distance_decay(50.0, 50.0), 0.0);
    assert_eq!(super::distance_decay(500.0, 50.0), 0.0);
    assert_eq!(super::distance_decay(f64::NAN, 50.0), 0.0);
    assert_eq!(super::distance_decay(10.0, 0.0), 0.0);
  }
}
