use crate::{
  matching::{
    Feature, MatchingAlgorithm,
    features::{availability::Availability, proximity::Proximity, reliability::VolunteerReliability, skills::Skills},
  },
  model::{Task, Volunteer},
  params::ParameterGroup,
};

const FEATURES: &[&dyn Feature<Task, Volunteer>] = &[&Proximity, &Availability, &Skills, &VolunteerReliability];

/// Scores a volunteer for a delivery or pickup task.
pub struct TaskVolunteer;

impl MatchingAlgorithm for TaskVolunteer {
  type Lhs = Task;
  type Rhs = Volunteer;

  fn name() -> &'static str {
    "task-volunteer"
  }

  fn group() -> ParameterGroup {
    ParameterGroup::TaskVolunteer
  }

  fn features() -> &'static [&'static dyn Feature<Task, Volunteer>] {
    FEATURES
  }
}

#[cfg(test)]
mod tests {
  use float_cmp::approx_eq;
  use itertools::Itertools;
  use jiff::civil::date;

  use crate::{
    matching::{MatchingAlgorithm, TaskVolunteer},
    model::{Day, Location, ReliabilityStats, Task, Volunteer},
    params::{ParameterGroup, ParameterSnapshot},
  };

  #[test]
  fn ideal_volunteer() {
    let snapshot = ParameterSnapshot::defaults(ParameterGroup::TaskVolunteer);
    let task = Task::builder()
      .location(Location::at(45.76, 4.83))
      .scheduled_for(date(2026, 10, 18))
      .required_skills(vec!["driving".to_string()])
      .build();
    let volunteer = Volunteer::builder()
      .location(Location::at(45.76, 4.83))
      .available_days(vec![Day::Sunday])
      .skills(vec!["Driving".to_string()])
      .stats(ReliabilityStats { completed: 12, cancelled: 1 })
      .build();

    let scored = TaskVolunteer::score(&snapshot, &task, &volunteer);

    assert!(approx_eq!(f64, scored.score, 1.0, epsilon = 1e-9));
    assert_eq!(scored.unobserved().count(), 0);
    assert_eq!(scored.reason, "nearby, available that day");
  }

  #[test]
  fn unknown_volunteer_profile() {
    let snapshot = ParameterSnapshot::defaults(ParameterGroup::TaskVolunteer);
    let task = Task::builder().location(Location::city("Lyon")).required_skills(vec!["cooking".to_string()]).build();
    let volunteer = Volunteer::builder().location(Location::city("Lyon")).build();

    let scored = TaskVolunteer::score(&snapshot, &task, &volunteer);
    let expected = snapshot.weight("proximity") + 0.5 * (snapshot.weight("availability") + snapshot.weight("skills") + snapshot.weight("volunteer_reliability"));

    assert!(approx_eq!(f64, scored.score, expected, epsilon = 1e-9));
    assert_eq!(scored.unobserved().collect::<Vec<_>>(), vec!["availability", "skills", "volunteer_reliability"]);
  }

  #[test]
  fn features_are_bounded() {
    let tasks = [
      Task::builder().location(Location::at(0.0, 0.0)).scheduled_for(date(2026, 10, 18)).build(),
      Task::builder().location(Location::at(f64::NAN, 200.0)).required_skills(vec![String::new(), "DRIVING".to_string()]).build(),
      Task::builder().location(Location::city("")).scheduled_for(date(2026, 10, 19)).required_skills(vec!["cooking".to_string()]).build(),
    ];
    let volunteers = [
      Volunteer::builder().location(Location::at(-89.9, 179.9)).available_days(vec![]).skills(vec![]).stats(ReliabilityStats { completed: 0, cancelled: 0 }).build(),
      Volunteer::builder()
        .location(Location::at(f64::INFINITY, 0.0))
        .available_days(vec![Day::Sunday, Day::Monday])
        .skills(vec!["driving".to_string(), "driving".to_string(), "cooking".to_string()])
        .stats(ReliabilityStats { completed: u32::MAX, cancelled: u32::MAX })
        .build(),
      Volunteer::builder().location(Location::city("Lyon")).stats(ReliabilityStats { completed: 0, cancelled: 40 }).build(),
    ];
    let snapshot = ParameterSnapshot::defaults(ParameterGroup::TaskVolunteer);

    for (task, volunteer) in tasks.iter().cartesian_product(volunteers.iter()) {
      let scored = TaskVolunteer::score(&snapshot, task, volunteer);

      for feature in &scored.features {
        assert!((0.0..=1.0).contains(&feature.score), "{} out of bounds: {}", feature.name, feature.score);
      }

      assert!((0.0..=1.0).contains(&scored.score));
    }
  }
}
