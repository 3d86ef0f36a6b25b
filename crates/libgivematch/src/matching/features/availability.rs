use libgivematch_macros::scoring_feature;

use crate::{
  matching::Feature,
  model::{Day, Task, Volunteer},
  params::Thresholds,
};

#[scoring_feature(Availability, name = "availability", reason = "available that day", fallback = 0.5)]
fn score_feature(&self, _thresholds: &Thresholds, lhs: &Task, rhs: &Volunteer) -> Option<f64> {
  let days = rhs.available_days.as_deref().filter(|days| !days.is_empty())?;

  let Some(date) = lhs.scheduled_for else {
    return Some(1.0);
  };

  match days.contains(&Day::from(date.weekday())) {
    true => Some(1.0),
    false => Some(0.0),
  }
}

#[cfg(test)]
mod tests {
  use jiff::civil::date;

  use crate::{
    matching::Feature,
    model::{Day, Task, Volunteer},
    params::Thresholds,
  };

  #[test]
  fn availability() {
    let weekends = Volunteer::builder().available_days(vec![Day::Saturday, Day::Sunday]).build();
    let sunday = Task::builder().scheduled_for(date(2026, 10, 18)).build();
    let monday = Task::builder().scheduled_for(date(2026, 10, 19)).build();
    let anytime = Task::builder().build();

    assert_eq!(super::Availability.score_feature(&Thresholds::default(), &sunday, &weekends), Some(1.0));
    assert_eq!(super::Availability.score_feature(&Thresholds::default(), &monday, &weekends), Some(0.0));
    assert_eq!(super::Availability.score_feature(&Thresholds::default(), &anytime, &weekends), Some(1.0));
  }

  #[test]
  fn unknown_availability() {
    let task = Task::builder().scheduled_for(date(2026, 10, 18)).build();

    let volunteer = Volunteer::builder().build();
    assert_eq!(super::Availability.score_feature(&Thresholds::default(), &task, &volunteer), None);

    let volunteer = Volunteer::builder().available_days(vec![]).build();
    assert_eq!(super::Availability.score_feature(&Thresholds::default(), &task, &volunteer), None);
  }
}
