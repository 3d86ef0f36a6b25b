use libgivematch_macros::scoring_feature;

use crate::{
  matching::{Feature, text::same_label},
  model::{Task, Volunteer},
  params::Thresholds,
};

#[scoring_feature(Skills, name = "skills", reason = "has the skills", fallback = 0.5)]
fn score_feature(&self, _thresholds: &Thresholds, lhs: &Task, rhs: &Volunteer) -> Option<f64> {
  let required = lhs.required_skills.iter().filter(|skill| !skill.trim().is_empty()).collect::<Vec<_>>();

  if required.is_empty() {
    return Some(1.0);
  }

  let skills = rhs.skills.as_ref()?;
  let covered = required.iter().filter(|needed| skills.iter().any(|skill| same_label(needed, skill))).count();

  Some(covered as f64 / required.len() as f64)
}
