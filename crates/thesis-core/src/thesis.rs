//! Thesis topics offered by supervisors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::identity::{AcademicTitle, SupervisorId};

row_id!(
  /// Stable id of a thesis.
  ThesisId
);

row_id!(
  /// Opaque reference to a tag owned by the tag store.
  TagId
);

/// Language assumed when a thesis is created without one.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Upper bound on the length of a thesis name and of its language, in
/// characters.
pub const MAX_NAME_LEN: usize = 100;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The degree a thesis leads to. Each type has its own supervisor quota.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ThesisType {
  Engineering,
  Bachelor,
  Master,
  Doctor,
}

impl ThesisType {
  /// The lowest academic title allowed to supervise a thesis of this type.
  pub fn required_title(self) -> AcademicTitle {
    match self {
      Self::Bachelor | Self::Engineering => AcademicTitle::Master,
      Self::Master => AcademicTitle::Doctor,
      Self::Doctor => AcademicTitle::HabilitatedDoctor,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ThesisStatus {
  /// Accepting applications.
  Open,
  /// Every slot is taken, or the supervisor closed it by hand.
  Closed,
  /// Set by hand only. Submission counts never move a thesis out of this
  /// state.
  Finished,
}

// ─── Thesis ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thesis {
  pub thesis_id:     ThesisId,
  pub supervisor_id: SupervisorId,
  pub kind:          ThesisType,
  pub name:          String,
  pub description:   Option<String>,
  /// Maximum number of accepted submissions; always at least 1.
  pub capacity:      u32,
  pub status:        ThesisStatus,
  pub language:      String,
  pub tags:          Vec<TagId>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// A validated thesis ready to be persisted by
/// [`crate::store::ThesisStore::create_thesis`]. Timestamps and the id are
/// assigned by the store; status always starts [`ThesisStatus::Open`].
#[derive(Debug, Clone)]
pub struct NewThesis {
  pub supervisor_id: SupervisorId,
  pub kind:          ThesisType,
  pub name:          String,
  pub description:   Option<String>,
  pub capacity:      u32,
  pub language:      String,
  pub tags:          Vec<TagId>,
}

// ─── Engine inputs ───────────────────────────────────────────────────────────

/// Unvalidated input to [`crate::LifecycleEngine::create_thesis`].
///
/// `kind` and `capacity` arrive raw so that invalid values surface as the
/// corresponding validation errors instead of deserialisation failures.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateThesis {
  pub kind:        String,
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default = "default_capacity")]
  pub capacity:    i64,
  #[serde(default)]
  pub language:    Option<String>,
  #[serde(default)]
  pub tags:        Vec<TagId>,
}

fn default_capacity() -> i64 { 1 }

/// A partial update for [`crate::LifecycleEngine::update_thesis`].
///
/// Absent and empty fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThesisPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub capacity:    Option<i64>,
  pub status:      Option<String>,
  pub language:    Option<String>,
  pub tags:        Option<Vec<TagId>>,
}

/// A thesis status flip committed together with a submission change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
  pub thesis_id: ThesisId,
  pub status:    ThesisStatus,
  pub at:        DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn required_titles() {
    assert_eq!(ThesisType::Bachelor.required_title(), AcademicTitle::Master);
    assert_eq!(
      ThesisType::Engineering.required_title(),
      AcademicTitle::Master
    );
    assert_eq!(ThesisType::Master.required_title(), AcademicTitle::Doctor);
    assert_eq!(
      ThesisType::Doctor.required_title(),
      AcademicTitle::HabilitatedDoctor
    );
  }

  #[test]
  fn every_type_round_trips_through_its_name() {
    for kind in ThesisType::iter() {
      assert_eq!(ThesisType::from_str(kind.as_ref()).unwrap(), kind);
    }
    assert!(ThesisType::from_str("habilitation").is_err());
  }

  #[test]
  fn status_names() {
    assert_eq!(ThesisStatus::Finished.to_string(), "finished");
    assert!(ThesisStatus::from_str("archived").is_err());
  }

  #[test]
  fn names_parse_in_any_case() {
    assert_eq!(ThesisType::from_str("MASTER").unwrap(), ThesisType::Master);
    assert_eq!(ThesisStatus::from_str("Open").unwrap(), ThesisStatus::Open);
    assert_eq!(ThesisStatus::Closed.as_ref(), "closed");
  }

  #[test]
  fn create_input_defaults() {
    let input: CreateThesis =
      serde_json::from_str(r#"{"kind":"master","name":"Graphs"}"#).unwrap();
    assert_eq!(input.capacity, 1);
    assert!(input.language.is_none());
    assert!(input.tags.is_empty());
  }
}
