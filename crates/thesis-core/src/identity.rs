//! Student and supervisor identities, academic titles, and the per-supervisor
//! quota ledger.
//!
//! Identities are owned by the surrounding user-management system. The core
//! reads them and mutates nothing except a supervisor's [`Quotas`].

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::thesis::ThesisType;

row_id!(
  /// Stable id of a student.
  StudentId
);

row_id!(
  /// Stable id of a supervisor.
  SupervisorId
);

// ─── Academic title ──────────────────────────────────────────────────────────

/// A supervisor's academic title.
///
/// Variants are declared in rank order, so the derived `Ord` compares by
/// rank (`Engineer < Master < Professor`), never alphabetically.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AcademicTitle {
  #[default]
  None,
  Engineer,
  Bachelor,
  Master,
  Doctor,
  HabilitatedDoctor,
  Professor,
}

impl AcademicTitle {
  /// Position in the title ordering, `0` for [`AcademicTitle::None`].
  pub fn rank(self) -> u8 { self as u8 }
}

// ─── Quotas ──────────────────────────────────────────────────────────────────

/// Remaining number of theses of each type a supervisor may still create.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct Quotas {
  pub bachelor:    u32,
  pub engineering: u32,
  pub master:      u32,
  pub doctor:      u32,
}

impl Quotas {
  pub fn get(&self, kind: ThesisType) -> u32 {
    match kind {
      ThesisType::Bachelor => self.bachelor,
      ThesisType::Engineering => self.engineering,
      ThesisType::Master => self.master,
      ThesisType::Doctor => self.doctor,
    }
  }
}

// ─── Identities ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:   StudentId,
  pub full_name:    String,
  pub index_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supervisor {
  pub supervisor_id:  SupervisorId,
  pub full_name:      String,
  pub academic_title: AcademicTitle,
  pub quotas:         Quotas,
}

/// Input to [`crate::store::ThesisStore::insert_student`].
#[derive(Debug, Clone)]
pub struct NewStudent {
  pub full_name:    String,
  pub index_number: String,
}

/// Input to [`crate::store::ThesisStore::insert_supervisor`].
#[derive(Debug, Clone)]
pub struct NewSupervisor {
  pub full_name:      String,
  pub academic_title: AcademicTitle,
  pub quotas:         Quotas,
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The identity on whose behalf an operation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
  Student(StudentId),
  Supervisor(SupervisorId),
}

impl Actor {
  pub fn id(&self) -> i64 {
    match self {
      Self::Student(id) => id.0,
      Self::Supervisor(id) => id.0,
    }
  }

  pub fn role(&self) -> &'static str {
    match self {
      Self::Student(_) => "student",
      Self::Supervisor(_) => "supervisor",
    }
  }
}

impl fmt::Display for Actor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.role(), self.id())
  }
}
