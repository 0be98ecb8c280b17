//! Error types for `thesis-core`.

use thiserror::Error;

use crate::{
  identity::{AcademicTitle, StudentId, SupervisorId},
  submission::{SubmissionId, SubmissionStatus},
  thesis::{MAX_NAME_LEN, ThesisId, ThesisStatus, ThesisType},
};

/// Coarse classification of an [`Error`], used by transport layers to pick a
/// response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// An id that does not exist, or is not owned by the caller.
  NotFound,
  /// The current state forbids the transition.
  Precondition,
  /// The request itself is malformed.
  Validation,
  /// The supervisor has no quota left for the requested thesis type.
  Exhaustion,
  /// Anything else, typically a storage failure.
  Unexpected,
}

#[derive(Debug, Error)]
pub enum Error {
  // ── Not found ─────────────────────────────────────────────────────────
  #[error("student not found: {0}")]
  StudentNotFound(StudentId),

  #[error("supervisor not found: {0}")]
  SupervisorNotFound(SupervisorId),

  #[error("thesis {0} not found")]
  ThesisNotFound(ThesisId),

  #[error("submission {0} not found")]
  SubmissionNotFound(SubmissionId),

  #[error("student {0} has no submission")]
  NoSubmission(StudentId),

  // ── Preconditions ─────────────────────────────────────────────────────
  #[error("thesis {id} is not open for applications (status: {status})")]
  ThesisNotAvailable { id: ThesisId, status: ThesisStatus },

  #[error("student is already assigned to thesis '{thesis_name}' (id {thesis_id})")]
  StudentAlreadyAssigned {
    thesis_id:   ThesisId,
    thesis_name: String,
  },

  #[error("submission {id} is no longer open (status: {status})")]
  SubmissionAlreadyResolved {
    id:     SubmissionId,
    status: SubmissionStatus,
  },

  #[error("submission {id} is not accepted (status: {status})")]
  SubmissionNotAccepted {
    id:     SubmissionId,
    status: SubmissionStatus,
  },

  #[error("thesis '{name}' already has its maximum of {capacity} students")]
  ThesisFull { name: String, capacity: u32 },

  #[error("capacity {capacity} is below the {accepted} students already accepted")]
  CapacityBelowAccepted { capacity: u32, accepted: u32 },

  #[error("thesis {0} still has open or accepted submissions")]
  ThesisHasSubmissions(ThesisId),

  // ── Validation ────────────────────────────────────────────────────────
  #[error("invalid thesis type: {0:?}")]
  InvalidThesisType(String),

  #[error("invalid thesis status: {0:?}")]
  InvalidThesisStatus(String),

  #[error("the number of students per thesis must be positive, got {0}")]
  NonPositiveCapacity(i64),

  #[error("a {kind} thesis requires the title {required} or higher, supervisor holds {actual}")]
  TitleRequirement {
    kind:     ThesisType,
    required: AcademicTitle,
    actual:   AcademicTitle,
  },

  #[error("thesis name must be between 1 and {} characters", MAX_NAME_LEN)]
  InvalidThesisName,

  #[error("language must be at most {} characters", MAX_NAME_LEN)]
  InvalidLanguage,

  // ── Exhaustion ────────────────────────────────────────────────────────
  #[error("supervisor {supervisor} has used up the quota for {kind} theses")]
  QuotaExhausted {
    supervisor: SupervisorId,
    kind:       ThesisType,
  },

  // ── Unexpected ────────────────────────────────────────────────────────
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::StudentNotFound(_)
      | Self::SupervisorNotFound(_)
      | Self::ThesisNotFound(_)
      | Self::SubmissionNotFound(_)
      | Self::NoSubmission(_) => ErrorKind::NotFound,

      Self::ThesisNotAvailable { .. }
      | Self::StudentAlreadyAssigned { .. }
      | Self::SubmissionAlreadyResolved { .. }
      | Self::SubmissionNotAccepted { .. }
      | Self::ThesisFull { .. }
      | Self::CapacityBelowAccepted { .. }
      | Self::ThesisHasSubmissions(_) => ErrorKind::Precondition,

      Self::InvalidThesisType(_)
      | Self::InvalidThesisStatus(_)
      | Self::NonPositiveCapacity(_)
      | Self::TitleRequirement { .. }
      | Self::InvalidThesisName
      | Self::InvalidLanguage => ErrorKind::Validation,

      Self::QuotaExhausted { .. } => ErrorKind::Exhaustion,

      Self::Store(_) => ErrorKind::Unexpected,
    }
  }

  /// Box a backend error as [`Error::Store`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
