//! The `ThesisStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `thesis-store-sqlite`).
//! The lifecycle engine depends on this abstraction, not on any concrete
//! backend.
//!
//! Reads return whatever is committed. Every write is a single atomic
//! transaction: the engine decides *what* to change under its per-entity
//! locks, and the store guarantees that the change lands completely or not
//! at all.

use std::future::Future;

use crate::{
  identity::{
    NewStudent,
    NewSupervisor,
    Quotas,
    Student,
    StudentId,
    Supervisor,
    SupervisorId,
  },
  submission::{NewSubmission, Submission, SubmissionId, SubmissionStatus},
  thesis::{NewThesis, StatusChange, Thesis, ThesisId},
};

/// Abstraction over a thesis-workflow storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ThesisStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Identities ────────────────────────────────────────────────────────

  fn insert_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn insert_supervisor(
    &self,
    input: NewSupervisor,
  ) -> impl Future<Output = Result<Supervisor, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: StudentId,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn get_supervisor(
    &self,
    id: SupervisorId,
  ) -> impl Future<Output = Result<Option<Supervisor>, Self::Error>> + Send + '_;

  /// Overwrite all four quota counters of a supervisor.
  fn set_quotas(
    &self,
    id: SupervisorId,
    quotas: Quotas,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Theses ────────────────────────────────────────────────────────────

  /// Reserve one quota slot for `input.kind` and insert the thesis with
  /// status `Open`, atomically.
  ///
  /// Returns `None`, writing nothing, when the supervisor's quota for the
  /// type is already zero.
  fn create_thesis(
    &self,
    input: NewThesis,
  ) -> impl Future<Output = Result<Option<Thesis>, Self::Error>> + Send + '_;

  fn get_thesis(
    &self,
    id: ThesisId,
  ) -> impl Future<Output = Result<Option<Thesis>, Self::Error>> + Send + '_;

  fn list_theses_by_supervisor(
    &self,
    id: SupervisorId,
  ) -> impl Future<Output = Result<Vec<Thesis>, Self::Error>> + Send + '_;

  /// Theses with status `Open`.
  fn list_open_theses(
    &self,
  ) -> impl Future<Output = Result<Vec<Thesis>, Self::Error>> + Send + '_;

  /// Persist every mutable column of `thesis`.
  fn save_thesis(
    &self,
    thesis: Thesis,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a thesis together with its rejected submissions and give its
  /// quota slot back to the owner, atomically.
  fn delete_thesis(
    &self,
    id: ThesisId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Submissions ───────────────────────────────────────────────────────

  fn get_submission(
    &self,
    id: SubmissionId,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  fn get_submission_for_student(
    &self,
    id: StudentId,
  ) -> impl Future<Output = Result<Option<Submission>, Self::Error>> + Send + '_;

  fn list_submissions(
    &self,
    thesis: ThesisId,
  ) -> impl Future<Output = Result<Vec<Submission>, Self::Error>> + Send + '_;

  /// Number of `Accepted` submissions on a thesis.
  fn count_accepted(
    &self,
    thesis: ThesisId,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  /// Insert an `Open` submission, deleting `input.supersedes` in the same
  /// transaction.
  fn insert_submission(
    &self,
    input: NewSubmission,
  ) -> impl Future<Output = Result<Submission, Self::Error>> + Send + '_;

  /// Set a submission's status, applying `thesis` in the same transaction.
  fn set_submission_status(
    &self,
    id: SubmissionId,
    status: SubmissionStatus,
    thesis: Option<StatusChange>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a submission, applying `thesis` in the same transaction.
  fn delete_submission(
    &self,
    id: SubmissionId,
    thesis: Option<StatusChange>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
