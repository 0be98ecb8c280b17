//! A student's application to a thesis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  identity::StudentId,
  thesis::{Thesis, ThesisId},
};

row_id!(
  /// Stable id of a submission.
  SubmissionId
);

/// Where a submission stands.
///
/// `Open` moves to `Accepted` or `Rejected` exactly once. An open row can be
/// cancelled by its student and an accepted row removed by the supervisor;
/// both delete the row.
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
#[strum(serialize_all = "snake_case")]
pub enum SubmissionStatus {
  Open,
  Accepted,
  Rejected,
}

impl SubmissionStatus {
  /// Whether the row still blocks its student from applying elsewhere.
  /// Rejected rows are superseded by the student's next application.
  pub fn is_live(self) -> bool { !matches!(self, Self::Rejected) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
  pub submission_id: SubmissionId,
  pub student_id:    StudentId,
  pub thesis_id:     ThesisId,
  pub status:        SubmissionStatus,
  pub created_at:    DateTime<Utc>,
}

/// Input to [`crate::store::ThesisStore::insert_submission`].
#[derive(Debug, Clone)]
pub struct NewSubmission {
  pub student_id: StudentId,
  pub thesis_id:  ThesisId,
  /// A rejected row of the same student to delete in the same transaction.
  pub supersedes: Option<SubmissionId>,
}

/// A thesis together with every submission made to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThesisDetail {
  pub thesis:         Thesis,
  pub submissions:    Vec<Submission>,
  pub accepted_count: u32,
}
