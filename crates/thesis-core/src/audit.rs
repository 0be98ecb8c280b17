//! Structured audit records and the sink they are delivered to.
//!
//! Every committed mutation produces one [`AuditRecord`]. Records stay
//! structured inside the core; [`AuditRecord::description`] renders the
//! human-readable line a sink stores or prints.

use std::{fmt, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  identity::{Actor, StudentId, SupervisorId},
  submission::SubmissionId,
  thesis::ThesisId,
};

/// Rendered descriptions longer than this many characters are cut and end in
/// `...`.
pub const MAX_DESCRIPTION_LEN: usize = 500;

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
  ThesisCreated,
  ThesisUpdated,
  ThesisDeleted,
  QuotasUpdated,
  SubmissionCreated,
  SubmissionCancelled,
  SubmissionAccepted,
  SubmissionRejected,
  StudentRemoved,
}

impl AuditAction {
  fn verb(self) -> &'static str {
    match self {
      Self::ThesisCreated => "created",
      Self::ThesisUpdated | Self::QuotasUpdated => "updated",
      Self::ThesisDeleted => "deleted",
      Self::SubmissionCreated => "opened",
      Self::SubmissionCancelled => "cancelled",
      Self::SubmissionAccepted => "accepted",
      Self::SubmissionRejected => "rejected",
      Self::StudentRemoved => "removed",
    }
  }
}

/// What an audited operation acted on, with enough context to describe it
/// after the entity is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditTarget {
  Thesis {
    thesis_id: ThesisId,
    name:      String,
  },
  Submission {
    submission_id: SubmissionId,
    student_id:    StudentId,
    thesis_id:     ThesisId,
    thesis_name:   String,
  },
  Quotas {
    supervisor_id: SupervisorId,
  },
}

impl fmt::Display for AuditTarget {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Thesis { thesis_id, name } => {
        write!(f, "thesis '{name}' (id {thesis_id})")
      }
      Self::Submission { submission_id, student_id, thesis_id, thesis_name } => {
        write!(
          f,
          "submission {submission_id} of student {student_id} on thesis \
           '{thesis_name}' (id {thesis_id})"
        )
      }
      Self::Quotas { supervisor_id } => {
        write!(f, "quotas of supervisor {supervisor_id}")
      }
    }
  }
}

/// One field an operation changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
  pub field: String,
  pub old:   String,
  pub new:   String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
  pub audit_id:    Uuid,
  pub actor:       Actor,
  pub action:      AuditAction,
  pub target:      AuditTarget,
  pub changes:     Vec<FieldChange>,
  pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
  pub fn new(actor: Actor, action: AuditAction, target: AuditTarget) -> Self {
    Self {
      audit_id: Uuid::new_v4(),
      actor,
      action,
      target,
      changes: Vec::new(),
      recorded_at: Utc::now(),
    }
  }

  pub fn with_changes(mut self, changes: ChangeSet) -> Self {
    self.changes = changes.0;
    self
  }

  /// Free-text rendering, at most [`MAX_DESCRIPTION_LEN`] characters.
  pub fn description(&self) -> String {
    let mut text =
      format!("{} {} {}", self.actor, self.action.verb(), self.target);
    if !self.changes.is_empty() {
      let fields = self
        .changes
        .iter()
        .map(|c| format!("{}: \"{}\" -> \"{}\"", c.field, c.old, c.new))
        .collect::<Vec<_>>()
        .join(", ");
      text.push_str(": ");
      text.push_str(&fields);
    }
    truncate(text, MAX_DESCRIPTION_LEN)
  }
}

fn truncate(text: String, max: usize) -> String {
  if text.chars().count() <= max {
    return text;
  }
  let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
  cut.push_str("...");
  cut
}

// ─── Change set ──────────────────────────────────────────────────────────────

/// The fields an operation actually changed, in the order it changed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(Vec<FieldChange>);

impl ChangeSet {
  pub fn record(
    &mut self,
    field: &str,
    old: impl fmt::Display,
    new: impl fmt::Display,
  ) {
    self.0.push(FieldChange {
      field: field.to_owned(),
      old:   old.to_string(),
      new:   new.to_string(),
    });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Destination for audit records.
///
/// Delivery is best-effort: the engine logs and drops any error returned
/// here, and never rolls back the mutation being described.
pub trait AuditSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn record(
    &self,
    entry: AuditRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
