//! [`LifecycleEngine`]: every state change of theses, submissions and
//! supervisor quotas goes through here.
//!
//! Each mutating operation follows the same shape:
//!
//! 1. lock the entities it reads and writes ([`KeyedLocks`]);
//! 2. re-read them and check preconditions against that consistent view;
//! 3. commit the transition through one atomic [`ThesisStore`] call;
//! 4. release the locks and hand an [`AuditRecord`] to the [`AuditSink`].

use std::{str::FromStr, sync::Arc};

use chrono::Utc;

use crate::{
  Error,
  Result,
  audit::{AuditAction, AuditRecord, AuditSink, AuditTarget, ChangeSet},
  identity::{Actor, Quotas, Student, StudentId, Supervisor, SupervisorId},
  locks::{KeyedLocks, LockKey, LockSet},
  store::ThesisStore,
  submission::{
    NewSubmission,
    Submission,
    SubmissionId,
    SubmissionStatus,
    ThesisDetail,
  },
  thesis::{
    CreateThesis,
    DEFAULT_LANGUAGE,
    MAX_NAME_LEN,
    NewThesis,
    StatusChange,
    Thesis,
    ThesisId,
    ThesisPatch,
    ThesisStatus,
    ThesisType,
  },
};

pub struct LifecycleEngine<S, A> {
  store: Arc<S>,
  audit: Arc<A>,
  locks: KeyedLocks,
}

impl<S, A> LifecycleEngine<S, A>
where
  S: ThesisStore,
  A: AuditSink,
{
  pub fn new(store: Arc<S>, audit: Arc<A>) -> Self {
    Self { store, audit, locks: KeyedLocks::new() }
  }

  // ── Lookups ───────────────────────────────────────────────────────────

  async fn student(&self, id: StudentId) -> Result<Student> {
    self
      .store
      .get_student(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::StudentNotFound(id))
  }

  async fn supervisor(&self, id: SupervisorId) -> Result<Supervisor> {
    self
      .store
      .get_supervisor(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SupervisorNotFound(id))
  }

  async fn thesis(&self, id: ThesisId) -> Result<Thesis> {
    self
      .store
      .get_thesis(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ThesisNotFound(id))
  }

  /// A thesis, provided `supervisor` owns it.
  async fn owned_thesis(
    &self,
    supervisor: SupervisorId,
    id: ThesisId,
  ) -> Result<Thesis> {
    match self.thesis(id).await {
      Ok(thesis) if thesis.supervisor_id == supervisor => Ok(thesis),
      Ok(_) | Err(Error::ThesisNotFound(_)) => Err(Error::ThesisNotFound(id)),
      Err(e) => Err(e),
    }
  }

  async fn submission(&self, id: SubmissionId) -> Result<Submission> {
    self
      .store
      .get_submission(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::SubmissionNotFound(id))
  }

  /// A submission and its thesis, provided `supervisor` owns the thesis.
  async fn owned_submission(
    &self,
    supervisor: SupervisorId,
    id: SubmissionId,
  ) -> Result<(Submission, Thesis)> {
    let submission = self.submission(id).await?;
    let thesis = self
      .owned_thesis(supervisor, submission.thesis_id)
      .await
      .map_err(|e| match e {
        Error::ThesisNotFound(_) => Error::SubmissionNotFound(id),
        other => other,
      })?;
    Ok((submission, thesis))
  }

  async fn accepted(&self, thesis: ThesisId) -> Result<u32> {
    self.store.count_accepted(thesis).await.map_err(Error::store)
  }

  /// Deliver an audit record. Failures are logged and dropped.
  async fn emit(&self, record: AuditRecord) {
    let action = record.action;
    if let Err(e) = self.audit.record(record).await {
      tracing::warn!(%action, error = %e, "failed to write audit record");
    }
  }

  // ── Quota ledger ──────────────────────────────────────────────────────

  /// Replace a supervisor's quota allocation. Nothing is written or audited
  /// when the counters already match.
  pub async fn set_quotas(
    &self,
    supervisor_id: SupervisorId,
    quotas: Quotas,
  ) -> Result<Supervisor> {
    let locks = self
      .locks
      .acquire([LockKey::Supervisor(supervisor_id)])
      .await;
    let mut supervisor = self.supervisor(supervisor_id).await?;

    let mut changes = ChangeSet::default();
    let current = supervisor.quotas;
    for (field, old, new) in [
      ("bachelor_quota", current.bachelor, quotas.bachelor),
      ("engineering_quota", current.engineering, quotas.engineering),
      ("master_quota", current.master, quotas.master),
      ("doctor_quota", current.doctor, quotas.doctor),
    ] {
      if old != new {
        changes.record(field, old, new);
      }
    }
    if changes.is_empty() {
      return Ok(supervisor);
    }

    self
      .store
      .set_quotas(supervisor_id, quotas)
      .await
      .map_err(Error::store)?;
    supervisor.quotas = quotas;
    drop(locks);

    tracing::debug!(supervisor = %supervisor_id, ?quotas, "quotas updated");
    self
      .emit(
        AuditRecord::new(
          Actor::Supervisor(supervisor_id),
          AuditAction::QuotasUpdated,
          AuditTarget::Quotas { supervisor_id },
        )
        .with_changes(changes),
      )
      .await;
    Ok(supervisor)
  }

  // ── Thesis registry ───────────────────────────────────────────────────

  /// Create a thesis, consuming one quota slot of its type.
  pub async fn create_thesis(
    &self,
    supervisor_id: SupervisorId,
    input: CreateThesis,
  ) -> Result<Thesis> {
    let locks = self
      .locks
      .acquire([LockKey::Supervisor(supervisor_id)])
      .await;
    let supervisor = self.supervisor(supervisor_id).await?;

    let kind = ThesisType::from_str(&input.kind)
      .map_err(|_| Error::InvalidThesisType(input.kind.clone()))?;

    let required = kind.required_title();
    if supervisor.academic_title < required {
      return Err(Error::TitleRequirement {
        kind,
        required,
        actual: supervisor.academic_title,
      });
    }

    let capacity = validate_capacity(input.capacity)?;
    let name = validate_name(&input.name)?;
    let language = match input.language.as_deref().map(str::trim) {
      None | Some("") => DEFAULT_LANGUAGE.to_owned(),
      Some(language) => validate_language(language)?,
    };

    if supervisor.quotas.get(kind) == 0 {
      return Err(Error::QuotaExhausted { supervisor: supervisor_id, kind });
    }

    let thesis = self
      .store
      .create_thesis(NewThesis {
        supervisor_id,
        kind,
        name,
        description: input.description.filter(|d| !d.trim().is_empty()),
        capacity,
        language,
        tags: input.tags,
      })
      .await
      .map_err(Error::store)?
      .ok_or(Error::QuotaExhausted { supervisor: supervisor_id, kind })?;
    drop(locks);

    tracing::debug!(
      thesis = %thesis.thesis_id,
      supervisor = %supervisor_id,
      %kind,
      "thesis created"
    );
    self
      .emit(AuditRecord::new(
        Actor::Supervisor(supervisor_id),
        AuditAction::ThesisCreated,
        thesis_target(&thesis),
      ))
      .await;
    Ok(thesis)
  }

  /// Apply the non-empty fields of `patch` that differ from the stored
  /// thesis.
  ///
  /// When the capacity changes without an explicit status, an open thesis
  /// that is now full closes and a closed thesis with free slots reopens.
  /// A finished thesis keeps its status. Explicitly opening a thesis with
  /// no free slot fails with [`Error::ThesisFull`].
  pub async fn update_thesis(
    &self,
    supervisor_id: SupervisorId,
    thesis_id: ThesisId,
    patch: ThesisPatch,
  ) -> Result<Thesis> {
    self.supervisor(supervisor_id).await?;
    let locks = self.locks.acquire([LockKey::Thesis(thesis_id)]).await;
    let current = self.owned_thesis(supervisor_id, thesis_id).await?;

    let mut next = current.clone();
    let mut changes = ChangeSet::default();

    if let Some(name) = non_empty(patch.name) {
      let name = validate_name(&name)?;
      if name != next.name {
        changes.record("name", &next.name, &name);
        next.name = name;
      }
    }

    if let Some(description) = non_empty(patch.description)
      && next.description.as_deref() != Some(description.as_str())
    {
      changes.record(
        "description",
        next.description.as_deref().unwrap_or_default(),
        &description,
      );
      next.description = Some(description);
    }

    if let Some(capacity) = patch.capacity {
      let capacity = validate_capacity(capacity)?;
      if capacity != next.capacity {
        changes.record("capacity", next.capacity, capacity);
        next.capacity = capacity;
      }
    }

    let mut explicit_status = false;
    if let Some(raw) = non_empty(patch.status) {
      let status = ThesisStatus::from_str(raw.trim())
        .map_err(|_| Error::InvalidThesisStatus(raw.clone()))?;
      explicit_status = true;
      if status != next.status {
        changes.record("status", next.status, status);
        next.status = status;
      }
    }

    if let Some(language) = non_empty(patch.language) {
      let language = validate_language(language.trim())?;
      if language != next.language {
        changes.record("language", &next.language, &language);
        next.language = language;
      }
    }

    if let Some(tags) = patch.tags.filter(|t| !t.is_empty())
      && tags != next.tags
    {
      changes.record("tags", join_ids(&next.tags), join_ids(&tags));
      next.tags = tags;
    }

    let reopening = explicit_status && next.status == ThesisStatus::Open;
    if next.capacity != current.capacity || reopening {
      let accepted = self.accepted(thesis_id).await?;
      if next.capacity < accepted {
        return Err(Error::CapacityBelowAccepted {
          capacity: next.capacity,
          accepted,
        });
      }
      // An open thesis must have a free slot.
      if reopening && accepted >= next.capacity {
        return Err(Error::ThesisFull {
          name:     next.name.clone(),
          capacity: next.capacity,
        });
      }
      if !explicit_status {
        let derived = match next.status {
          ThesisStatus::Open if accepted >= next.capacity => {
            ThesisStatus::Closed
          }
          ThesisStatus::Closed if accepted < next.capacity => {
            ThesisStatus::Open
          }
          unchanged => unchanged,
        };
        if derived != next.status {
          changes.record("status", next.status, derived);
          next.status = derived;
        }
      }
    }

    if changes.is_empty() {
      return Ok(current);
    }

    next.updated_at = Utc::now();
    self
      .store
      .save_thesis(next.clone())
      .await
      .map_err(Error::store)?;
    drop(locks);

    tracing::debug!(thesis = %thesis_id, "thesis updated");
    self
      .emit(
        AuditRecord::new(
          Actor::Supervisor(supervisor_id),
          AuditAction::ThesisUpdated,
          thesis_target(&next),
        )
        .with_changes(changes),
      )
      .await;
    Ok(next)
  }

  /// Delete a thesis and give its quota slot back. Returns the deleted
  /// thesis.
  ///
  /// Refused while open or accepted submissions reference the thesis;
  /// rejected ones are deleted along with it.
  pub async fn delete_thesis(
    &self,
    supervisor_id: SupervisorId,
    thesis_id: ThesisId,
  ) -> Result<Thesis> {
    let locks = self
      .locks
      .acquire([
        LockKey::Supervisor(supervisor_id),
        LockKey::Thesis(thesis_id),
      ])
      .await;
    self.supervisor(supervisor_id).await?;
    let thesis = self.owned_thesis(supervisor_id, thesis_id).await?;

    let submissions = self
      .store
      .list_submissions(thesis_id)
      .await
      .map_err(Error::store)?;
    if submissions.iter().any(|s| s.status.is_live()) {
      return Err(Error::ThesisHasSubmissions(thesis_id));
    }

    self
      .store
      .delete_thesis(thesis_id)
      .await
      .map_err(Error::store)?;
    drop(locks);

    tracing::debug!(thesis = %thesis_id, kind = %thesis.kind, "thesis deleted");
    self
      .emit(AuditRecord::new(
        Actor::Supervisor(supervisor_id),
        AuditAction::ThesisDeleted,
        thesis_target(&thesis),
      ))
      .await;
    Ok(thesis)
  }

  pub async fn list_theses_by_supervisor(
    &self,
    supervisor_id: SupervisorId,
  ) -> Result<Vec<Thesis>> {
    self.supervisor(supervisor_id).await?;
    self
      .store
      .list_theses_by_supervisor(supervisor_id)
      .await
      .map_err(Error::store)
  }

  /// Theses currently open for applications.
  pub async fn list_available_theses(&self) -> Result<Vec<Thesis>> {
    self.store.list_open_theses().await.map_err(Error::store)
  }

  // ── Submission ledger ─────────────────────────────────────────────────

  /// Apply `student` to a thesis. A previously rejected submission of the
  /// student is replaced.
  pub async fn apply(
    &self,
    student_id: StudentId,
    thesis_id: ThesisId,
  ) -> Result<Submission> {
    let locks = self
      .locks
      .acquire([LockKey::Student(student_id), LockKey::Thesis(thesis_id)])
      .await;
    self.student(student_id).await?;
    let thesis = self.thesis(thesis_id).await?;

    if thesis.status != ThesisStatus::Open {
      return Err(Error::ThesisNotAvailable {
        id:     thesis_id,
        status: thesis.status,
      });
    }

    let existing = self
      .store
      .get_submission_for_student(student_id)
      .await
      .map_err(Error::store)?;
    let supersedes = match existing {
      Some(existing) if existing.status.is_live() => {
        let assigned = self.thesis(existing.thesis_id).await?;
        return Err(Error::StudentAlreadyAssigned {
          thesis_id:   assigned.thesis_id,
          thesis_name: assigned.name,
        });
      }
      Some(rejected) => Some(rejected.submission_id),
      None => None,
    };

    let submission = self
      .store
      .insert_submission(NewSubmission {
        student_id,
        thesis_id,
        supersedes,
      })
      .await
      .map_err(Error::store)?;
    drop(locks);

    tracing::debug!(
      submission = %submission.submission_id,
      student = %student_id,
      thesis = %thesis_id,
      "submission opened"
    );
    self
      .emit(AuditRecord::new(
        Actor::Student(student_id),
        AuditAction::SubmissionCreated,
        submission_target(&submission, &thesis),
      ))
      .await;
    Ok(submission)
  }

  /// Withdraw the student's open submission. Returns the deleted row.
  pub async fn cancel(&self, student_id: StudentId) -> Result<Submission> {
    self.student(student_id).await?;

    // The thesis to lock is only known after reading the submission; retry
    // if the student's submission moved before the locks were taken.
    let (submission, locks) = loop {
      let seen = self.student_submission(student_id).await?;
      let locks = self
        .locks
        .acquire([
          LockKey::Student(student_id),
          LockKey::Thesis(seen.thesis_id),
        ])
        .await;
      let current = self.student_submission(student_id).await?;
      if current.thesis_id == seen.thesis_id {
        break (current, locks);
      }
    };

    if submission.status != SubmissionStatus::Open {
      return Err(Error::SubmissionAlreadyResolved {
        id:     submission.submission_id,
        status: submission.status,
      });
    }
    let thesis = self.thesis(submission.thesis_id).await?;

    self
      .store
      .delete_submission(submission.submission_id, None)
      .await
      .map_err(Error::store)?;
    drop(locks);

    tracing::debug!(
      submission = %submission.submission_id,
      student = %student_id,
      "submission cancelled"
    );
    self
      .emit(AuditRecord::new(
        Actor::Student(student_id),
        AuditAction::SubmissionCancelled,
        submission_target(&submission, &thesis),
      ))
      .await;
    Ok(submission)
  }

  async fn student_submission(&self, id: StudentId) -> Result<Submission> {
    self
      .store
      .get_submission_for_student(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NoSubmission(id))
  }

  /// The student's current submission, if any.
  pub async fn submission_for_student(
    &self,
    student_id: StudentId,
  ) -> Result<Option<Submission>> {
    self.student(student_id).await?;
    self
      .store
      .get_submission_for_student(student_id)
      .await
      .map_err(Error::store)
  }

  /// A thesis owned by `supervisor` with all of its submissions.
  pub async fn thesis_with_submissions(
    &self,
    supervisor_id: SupervisorId,
    thesis_id: ThesisId,
  ) -> Result<ThesisDetail> {
    self.supervisor(supervisor_id).await?;
    let thesis = self.owned_thesis(supervisor_id, thesis_id).await?;
    let submissions = self
      .store
      .list_submissions(thesis_id)
      .await
      .map_err(Error::store)?;
    let accepted_count = submissions
      .iter()
      .filter(|s| s.status == SubmissionStatus::Accepted)
      .count() as u32;
    Ok(ThesisDetail { thesis, submissions, accepted_count })
  }

  /// Lock the thesis a submission belongs to and re-read both under the
  /// lock. A submission never changes thesis, so one read of the id is
  /// enough to pick the lock.
  async fn lock_owned_submission(
    &self,
    supervisor_id: SupervisorId,
    submission_id: SubmissionId,
  ) -> Result<(Submission, Thesis, LockSet)> {
    self.supervisor(supervisor_id).await?;
    let (seen, _) = self.owned_submission(supervisor_id, submission_id).await?;
    let locks = self
      .locks
      .acquire([LockKey::Thesis(seen.thesis_id)])
      .await;
    let (submission, thesis) =
      self.owned_submission(supervisor_id, submission_id).await?;
    Ok((submission, thesis, locks))
  }

  /// Accept an open submission. Taking the last free slot closes the
  /// thesis in the same transaction.
  pub async fn accept(
    &self,
    supervisor_id: SupervisorId,
    submission_id: SubmissionId,
  ) -> Result<Submission> {
    let (mut submission, thesis, locks) = self
      .lock_owned_submission(supervisor_id, submission_id)
      .await?;

    if submission.status != SubmissionStatus::Open {
      return Err(Error::SubmissionAlreadyResolved {
        id:     submission_id,
        status: submission.status,
      });
    }

    let accepted = self.accepted(thesis.thesis_id).await?;
    if accepted >= thesis.capacity {
      return Err(Error::ThesisFull {
        name:     thesis.name,
        capacity: thesis.capacity,
      });
    }

    let close = (thesis.status == ThesisStatus::Open
      && accepted + 1 == thesis.capacity)
      .then(|| StatusChange {
        thesis_id: thesis.thesis_id,
        status:    ThesisStatus::Closed,
        at:        Utc::now(),
      });

    self
      .store
      .set_submission_status(submission_id, SubmissionStatus::Accepted, close)
      .await
      .map_err(Error::store)?;
    submission.status = SubmissionStatus::Accepted;
    drop(locks);

    tracing::debug!(
      submission = %submission_id,
      thesis = %thesis.thesis_id,
      accepted = accepted + 1,
      capacity = thesis.capacity,
      closed = close.is_some(),
      "submission accepted"
    );
    self
      .emit(AuditRecord::new(
        Actor::Supervisor(supervisor_id),
        AuditAction::SubmissionAccepted,
        submission_target(&submission, &thesis),
      ))
      .await;
    Ok(submission)
  }

  /// Reject an open submission. The thesis is not affected.
  pub async fn reject(
    &self,
    supervisor_id: SupervisorId,
    submission_id: SubmissionId,
  ) -> Result<Submission> {
    let (mut submission, thesis, locks) = self
      .lock_owned_submission(supervisor_id, submission_id)
      .await?;

    if submission.status != SubmissionStatus::Open {
      return Err(Error::SubmissionAlreadyResolved {
        id:     submission_id,
        status: submission.status,
      });
    }

    self
      .store
      .set_submission_status(submission_id, SubmissionStatus::Rejected, None)
      .await
      .map_err(Error::store)?;
    submission.status = SubmissionStatus::Rejected;
    drop(locks);

    tracing::debug!(submission = %submission_id, "submission rejected");
    self
      .emit(AuditRecord::new(
        Actor::Supervisor(supervisor_id),
        AuditAction::SubmissionRejected,
        submission_target(&submission, &thesis),
      ))
      .await;
    Ok(submission)
  }

  /// Remove an accepted student from a thesis. Returns the deleted row.
  ///
  /// A thesis closed at capacity reopens once a slot frees up; a finished
  /// thesis stays finished.
  pub async fn remove(
    &self,
    supervisor_id: SupervisorId,
    submission_id: SubmissionId,
  ) -> Result<Submission> {
    let (submission, thesis, locks) = self
      .lock_owned_submission(supervisor_id, submission_id)
      .await?;

    if submission.status != SubmissionStatus::Accepted {
      return Err(Error::SubmissionNotAccepted {
        id:     submission_id,
        status: submission.status,
      });
    }

    let remaining = self.accepted(thesis.thesis_id).await?.saturating_sub(1);
    let reopen = (thesis.status == ThesisStatus::Closed
      && remaining < thesis.capacity)
      .then(|| StatusChange {
        thesis_id: thesis.thesis_id,
        status:    ThesisStatus::Open,
        at:        Utc::now(),
      });

    self
      .store
      .delete_submission(submission_id, reopen)
      .await
      .map_err(Error::store)?;
    drop(locks);

    tracing::debug!(
      submission = %submission_id,
      thesis = %thesis.thesis_id,
      remaining,
      reopened = reopen.is_some(),
      "student removed"
    );
    self
      .emit(AuditRecord::new(
        Actor::Supervisor(supervisor_id),
        AuditAction::StudentRemoved,
        submission_target(&submission, &thesis),
      ))
      .await;
    Ok(submission)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn thesis_target(thesis: &Thesis) -> AuditTarget {
  AuditTarget::Thesis {
    thesis_id: thesis.thesis_id,
    name:      thesis.name.clone(),
  }
}

fn submission_target(submission: &Submission, thesis: &Thesis) -> AuditTarget {
  AuditTarget::Submission {
    submission_id: submission.submission_id,
    student_id:    submission.student_id,
    thesis_id:     thesis.thesis_id,
    thesis_name:   thesis.name.clone(),
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

fn validate_capacity(capacity: i64) -> Result<u32> {
  if capacity < 1 {
    return Err(Error::NonPositiveCapacity(capacity));
  }
  u32::try_from(capacity).map_err(|_| Error::NonPositiveCapacity(capacity))
}

fn validate_name(name: &str) -> Result<String> {
  let name = name.trim();
  match name.chars().count() {
    1..=MAX_NAME_LEN => Ok(name.to_owned()),
    _ => Err(Error::InvalidThesisName),
  }
}

fn validate_language(language: &str) -> Result<String> {
  if language.chars().count() > MAX_NAME_LEN {
    return Err(Error::InvalidLanguage);
  }
  Ok(language.to_owned())
}

fn join_ids<T: std::fmt::Display>(ids: &[T]) -> String {
  ids.iter().map(T::to_string).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn capacity_must_be_positive() {
    assert!(matches!(validate_capacity(0), Err(Error::NonPositiveCapacity(0))));
    assert!(matches!(
      validate_capacity(-3),
      Err(Error::NonPositiveCapacity(-3))
    ));
    assert_eq!(validate_capacity(3).unwrap(), 3);
  }

  #[test]
  fn names_are_trimmed_and_bounded() {
    assert_eq!(validate_name("  Graphs ").unwrap(), "Graphs");
    assert!(matches!(validate_name("   "), Err(Error::InvalidThesisName)));
    assert!(validate_name(&"ą".repeat(MAX_NAME_LEN)).is_ok());
    assert!(matches!(
      validate_name(&"ą".repeat(MAX_NAME_LEN + 1)),
      Err(Error::InvalidThesisName)
    ));
  }

  #[test]
  fn empty_patch_fields_are_ignored() {
    assert_eq!(non_empty(Some("  ".into())), None);
    assert_eq!(non_empty(None), None);
    assert_eq!(non_empty(Some("x".into())).as_deref(), Some("x"));
  }
}
