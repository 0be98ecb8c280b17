//! [`SqliteStore`], the SQLite implementation of [`ThesisStore`] and
//! [`AuditSink`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};

use thesis_core::{
  audit::{AuditRecord, AuditSink},
  identity::{
    Actor,
    NewStudent,
    NewSupervisor,
    Quotas,
    Student,
    StudentId,
    Supervisor,
    SupervisorId,
  },
  store::ThesisStore,
  submission::{NewSubmission, Submission, SubmissionId, SubmissionStatus},
  thesis::{NewThesis, StatusChange, Thesis, ThesisId, ThesisStatus},
};

use crate::{
  Error,
  Result,
  encode::{
    RawStudent,
    RawSubmission,
    RawSupervisor,
    RawThesis,
    SUBMISSION_COLUMNS,
    THESIS_COLUMNS,
    decode_u32,
    encode_dt,
    encode_tags,
    quota_column,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A thesis store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// One row of the audit log, as written by [`AuditSink::record`].
#[derive(Debug, Clone)]
pub struct AuditEntry {
  pub record:      AuditRecord,
  /// The rendered, length-capped description.
  pub description: String,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Audit entries in the order they were written, optionally restricted to
  /// one actor.
  pub async fn audit_log(&self, actor: Option<Actor>) -> Result<Vec<AuditEntry>> {
    let filter = actor.map(|a| (a.role(), a.id()));

    let rows: Vec<(String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT record_json, description FROM audit_log
           WHERE (?1 IS NULL OR (actor_role = ?1 AND actor_id = ?2))
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![filter.map(|f| f.0), filter.map(|f| f.1)],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(json, description)| -> Result<AuditEntry> {
        Ok(AuditEntry { record: serde_json::from_str(&json)?, description })
      })
      .collect()
  }

  async fn query_theses(
    &self,
    filter: &'static str,
    param: Value,
  ) -> Result<Vec<Thesis>> {
    let raws: Vec<RawThesis> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {THESIS_COLUMNS} FROM theses WHERE {filter} ORDER BY thesis_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![param], RawThesis::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawThesis::into_thesis).collect()
  }
}

/// Apply a thesis status flip inside an open transaction.
fn apply_status_change(
  tx: &rusqlite::Transaction<'_>,
  change: Option<(i64, String, String)>,
) -> rusqlite::Result<()> {
  if let Some((thesis_id, status, at)) = change {
    tx.execute(
      "UPDATE theses SET status = ?2, updated_at = ?3 WHERE thesis_id = ?1",
      rusqlite::params![thesis_id, status, at],
    )?;
  }
  Ok(())
}

fn encode_status_change(
  change: Option<StatusChange>,
) -> Option<(i64, String, String)> {
  change.map(|c| (c.thesis_id.0, c.status.to_string(), encode_dt(c.at)))
}

// ─── ThesisStore impl ────────────────────────────────────────────────────────

impl ThesisStore for SqliteStore {
  type Error = Error;

  // ── Identities ────────────────────────────────────────────────────────────

  async fn insert_student(&self, input: NewStudent) -> Result<Student> {
    let full_name    = input.full_name.clone();
    let index_number = input.index_number.clone();

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO students (full_name, index_number) VALUES (?1, ?2)",
          rusqlite::params![full_name, index_number],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Student {
      student_id:   StudentId(id),
      full_name:    input.full_name,
      index_number: input.index_number,
    })
  }

  async fn insert_supervisor(&self, input: NewSupervisor) -> Result<Supervisor> {
    let full_name = input.full_name.clone();
    let title     = input.academic_title.as_ref().to_owned();
    let q         = input.quotas;

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO supervisors (
             full_name, academic_title,
             bachelor_quota, engineering_quota, master_quota, doctor_quota
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            full_name,
            title,
            q.bachelor,
            q.engineering,
            q.master,
            q.doctor,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Supervisor {
      supervisor_id:  SupervisorId(id),
      full_name:      input.full_name,
      academic_title: input.academic_title,
      quotas:         input.quotas,
    })
  }

  async fn get_student(&self, id: StudentId) -> Result<Option<Student>> {
    let raw: Option<RawStudent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT student_id, full_name, index_number
             FROM students WHERE student_id = ?1",
            rusqlite::params![id.0],
            |row| {
              Ok(RawStudent {
                student_id:   row.get(0)?,
                full_name:    row.get(1)?,
                index_number: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(RawStudent::into_student))
  }

  async fn get_supervisor(&self, id: SupervisorId) -> Result<Option<Supervisor>> {
    let raw: Option<RawSupervisor> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT supervisor_id, full_name, academic_title,
                    bachelor_quota, engineering_quota, master_quota, doctor_quota
             FROM supervisors WHERE supervisor_id = ?1",
            rusqlite::params![id.0],
            |row| {
              Ok(RawSupervisor {
                supervisor_id:     row.get(0)?,
                full_name:         row.get(1)?,
                academic_title:    row.get(2)?,
                bachelor_quota:    row.get(3)?,
                engineering_quota: row.get(4)?,
                master_quota:      row.get(5)?,
                doctor_quota:      row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSupervisor::into_supervisor).transpose()
  }

  async fn set_quotas(&self, id: SupervisorId, quotas: Quotas) -> Result<()> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE supervisors
           SET bachelor_quota = ?2, engineering_quota = ?3,
               master_quota = ?4, doctor_quota = ?5
           WHERE supervisor_id = ?1",
          rusqlite::params![
            id.0,
            quotas.bachelor,
            quotas.engineering,
            quotas.master,
            quotas.doctor,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::RowNotFound { table: "supervisors", id: id.0 });
    }
    Ok(())
  }

  // ── Theses ────────────────────────────────────────────────────────────────

  async fn create_thesis(&self, input: NewThesis) -> Result<Option<Thesis>> {
    let now         = Utc::now();
    let column      = quota_column(input.kind);
    let supervisor  = input.supervisor_id.0;
    let kind_str    = input.kind.as_ref().to_owned();
    let name        = input.name.clone();
    let description = input.description.clone();
    let capacity    = input.capacity;
    let status_str  = ThesisStatus::Open.as_ref().to_owned();
    let language    = input.language.clone();
    let tags_str    = encode_tags(&input.tags)?;
    let at_str      = encode_dt(now);

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let reserved = tx.execute(
          &format!(
            "UPDATE supervisors SET {column} = {column} - 1
             WHERE supervisor_id = ?1 AND {column} > 0"
          ),
          rusqlite::params![supervisor],
        )?;
        if reserved == 0 {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO theses (
             supervisor_id, thesis_type, name, description, capacity,
             status, language, tags, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            supervisor,
            kind_str,
            name,
            description,
            capacity,
            status_str,
            language,
            tags_str,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    Ok(id.map(|id| Thesis {
      thesis_id:     ThesisId(id),
      supervisor_id: input.supervisor_id,
      kind:          input.kind,
      name:          input.name,
      description:   input.description,
      capacity:      input.capacity,
      status:        ThesisStatus::Open,
      language:      input.language,
      tags:          input.tags,
      created_at:    now,
      updated_at:    now,
    }))
  }

  async fn get_thesis(&self, id: ThesisId) -> Result<Option<Thesis>> {
    let raw: Option<RawThesis> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {THESIS_COLUMNS} FROM theses WHERE thesis_id = ?1"),
            rusqlite::params![id.0],
            RawThesis::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawThesis::into_thesis).transpose()
  }

  async fn list_theses_by_supervisor(
    &self,
    id: SupervisorId,
  ) -> Result<Vec<Thesis>> {
    self
      .query_theses("supervisor_id = ?1", Value::Integer(id.0))
      .await
  }

  async fn list_open_theses(&self) -> Result<Vec<Thesis>> {
    self
      .query_theses("status = ?1", Value::Text(ThesisStatus::Open.to_string()))
      .await
  }

  async fn save_thesis(&self, thesis: Thesis) -> Result<()> {
    let id          = thesis.thesis_id.0;
    let tags_str    = encode_tags(&thesis.tags)?;
    let status_str  = thesis.status.as_ref().to_owned();
    let updated_str = encode_dt(thesis.updated_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE theses
           SET name = ?2, description = ?3, capacity = ?4, status = ?5,
               language = ?6, tags = ?7, updated_at = ?8
           WHERE thesis_id = ?1",
          rusqlite::params![
            id,
            thesis.name,
            thesis.description,
            thesis.capacity,
            status_str,
            thesis.language,
            tags_str,
            updated_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::RowNotFound { table: "theses", id });
    }
    Ok(())
  }

  async fn delete_thesis(&self, id: ThesisId) -> Result<()> {
    let rejected = SubmissionStatus::Rejected.as_ref().to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Release first, while the thesis row still names its owner and type.
        let released = tx.execute(
          "UPDATE supervisors SET
             bachelor_quota    = bachelor_quota    + (t.thesis_type = 'bachelor'),
             engineering_quota = engineering_quota + (t.thesis_type = 'engineering'),
             master_quota      = master_quota      + (t.thesis_type = 'master'),
             doctor_quota      = doctor_quota      + (t.thesis_type = 'doctor')
           FROM (SELECT supervisor_id, thesis_type FROM theses WHERE thesis_id = ?1) AS t
           WHERE supervisors.supervisor_id = t.supervisor_id",
          rusqlite::params![id.0],
        )?;
        if released == 0 {
          return Ok(false);
        }

        tx.execute(
          "DELETE FROM submissions WHERE thesis_id = ?1 AND status = ?2",
          rusqlite::params![id.0, rejected],
        )?;
        tx.execute(
          "DELETE FROM theses WHERE thesis_id = ?1",
          rusqlite::params![id.0],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !deleted {
      return Err(Error::RowNotFound { table: "theses", id: id.0 });
    }
    Ok(())
  }

  // ── Submissions ───────────────────────────────────────────────────────────

  async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>> {
    let raw: Option<RawSubmission> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE submission_id = ?1"
            ),
            rusqlite::params![id.0],
            RawSubmission::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubmission::into_submission).transpose()
  }

  async fn get_submission_for_student(
    &self,
    id: StudentId,
  ) -> Result<Option<Submission>> {
    let raw: Option<RawSubmission> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE student_id = ?1"
            ),
            rusqlite::params![id.0],
            RawSubmission::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubmission::into_submission).transpose()
  }

  async fn list_submissions(&self, thesis: ThesisId) -> Result<Vec<Submission>> {
    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBMISSION_COLUMNS} FROM submissions
           WHERE thesis_id = ?1 ORDER BY submission_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![thesis.0], RawSubmission::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn count_accepted(&self, thesis: ThesisId) -> Result<u32> {
    let accepted = SubmissionStatus::Accepted.as_ref().to_owned();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM submissions WHERE thesis_id = ?1 AND status = ?2",
          rusqlite::params![thesis.0, accepted],
          |row| row.get(0),
        )?)
      })
      .await?;

    decode_u32("accepted_count", count)
  }

  async fn insert_submission(&self, input: NewSubmission) -> Result<Submission> {
    let now        = Utc::now();
    let student    = input.student_id.0;
    let thesis     = input.thesis_id.0;
    let supersedes = input.supersedes.map(|s| s.0);
    let status_str = SubmissionStatus::Open.as_ref().to_owned();
    let at_str     = encode_dt(now);

    let id: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(old) = supersedes {
          tx.execute(
            "DELETE FROM submissions WHERE submission_id = ?1",
            rusqlite::params![old],
          )?;
        }
        tx.execute(
          "INSERT INTO submissions (student_id, thesis_id, status, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![student, thesis, status_str, at_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
      })
      .await?;

    Ok(Submission {
      submission_id: SubmissionId(id),
      student_id:    input.student_id,
      thesis_id:     input.thesis_id,
      status:        SubmissionStatus::Open,
      created_at:    now,
    })
  }

  async fn set_submission_status(
    &self,
    id: SubmissionId,
    status: SubmissionStatus,
    thesis: Option<StatusChange>,
  ) -> Result<()> {
    let status_str = status.as_ref().to_owned();
    let change     = encode_status_change(thesis);

    let changed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE submissions SET status = ?2 WHERE submission_id = ?1",
          rusqlite::params![id.0, status_str],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        apply_status_change(&tx, change)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !changed {
      return Err(Error::RowNotFound { table: "submissions", id: id.0 });
    }
    Ok(())
  }

  async fn delete_submission(
    &self,
    id: SubmissionId,
    thesis: Option<StatusChange>,
  ) -> Result<()> {
    let change = encode_status_change(thesis);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let deleted = tx.execute(
          "DELETE FROM submissions WHERE submission_id = ?1",
          rusqlite::params![id.0],
        )?;
        if deleted == 0 {
          return Ok(false);
        }
        apply_status_change(&tx, change)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !deleted {
      return Err(Error::RowNotFound { table: "submissions", id: id.0 });
    }
    Ok(())
  }
}

// ─── AuditSink impl ──────────────────────────────────────────────────────────

impl AuditSink for SqliteStore {
  type Error = Error;

  async fn record(&self, entry: AuditRecord) -> Result<()> {
    let id_str      = entry.audit_id.to_string();
    let role        = entry.actor.role();
    let actor_id    = entry.actor.id();
    let action      = entry.action.as_ref().to_owned();
    let description = entry.description();
    let record_json = serde_json::to_string(&entry)?;
    let at_str      = encode_dt(entry.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log (
             audit_id, actor_role, actor_id, action,
             description, record_json, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            role,
            actor_id,
            action,
            description,
            record_json,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
