//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, enums as their snake_case
//! names, and tag lists as compact JSON arrays.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use thesis_core::{
  identity::{
    AcademicTitle,
    Quotas,
    Student,
    StudentId,
    Supervisor,
    SupervisorId,
  },
  submission::{Submission, SubmissionId, SubmissionStatus},
  thesis::{TagId, Thesis, ThesisId, ThesisStatus, ThesisType},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Parse a snake_case enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::UnknownVariant {
    column,
    value: s.to_owned(),
  })
}

/// The `supervisors` column holding the remaining quota for `kind`.
pub fn quota_column(kind: ThesisType) -> &'static str {
  match kind {
    ThesisType::Bachelor => "bachelor_quota",
    ThesisType::Engineering => "engineering_quota",
    ThesisType::Master => "master_quota",
    ThesisType::Doctor => "doctor_quota",
  }
}

// ─── Integers ────────────────────────────────────────────────────────────────

pub fn decode_u32(column: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: &[TagId]) -> Result<String> {
  Ok(serde_json::to_string(tags)?)
}

pub fn decode_tags(s: &str) -> Result<Vec<TagId>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawThesis::from_row`].
pub const THESIS_COLUMNS: &str = "thesis_id, supervisor_id, thesis_type, \
  name, description, capacity, status, language, tags, created_at, \
  updated_at";

/// Raw values read directly from a `theses` row.
pub struct RawThesis {
  pub thesis_id:     i64,
  pub supervisor_id: i64,
  pub thesis_type:   String,
  pub name:          String,
  pub description:   Option<String>,
  pub capacity:      i64,
  pub status:        String,
  pub language:      String,
  pub tags:          String,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawThesis {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      thesis_id:     row.get(0)?,
      supervisor_id: row.get(1)?,
      thesis_type:   row.get(2)?,
      name:          row.get(3)?,
      description:   row.get(4)?,
      capacity:      row.get(5)?,
      status:        row.get(6)?,
      language:      row.get(7)?,
      tags:          row.get(8)?,
      created_at:    row.get(9)?,
      updated_at:    row.get(10)?,
    })
  }

  pub fn into_thesis(self) -> Result<Thesis> {
    Ok(Thesis {
      thesis_id:     ThesisId(self.thesis_id),
      supervisor_id: SupervisorId(self.supervisor_id),
      kind:          decode_enum::<ThesisType>("thesis_type", &self.thesis_type)?,
      name:          self.name,
      description:   self.description,
      capacity:      decode_u32("capacity", self.capacity)?,
      status:        decode_enum::<ThesisStatus>("status", &self.status)?,
      language:      self.language,
      tags:          decode_tags(&self.tags)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Column list matching [`RawSubmission::from_row`].
pub const SUBMISSION_COLUMNS: &str =
  "submission_id, student_id, thesis_id, status, created_at";

/// Raw values read directly from a `submissions` row.
pub struct RawSubmission {
  pub submission_id: i64,
  pub student_id:    i64,
  pub thesis_id:     i64,
  pub status:        String,
  pub created_at:    String,
}

impl RawSubmission {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id: row.get(0)?,
      student_id:    row.get(1)?,
      thesis_id:     row.get(2)?,
      status:        row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_submission(self) -> Result<Submission> {
    Ok(Submission {
      submission_id: SubmissionId(self.submission_id),
      student_id:    StudentId(self.student_id),
      thesis_id:     ThesisId(self.thesis_id),
      status:        decode_enum::<SubmissionStatus>("status", &self.status)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `supervisors` row.
pub struct RawSupervisor {
  pub supervisor_id:     i64,
  pub full_name:         String,
  pub academic_title:    String,
  pub bachelor_quota:    i64,
  pub engineering_quota: i64,
  pub master_quota:      i64,
  pub doctor_quota:      i64,
}

impl RawSupervisor {
  pub fn into_supervisor(self) -> Result<Supervisor> {
    Ok(Supervisor {
      supervisor_id:  SupervisorId(self.supervisor_id),
      full_name:      self.full_name,
      academic_title: decode_enum::<AcademicTitle>(
        "academic_title",
        &self.academic_title,
      )?,
      quotas:         Quotas {
        bachelor:    decode_u32("bachelor_quota", self.bachelor_quota)?,
        engineering: decode_u32("engineering_quota", self.engineering_quota)?,
        master:      decode_u32("master_quota", self.master_quota)?,
        doctor:      decode_u32("doctor_quota", self.doctor_quota)?,
      },
    })
  }
}

/// Raw values read directly from a `students` row.
pub struct RawStudent {
  pub student_id:   i64,
  pub full_name:    String,
  pub index_number: String,
}

impl RawStudent {
  pub fn into_student(self) -> Student {
    Student {
      student_id:   StudentId(self.student_id),
      full_name:    self.full_name,
      index_number: self.index_number,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_enum_value_names_the_column() {
    let err = decode_enum::<ThesisStatus>("status", "archived").unwrap_err();
    assert!(matches!(
      err,
      Error::UnknownVariant { column: "status", ref value } if value == "archived"
    ));
  }

  #[test]
  fn negative_counts_are_rejected() {
    assert!(matches!(
      decode_u32("master_quota", -1),
      Err(Error::OutOfRange { column: "master_quota", value: -1 })
    ));
    assert_eq!(decode_u32("capacity", 4).unwrap(), 4);
  }

  #[test]
  fn tags_are_a_json_array_of_ids() {
    let encoded = encode_tags(&[TagId(3), TagId(9)]).unwrap();
    assert_eq!(encoded, "[3,9]");
    assert_eq!(decode_tags("[]").unwrap(), Vec::<TagId>::new());
  }
}
