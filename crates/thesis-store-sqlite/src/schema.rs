//! SQL schema for the thesis SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS students (
    student_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name     TEXT NOT NULL,
    index_number  TEXT NOT NULL UNIQUE
);

-- The four *_quota columns are the remaining number of theses of each type
-- the supervisor may still create.
CREATE TABLE IF NOT EXISTS supervisors (
    supervisor_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name         TEXT NOT NULL,
    academic_title    TEXT NOT NULL DEFAULT 'none',
    bachelor_quota    INTEGER NOT NULL DEFAULT 0 CHECK (bachelor_quota >= 0),
    engineering_quota INTEGER NOT NULL DEFAULT 0 CHECK (engineering_quota >= 0),
    master_quota      INTEGER NOT NULL DEFAULT 0 CHECK (master_quota >= 0),
    doctor_quota      INTEGER NOT NULL DEFAULT 0 CHECK (doctor_quota >= 0)
);

CREATE TABLE IF NOT EXISTS theses (
    thesis_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    supervisor_id INTEGER NOT NULL REFERENCES supervisors(supervisor_id),
    thesis_type   TEXT NOT NULL,   -- 'engineering' | 'bachelor' | 'master' | 'doctor'
    name          TEXT NOT NULL,
    description   TEXT,
    capacity      INTEGER NOT NULL CHECK (capacity >= 1),
    status        TEXT NOT NULL,   -- 'open' | 'closed' | 'finished'
    language      TEXT NOT NULL,
    tags          TEXT NOT NULL DEFAULT '[]',
    created_at    TEXT NOT NULL,   -- ISO 8601 UTC
    updated_at    TEXT NOT NULL
);

-- One row per student at most, whatever its status.
CREATE TABLE IF NOT EXISTS submissions (
    submission_id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id    INTEGER NOT NULL UNIQUE REFERENCES students(student_id),
    thesis_id     INTEGER NOT NULL REFERENCES theses(thesis_id),
    status        TEXT NOT NULL,   -- 'open' | 'accepted' | 'rejected'
    created_at    TEXT NOT NULL
);

-- Append-only.
CREATE TABLE IF NOT EXISTS audit_log (
    audit_id    TEXT PRIMARY KEY,
    actor_role  TEXT NOT NULL,     -- 'student' | 'supervisor'
    actor_id    INTEGER NOT NULL,
    action      TEXT NOT NULL,
    description TEXT NOT NULL,     -- rendered, length-capped
    record_json TEXT NOT NULL,     -- full structured record
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS theses_supervisor_idx  ON theses(supervisor_id);
CREATE INDEX IF NOT EXISTS theses_status_idx      ON theses(status);
CREATE INDEX IF NOT EXISTS submissions_thesis_idx ON submissions(thesis_id, status);
CREATE INDEX IF NOT EXISTS audit_actor_idx        ON audit_log(actor_role, actor_id);

PRAGMA user_version = 1;
";
