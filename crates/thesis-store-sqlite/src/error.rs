//! Error type for `thesis-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside the domain of its enum.
  #[error("unknown {column} value: {value:?}")]
  UnknownVariant { column: &'static str, value: String },

  /// A count or quota column held a negative or oversized number.
  #[error("{column} out of range: {value}")]
  OutOfRange { column: &'static str, value: i64 },

  /// An update or delete matched no row.
  #[error("{table} row {id} not found")]
  RowNotFound { table: &'static str, id: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
