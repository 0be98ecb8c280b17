//! The `x-actor-id` request header.

use axum::{extract::FromRequestParts, http::request::Parts};
use thesis_core::identity::{StudentId, SupervisorId};

use crate::error::ApiError;

/// Header carrying the id of the calling student or supervisor. Which of
/// the two it names is decided by the route.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The numeric id from [`ACTOR_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct ActorId(pub i64);

impl ActorId {
  pub fn student(self) -> StudentId { StudentId(self.0) }

  pub fn supervisor(self) -> SupervisorId { SupervisorId(self.0) }
}

impl<S: Send + Sync> FromRequestParts<S> for ActorId {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let value = parts.headers.get(ACTOR_HEADER).ok_or_else(|| {
      ApiError::BadRequest(format!("missing {ACTOR_HEADER} header"))
    })?;
    value
      .to_str()
      .ok()
      .and_then(|v| v.trim().parse::<i64>().ok())
      .map(ActorId)
      .ok_or_else(|| {
        ApiError::BadRequest(format!("{ACTOR_HEADER} must be an integer id"))
      })
  }
}
