//! Handlers for `/submissions` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/submissions` | Body: `{"thesis_id":1}`; returns 201 |
//! | `GET`    | `/submissions/mine` | `null` when the student has none |
//! | `DELETE` | `/submissions/mine` | Cancel; returns the deleted row |
//! | `POST`   | `/submissions/:id/accept` | Supervisor |
//! | `POST`   | `/submissions/:id/reject` | Supervisor |
//! | `POST`   | `/submissions/:id/remove` | Supervisor; returns the deleted row |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use thesis_core::{
  LifecycleEngine,
  audit::AuditSink,
  store::ThesisStore,
  submission::{Submission, SubmissionId},
  thesis::ThesisId,
};

use crate::{actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ApplyBody {
  pub thesis_id: ThesisId,
}

/// `POST /submissions`
pub async fn apply<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Json(body): Json<ApplyBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  let submission = engine.apply(actor.student(), body.thesis_id).await?;
  Ok((StatusCode::CREATED, Json(submission)))
}

/// `GET /submissions/mine`
pub async fn get_mine<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
) -> Result<Json<Option<Submission>>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.submission_for_student(actor.student()).await?))
}

/// `DELETE /submissions/mine`
pub async fn cancel_mine<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
) -> Result<Json<Submission>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.cancel(actor.student()).await?))
}

/// `POST /submissions/:id/accept`
pub async fn accept<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Path(id): Path<SubmissionId>,
) -> Result<Json<Submission>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.accept(actor.supervisor(), id).await?))
}

/// `POST /submissions/:id/reject`
pub async fn reject<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Path(id): Path<SubmissionId>,
) -> Result<Json<Submission>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.reject(actor.supervisor(), id).await?))
}

/// `POST /submissions/:id/remove`
pub async fn remove<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Path(id): Path<SubmissionId>,
) -> Result<Json<Submission>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.remove(actor.supervisor(), id).await?))
}
