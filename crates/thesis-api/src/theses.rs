//! Handlers for `/theses` and `/quotas` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/theses` | Open theses, no actor needed |
//! | `POST`   | `/theses` | Body: [`CreateThesis`]; returns 201 |
//! | `GET`    | `/theses/mine` | Theses owned by the calling supervisor |
//! | `PATCH`  | `/theses/:id` | Body: [`ThesisPatch`] |
//! | `DELETE` | `/theses/:id` | Returns the deleted thesis |
//! | `GET`    | `/theses/:id/submissions` | Thesis with its submissions |
//! | `PUT`    | `/quotas` | Body: [`Quotas`] |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use thesis_core::{
  LifecycleEngine,
  audit::AuditSink,
  identity::{Quotas, Supervisor},
  store::ThesisStore,
  submission::ThesisDetail,
  thesis::{CreateThesis, Thesis, ThesisId, ThesisPatch},
};

use crate::{actor::ActorId, error::ApiError};

/// `GET /theses`
pub async fn list_available<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
) -> Result<Json<Vec<Thesis>>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.list_available_theses().await?))
}

/// `POST /theses`
pub async fn create<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Json(body): Json<CreateThesis>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  let thesis = engine.create_thesis(actor.supervisor(), body).await?;
  Ok((StatusCode::CREATED, Json(thesis)))
}

/// `GET /theses/mine`
pub async fn list_mine<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
) -> Result<Json<Vec<Thesis>>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.list_theses_by_supervisor(actor.supervisor()).await?))
}

/// `PATCH /theses/:id`
pub async fn update<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Path(id): Path<ThesisId>,
  Json(patch): Json<ThesisPatch>,
) -> Result<Json<Thesis>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.update_thesis(actor.supervisor(), id, patch).await?))
}

/// `DELETE /theses/:id`
pub async fn delete<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Path(id): Path<ThesisId>,
) -> Result<Json<Thesis>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.delete_thesis(actor.supervisor(), id).await?))
}

/// `GET /theses/:id/submissions`
pub async fn detail<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Path(id): Path<ThesisId>,
) -> Result<Json<ThesisDetail>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.thesis_with_submissions(actor.supervisor(), id).await?))
}

/// `PUT /quotas`
pub async fn set_quotas<S, A>(
  State(engine): State<Arc<LifecycleEngine<S, A>>>,
  actor: ActorId,
  Json(quotas): Json<Quotas>,
) -> Result<Json<Supervisor>, ApiError>
where
  S: ThesisStore,
  A: AuditSink,
{
  Ok(Json(engine.set_quotas(actor.supervisor(), quotas).await?))
}
