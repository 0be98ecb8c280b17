//! JSON REST API for the thesis workflow.
//!
//! Exposes an axum [`Router`] backed by a [`LifecycleEngine`]. The caller is
//! identified by the `x-actor-id` header; authenticating that header, TLS,
//! and transport concerns are the deployment's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", thesis_api::api_router(engine.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod submissions;
pub mod theses;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use thesis_core::{LifecycleEngine, audit::AuditSink, store::ThesisStore};

pub use actor::{ACTOR_HEADER, ActorId};
pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, A>(engine: Arc<LifecycleEngine<S, A>>) -> Router<()>
where
  S: ThesisStore + 'static,
  A: AuditSink + 'static,
{
  Router::new()
    // Theses
    .route(
      "/theses",
      get(theses::list_available::<S, A>).post(theses::create::<S, A>),
    )
    .route("/theses/mine", get(theses::list_mine::<S, A>))
    .route(
      "/theses/{id}",
      patch(theses::update::<S, A>).delete(theses::delete::<S, A>),
    )
    .route("/theses/{id}/submissions", get(theses::detail::<S, A>))
    .route("/quotas", put(theses::set_quotas::<S, A>))
    // Submissions
    .route("/submissions", post(submissions::apply::<S, A>))
    .route(
      "/submissions/mine",
      get(submissions::get_mine::<S, A>).delete(submissions::cancel_mine::<S, A>),
    )
    .route("/submissions/{id}/accept", post(submissions::accept::<S, A>))
    .route("/submissions/{id}/reject", post(submissions::reject::<S, A>))
    .route("/submissions/{id}/remove", post(submissions::remove::<S, A>))
    .with_state(engine)
}

#[cfg(test)]
mod tests;
