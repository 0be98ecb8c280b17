//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use thesis_core::{
  LifecycleEngine,
  identity::{AcademicTitle, NewStudent, NewSupervisor, Quotas},
  store::ThesisStore,
};
use thesis_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::{ACTOR_HEADER, api_router};

struct Fixture {
  router:     Router,
  supervisor: i64,
  student:    i64,
}

async fn fixture() -> Fixture {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let supervisor = store
    .insert_supervisor(NewSupervisor {
      full_name:      "Ada Nowak".into(),
      academic_title: AcademicTitle::Doctor,
      quotas:         Quotas { master: 1, bachelor: 2, ..Default::default() },
    })
    .await
    .unwrap()
    .supervisor_id
    .0;
  let student = store
    .insert_student(NewStudent {
      full_name:    "Jan Kowalski".into(),
      index_number: "200100".into(),
    })
    .await
    .unwrap()
    .student_id
    .0;

  let engine = Arc::new(LifecycleEngine::new(Arc::clone(&store), store));
  Fixture { router: api_router(engine), supervisor, student }
}

async fn send(
  router: &Router,
  method: Method,
  uri: &str,
  actor: Option<i64>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut request = Request::builder().method(method).uri(uri);
  if let Some(actor) = actor {
    request = request.header(ACTOR_HEADER, actor.to_string());
  }
  let request = match body {
    Some(body) => request
      .header("content-type", "application/json")
      .body(Body::from(body.to_string())),
    None => request.body(Body::empty()),
  }
  .unwrap();

  let response = router.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn create_thesis(f: &Fixture, kind: &str, capacity: i64) -> (StatusCode, Value) {
  send(
    &f.router,
    Method::POST,
    "/theses",
    Some(f.supervisor),
    Some(json!({ "kind": kind, "name": "Graph colouring", "capacity": capacity })),
  )
  .await
}

#[tokio::test]
async fn full_submission_flow() {
  let f = fixture().await;

  let (status, thesis) = create_thesis(&f, "master", 1).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(thesis["status"], "open");
  assert_eq!(thesis["language"], "English");
  let thesis_id = thesis["thesis_id"].as_i64().unwrap();

  let (status, available) =
    send(&f.router, Method::GET, "/theses", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(available.as_array().unwrap().len(), 1);

  let (status, submission) = send(
    &f.router,
    Method::POST,
    "/submissions",
    Some(f.student),
    Some(json!({ "thesis_id": thesis_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let submission_id = submission["submission_id"].as_i64().unwrap();

  let (status, accepted) = send(
    &f.router,
    Method::POST,
    &format!("/submissions/{submission_id}/accept"),
    Some(f.supervisor),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(accepted["status"], "accepted");

  let (status, detail) = send(
    &f.router,
    Method::GET,
    &format!("/theses/{thesis_id}/submissions"),
    Some(f.supervisor),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(detail["accepted_count"], 1);
  assert_eq!(detail["thesis"]["status"], "closed");

  let (_, available) = send(&f.router, Method::GET, "/theses", None, None).await;
  assert!(available.as_array().unwrap().is_empty());

  let (status, mine) = send(
    &f.router,
    Method::GET,
    "/submissions/mine",
    Some(f.student),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(mine["submission_id"], submission_id);
}

#[tokio::test]
async fn missing_actor_header_is_a_bad_request() {
  let f = fixture().await;
  let (status, body) = send(
    &f.router,
    Method::POST,
    "/theses",
    None,
    Some(json!({ "kind": "master", "name": "x" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains(ACTOR_HEADER));
}

#[tokio::test]
async fn non_numeric_actor_header_is_a_bad_request() {
  let f = fixture().await;
  let request = Request::builder()
    .uri("/theses/mine")
    .header(ACTOR_HEADER, "alice")
    .body(Body::empty())
    .unwrap();
  let response = f.router.clone().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn error_kinds_map_to_statuses() {
  let f = fixture().await;

  // Exhaustion.
  create_thesis(&f, "master", 1).await;
  let (status, body) = create_thesis(&f, "master", 1).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("quota"));

  // Validation.
  let (status, _) = create_thesis(&f, "doctor", 1).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = create_thesis(&f, "bachelor", 0).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  // Not found.
  let (status, body) = send(
    &f.router,
    Method::POST,
    "/submissions/9999/accept",
    Some(f.supervisor),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());

  let (status, _) = send(
    &f.router,
    Method::DELETE,
    "/submissions/mine",
    Some(f.student),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_and_delete_thesis() {
  let f = fixture().await;
  let (_, thesis) = create_thesis(&f, "bachelor", 1).await;
  let thesis_id = thesis["thesis_id"].as_i64().unwrap();

  let (status, updated) = send(
    &f.router,
    Method::PATCH,
    &format!("/theses/{thesis_id}"),
    Some(f.supervisor),
    Some(json!({ "capacity": 3, "language": "Polish" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["capacity"], 3);
  assert_eq!(updated["language"], "Polish");

  let (status, mine) = send(
    &f.router,
    Method::GET,
    "/theses/mine",
    Some(f.supervisor),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(mine.as_array().unwrap().len(), 1);

  let (status, deleted) = send(
    &f.router,
    Method::DELETE,
    &format!("/theses/{thesis_id}"),
    Some(f.supervisor),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(deleted["thesis_id"], thesis_id);

  let (status, _) = send(
    &f.router,
    Method::DELETE,
    &format!("/theses/{thesis_id}"),
    Some(f.supervisor),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn set_quotas_returns_supervisor() {
  let f = fixture().await;
  let (status, body) = send(
    &f.router,
    Method::PUT,
    "/quotas",
    Some(f.supervisor),
    Some(json!({ "bachelor": 1, "engineering": 2, "master": 3, "doctor": 0 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["quotas"]["master"], 3);
  assert_eq!(body["academic_title"], "doctor");
}
