//! Core types, trait definitions and the lifecycle engine for the thesis
//! application workflow.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::ThesisStore`] and
//! [`audit::AuditSink`]; callers drive every state change through
//! [`engine::LifecycleEngine`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

/// Declare an integer row-id newtype that serialises as a bare number.
macro_rules! row_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug,
      Clone,
      Copy,
      PartialEq,
      Eq,
      PartialOrd,
      Ord,
      Hash,
      serde::Serialize,
      serde::Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
      }
    }
  };
}

pub mod audit;
pub mod engine;
pub mod error;
pub mod identity;
pub mod locks;
pub mod store;
pub mod submission;
pub mod thesis;

pub use engine::LifecycleEngine;
pub use error::{Error, ErrorKind, Result};
