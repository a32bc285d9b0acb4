//! The `Transport` trait: how services talk to the server.
//!
//! Services depend on this abstraction rather than on an HTTP client, so the
//! same loader, poster and saver run against a real backend or a test double.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifies a thread on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadRef {
  pub model: String,
  pub id:    i64,
}

impl ThreadRef {
  pub fn new(model: impl Into<String>, id: i64) -> Self { Self { model: model.into(), id } }

  /// The identifying payload of the thread in the store.
  pub fn key(&self) -> Value { json!({ "model": self.model, "id": self.id }) }
}

/// A message to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostData {
  pub body:           String,
  #[serde(default)]
  pub attachment_ids: Vec<i64>,
}

/// Server endpoints used by the sync services.
///
/// All methods return `Send` futures so implementations can be shared across
/// tasks of a multi-threaded runtime.
pub trait Transport: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch up to `limit` message payloads of `thread`, newest first, older
  /// than `before` when given.
  fn fetch_messages(
    &self,
    thread: &ThreadRef,
    before: Option<i64>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send;

  /// Post a message and return the server's payload for it.
  fn post_message(
    &self,
    thread: &ThreadRef,
    data: PostData,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send;

  /// Persist user settings.
  fn save_settings(
    &self,
    settings: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
