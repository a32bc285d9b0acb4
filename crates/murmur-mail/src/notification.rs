//! Delivery notifications of messages, and grouping of delivery failures.

use indexmap::IndexMap;
use murmur_core::{Computed, Field, ModelDef, ModelRegistry, RecordId, Result, Store};
use serde_json::json;

use crate::{Handle, message::Message, persona::Persona, text};

/// Statuses that mean delivery failed.
const FAILURE_STATUSES: [&str; 2] = ["bounce", "exception"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Notification(RecordId);

impl Handle for Notification {
  const MODEL: &'static str = "Notification";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }
}

impl Notification {
  pub fn get(store: &Store, id: i64) -> Result<Option<Self>> { Self::find(store, json!(id)) }

  pub fn notification_type(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "notification_type")
  }

  pub fn status(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "notification_status")
  }

  pub fn failure_type(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "failure_type")
  }

  pub fn is_failure(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_failure") }

  pub fn message(self, store: &Store) -> Result<Option<Message>> {
    Ok(store.one(self.0, "message")?.map(Message::from_record))
  }

  pub fn persona(self, store: &Store) -> Result<Option<Persona>> {
    Ok(store.one(self.0, "persona")?.map(Persona::from_record))
  }
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(Notification::MODEL)
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::attr("notification_type"))
      .field(Field::attr("notification_status"))
      .field(Field::attr("failure_type"))
      .field(Field::one("message", Message::MODEL).inverse("notifications"))
      .field(Field::one("persona", Persona::MODEL))
      .field(Field::attr("is_failure").compute(is_failure)),
  );
}

fn is_failure(store: &Store, notification: RecordId) -> Result<Computed> {
  let status = text(store, notification, "notification_status")?;
  Ok(Computed::attr(status.is_some_and(|s| FAILURE_STATUSES.contains(&s.as_str()))))
}

// ─── Failure groups ──────────────────────────────────────────────────────────

/// Failed notifications sharing a thread model and a notification type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureGroup {
  /// Server model of the threads involved; empty for messages without one.
  pub thread_model:      String,
  pub notification_type: String,
  pub notifications:     Vec<Notification>,
}

impl FailureGroup {
  /// Distinct messages with a failure in this group.
  pub fn messages(&self, store: &Store) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    for notification in &self.notifications {
      if let Some(message) = notification.message(store)?
        && !messages.contains(&message)
      {
        messages.push(message);
      }
    }
    Ok(messages)
  }
}

/// Every failed notification, grouped in order of first appearance.
pub fn failure_groups(store: &Store) -> Result<Vec<FailureGroup>> {
  let mut groups: IndexMap<(String, String), Vec<Notification>> = IndexMap::new();
  for notification in Notification::all(store)? {
    if !notification.is_failure(store)? {
      continue;
    }
    let thread = match notification.message(store)? {
      Some(message) => store.one(message.record(), "thread")?,
      None => None,
    };
    let thread_model = match thread {
      Some(thread) => text(store, thread, "model")?.unwrap_or_default(),
      None => String::new(),
    };
    let notification_type = notification.notification_type(store)?.unwrap_or_default();
    groups
      .entry((thread_model, notification_type))
      .or_default()
      .push(notification);
  }

  Ok(
    groups
      .into_iter()
      .map(|((thread_model, notification_type), notifications)| FailureGroup {
        thread_model,
        notification_type,
        notifications,
      })
      .collect(),
  )
}
