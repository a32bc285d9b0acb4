//! Messaging models for the murmur record graph.
//!
//! Each module declares one model and a typed handle over [`RecordId`] whose
//! getters read through the [`Store`]. [`registry`] assembles every model,
//! including the fields this crate patches onto the root `Store` model.

pub mod activity;
pub mod attachment;
pub mod channel_member;
pub mod chat_window;
pub mod message;
pub mod notification;
pub mod persona;
pub mod root;
pub mod thread;

use murmur_core::{ModelRegistry, RecordId, Result, Store};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use self::{
  activity::{Activity, ActivityState},
  attachment::Attachment,
  channel_member::ChannelMember,
  chat_window::ChatWindow,
  message::Message,
  notification::{FailureGroup, Notification, failure_groups},
  persona::{Persona, PersonaType},
  thread::{FoldState, Thread, ThreadKind},
};

/// Build a registry holding every messaging model.
pub fn registry() -> Result<ModelRegistry> {
  let mut registry = ModelRegistry::new();
  persona::register(&mut registry);
  thread::register(&mut registry);
  channel_member::register(&mut registry);
  message::register(&mut registry);
  attachment::register(&mut registry);
  notification::register(&mut registry);
  chat_window::register(&mut registry);
  activity::register(&mut registry);
  root::register(&mut registry)?;
  Ok(registry)
}

/// A fresh store over [`registry`].
pub fn store() -> Result<Store> { Store::new(registry()?) }

// ─── Handles ─────────────────────────────────────────────────────────────────

/// A typed view of a record of one model.
pub trait Handle: Copy + Sized {
  const MODEL: &'static str;

  fn from_record(record: RecordId) -> Self;

  fn record(self) -> RecordId;

  /// Insert (or update by identity) a record of this model.
  fn insert(store: &mut Store, payload: Value) -> Result<Self> {
    store.insert(Self::MODEL, payload).map(Self::from_record)
  }

  fn find(store: &Store, key: Value) -> Result<Option<Self>> {
    Ok(store.find(Self::MODEL, key)?.map(Self::from_record))
  }

  fn all(store: &Store) -> Result<Vec<Self>> {
    Ok(
      store
        .records(Self::MODEL)?
        .into_iter()
        .map(Self::from_record)
        .collect(),
    )
  }

  fn update(self, store: &mut Store, payload: Value) -> Result<()> {
    store.update(self.record(), payload)
  }

  fn delete(self, store: &mut Store) -> Result<()> { store.delete(self.record()) }

  fn exists(self, store: &Store) -> bool { store.exists(self.record()) }
}

// ─── Read helpers shared by computes ─────────────────────────────────────────

pub(crate) fn text(store: &Store, record: RecordId, field: &str) -> Result<Option<String>> {
  store.attr_as(record, field)
}

pub(crate) fn flag(store: &Store, record: RecordId, field: &str) -> Result<bool> {
  Ok(store.attr_as::<bool>(record, field)?.unwrap_or_default())
}

pub(crate) fn int(store: &Store, record: RecordId, field: &str) -> Result<i64> {
  Ok(store.attr_as::<i64>(record, field)?.unwrap_or_default())
}

/// Deserialise an attribute, treating values of the wrong shape as absent.
pub(crate) fn lenient<T: DeserializeOwned>(
  store: &Store,
  record: RecordId,
  field: &str,
) -> Result<Option<T>> {
  Ok(serde_json::from_value(store.attr(record, field)?).ok())
}

pub(crate) fn self_persona(store: &Store) -> Result<Option<RecordId>> {
  store.one(store.root(), "self_persona")
}
