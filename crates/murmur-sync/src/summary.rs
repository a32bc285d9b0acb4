//! Per-thread summaries of a store, as printed by `murmur-replay`.

use std::fmt;

use murmur_core::Store;
use murmur_mail::{Handle, Thread, ThreadKind};
use serde::Serialize;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadSummary {
  pub model:          Option<String>,
  pub id:             i64,
  pub display_name:   String,
  pub kind:           ThreadKind,
  pub members:        usize,
  pub messages:       usize,
  pub unread:         i64,
  pub newest_message: Option<i64>,
}

impl ThreadSummary {
  pub fn of(store: &Store, thread: Thread) -> Result<Self> {
    let newest_message = match thread.newest_message(store)? {
      Some(message) => Some(message.id(store)?),
      None => None,
    };
    Ok(Self {
      model: thread.model(store)?,
      id: thread.id(store)?,
      display_name: thread.display_name(store)?,
      kind: thread.kind(store)?,
      members: thread.members(store)?.len(),
      messages: thread.messages(store)?.len(),
      unread: thread.unread_counter(store)?,
      newest_message,
    })
  }
}

impl fmt::Display for ThreadSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}/{} {:?} [{}] members={} messages={} unread={}",
      self.model.as_deref().unwrap_or("?"),
      self.id,
      self.display_name,
      self.kind,
      self.members,
      self.messages,
      self.unread,
    )
  }
}

/// Summaries of every thread, in creation order.
pub fn summarize(store: &Store) -> Result<Vec<ThreadSummary>> {
  Thread::all(store)?
    .into_iter()
    .map(|thread| ThreadSummary::of(store, thread))
    .collect()
}
