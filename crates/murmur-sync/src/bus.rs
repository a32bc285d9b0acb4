//! Routing of server push notifications into the store.

use murmur_core::Store;
use murmur_mail::{Handle, Message, Persona, Thread, root};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, transport::ThreadRef};

/// A notification pushed by the server bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BusNotification {
  /// A message was posted in a thread.
  NewMessage { thread: ThreadRef, message: Value },
  /// The current user joined a channel; `thread` is its full payload.
  ChannelJoined { thread: Value },
  /// The current user left a channel.
  ChannelLeft { thread: ThreadRef },
  /// A persona's data changed; the payload carries its identity.
  PersonaUpdated { persona: Value },
  /// A thread's data changed; the payload carries its identity.
  ThreadUpdated { thread: Value },
  /// A message was deleted on the server.
  MessageDeleted { message_id: i64 },
}

impl BusNotification {
  /// Apply this notification to the store.
  pub fn apply(self, store: &mut Store) -> Result<()> {
    match self {
      Self::NewMessage { thread, message } => {
        let target = Thread::insert(store, thread.key())?;
        let message = target.receive_message(store, message)?;
        tracing::debug!(thread = ?thread, message = %message.record(), "routed new message");
      }
      Self::ChannelJoined { thread } => {
        let target = Thread::insert(store, thread)?;
        target.update(store, serde_json::json!({ "is_pinned": true }))?;
        if let Some(me) = root::self_persona(store)? {
          target.add_member(store, me)?;
        }
        tracing::info!(thread = %target.record(), "joined channel");
      }
      Self::ChannelLeft { thread } => {
        match Thread::find(store, thread.key())? {
          Some(target) => {
            target.delete(store)?;
            tracing::info!(thread = ?thread, "left channel");
          }
          None => tracing::debug!(thread = ?thread, "left unknown channel"),
        }
      }
      Self::PersonaUpdated { persona } => {
        Persona::insert(store, persona)?;
      }
      Self::ThreadUpdated { thread } => {
        Thread::insert(store, thread)?;
      }
      Self::MessageDeleted { message_id } => match Message::get(store, message_id)? {
        Some(message) => message.delete(store)?,
        None => tracing::debug!(message_id, "deleted message was never loaded"),
      },
    }
    Ok(())
  }
}

/// Parse and apply one line of a JSON-lines bus log. Blank lines are skipped.
pub fn apply_line(store: &mut Store, line: &str) -> Result<bool> {
  let line = line.trim();
  if line.is_empty() {
    return Ok(false);
  }
  let notification: BusNotification = serde_json::from_str(line)?;
  notification.apply(store)?;
  Ok(true)
}
