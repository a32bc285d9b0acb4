//! Threads: channels, chats, mailboxes and the message threads of documents.
//!
//! A thread's window moves through three fold states. `open` shows it and
//! marks it read, `toggle_fold` flips between open and folded, and `close`
//! removes its chat window.
//!
//! ```text
//!            open / toggle_fold
//!  closed ─────────────────────▶ open ◀──┐
//!    ▲                            │      │ toggle_fold
//!    │ close                      ▼      │
//!    └──────────────────────── folded ───┘
//! ```

use murmur_core::{Computed, Field, ModelDef, ModelRegistry, RecordId, Result, Store};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

use crate::{
  Handle,
  activity::Activity,
  attachment::Attachment,
  channel_member::ChannelMember,
  chat_window::ChatWindow,
  message::{self, Message},
  persona::Persona,
  self_persona, text,
};

/// Server model of the user's mailboxes (inbox, starred, history).
pub const MAILBOX_MODEL: &str = "mail.box";
/// Server model of discussion channels, chats and groups.
pub const CHANNEL_MODEL: &str = "discuss.channel";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
  Mailbox,
  Chat,
  Channel,
  Group,
  Livechat,
  /// The chatter of some other server record.
  Record,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FoldState {
  Open,
  Folded,
  #[default]
  Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Thread(RecordId);

impl Handle for Thread {
  const MODEL: &'static str = "Thread";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }

  /// Delete the thread together with its chat window and memberships.
  /// Messages and personas are kept.
  fn delete(self, store: &mut Store) -> Result<()> {
    if let Some(window) = self.chat_window(store)? {
      window.delete(store)?;
    }
    for member in self.members(store)? {
      member.delete(store)?;
    }
    store.delete(self.0)
  }
}

impl Thread {
  pub fn get(store: &Store, model: &str, id: i64) -> Result<Option<Self>> {
    Self::find(store, json!({ "model": model, "id": id }))
  }

  /// The identifying payload of this thread.
  pub fn key(self, store: &Store) -> Result<Value> {
    Ok(json!({ "model": store.attr(self.0, "model")?, "id": store.attr(self.0, "id")? }))
  }

  pub fn id(self, store: &Store) -> Result<i64> { crate::int(store, self.0, "id") }

  pub fn model(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "model") }

  pub fn name(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "name") }

  pub fn description(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "description")
  }

  pub fn kind(self, store: &Store) -> Result<ThreadKind> {
    Ok(crate::lenient(store, self.0, "kind")?.unwrap_or(ThreadKind::Record))
  }

  pub fn fold_state(self, store: &Store) -> Result<FoldState> {
    Ok(crate::lenient(store, self.0, "fold_state")?.unwrap_or_default())
  }

  pub fn unread_counter(self, store: &Store) -> Result<i64> {
    crate::int(store, self.0, "message_unread_counter")
  }

  pub fn needaction_counter(self, store: &Store) -> Result<i64> {
    crate::int(store, self.0, "message_needaction_counter")
  }

  pub fn is_pinned(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_pinned") }

  pub fn is_unread(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_unread") }

  pub fn display_name(self, store: &Store) -> Result<String> {
    Ok(text(store, self.0, "display_name")?.unwrap_or_default())
  }

  pub fn messages(self, store: &Store) -> Result<Vec<Message>> { many(store, self.0, "messages") }

  pub fn members(self, store: &Store) -> Result<Vec<ChannelMember>> {
    many(store, self.0, "channel_members")
  }

  pub fn attachments(self, store: &Store) -> Result<Vec<Attachment>> {
    many(store, self.0, "attachments")
  }

  pub fn activities(self, store: &Store) -> Result<Vec<Activity>> {
    many(store, self.0, "activities")
  }

  pub fn needaction_messages(self, store: &Store) -> Result<Vec<Message>> {
    many(store, self.0, "needaction_messages")
  }

  pub fn newest_message(self, store: &Store) -> Result<Option<Message>> {
    Ok(store.one(self.0, "newest_message")?.map(Message::from_record))
  }

  pub fn seen_message(self, store: &Store) -> Result<Option<Message>> {
    Ok(store.one(self.0, "seen_message")?.map(Message::from_record))
  }

  pub fn correspondent(self, store: &Store) -> Result<Option<Persona>> {
    Ok(store.one(self.0, "correspondent")?.map(Persona::from_record))
  }

  pub fn chat_window(self, store: &Store) -> Result<Option<ChatWindow>> {
    Ok(store.one(self.0, "chat_window")?.map(ChatWindow::from_record))
  }

  /// Add `persona` as a member, returning the (possibly existing) membership.
  pub fn add_member(self, store: &mut Store, persona: Persona) -> Result<ChannelMember> {
    let payload = json!({ "thread": self.key(store)?, "persona": persona.key(store)? });
    ChannelMember::insert(store, payload)
  }

  // ── State machine ─────────────────────────────────────────────────────────

  /// Show the thread in an unfolded chat window and mark it read.
  pub fn open(self, store: &mut Store) -> Result<ChatWindow> {
    store.set(self.0, "fold_state", FoldState::Open.to_string())?;
    let window = ChatWindow::open(store, self)?;
    self.mark_as_read(store)?;
    Ok(window)
  }

  /// Fold an open thread, or open a folded or closed one.
  pub fn toggle_fold(self, store: &mut Store) -> Result<FoldState> {
    match self.fold_state(store)? {
      FoldState::Open => {
        store.set(self.0, "fold_state", FoldState::Folded.to_string())?;
        Ok(FoldState::Folded)
      }
      FoldState::Folded | FoldState::Closed => {
        self.open(store)?;
        Ok(FoldState::Open)
      }
    }
  }

  /// Close the thread's chat window.
  pub fn close(self, store: &mut Store) -> Result<()> {
    store.set(self.0, "fold_state", FoldState::Closed.to_string())?;
    if let Some(window) = self.chat_window(store)? {
      window.delete(store)?;
    }
    Ok(())
  }

  /// Mark everything up to the newest message as seen. Returns whether
  /// anything changed.
  pub fn mark_as_read(self, store: &mut Store) -> Result<bool> {
    let newest = store.one(self.0, "newest_message")?;
    let seen = store.one(self.0, "seen_message")?;
    if self.unread_counter(store)? == 0 && self.needaction_counter(store)? == 0 && seen == newest {
      return Ok(false);
    }

    if let Some(newest) = newest {
      store.link(self.0, "seen_message", newest)?;
    }
    store.update(
      self.0,
      json!({ "message_unread_counter": 0, "message_needaction_counter": 0 }),
    )?;
    tracing::debug!(thread = %self.0, "marked thread as read");
    Ok(true)
  }

  /// Insert a message pushed by the server and route it into this thread.
  /// Receiving a message the thread already holds changes nothing.
  pub fn receive_message(self, store: &mut Store, payload: Value) -> Result<Message> {
    // Decided before the insert, which may already link the message here
    // when the payload names its thread.
    let known = match payload.get("id").and_then(Value::as_i64) {
      Some(id) => Message::get(store, id)?,
      None => None,
    };
    let held = match known {
      Some(message) => message.thread(store)? == Some(self),
      None => false,
    };

    let message = Message::insert(store, payload)?;
    if held {
      return Ok(message);
    }
    store.link(self.0, "messages", message.record())?;
    store.set(self.0, "is_pinned", true)?;

    if message.is_self_authored(store)? {
      store.link(self.0, "seen_message", message.record())?;
    } else if self.fold_state(store)? == FoldState::Open {
      self.mark_as_read(store)?;
    } else {
      let unread = self.unread_counter(store)? + 1;
      store.set(self.0, "message_unread_counter", unread)?;
      if message.is_needaction(store)? {
        let needaction = self.needaction_counter(store)? + 1;
        store.set(self.0, "message_needaction_counter", needaction)?;
      }
    }
    Ok(message)
  }
}

fn many<H: Handle>(store: &Store, record: RecordId, field: &str) -> Result<Vec<H>> {
  Ok(store.many(record, field)?.into_iter().map(H::from_record).collect())
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(Thread::MODEL)
      .id(["model", "id"])
      .field(Field::attr("model"))
      .field(Field::attr("id"))
      .field(Field::attr("name"))
      .field(Field::attr("description"))
      .field(Field::attr("channel_type"))
      .field(Field::attr("message_unread_counter").default(0))
      .field(Field::attr("message_needaction_counter").default(0))
      .field(Field::attr("fold_state").default(FoldState::Closed.to_string()))
      .field(Field::attr("is_pinned").default(false))
      .field(
        Field::many("messages", Message::MODEL)
          .inverse("thread")
          .sort(message::by_id),
      )
      .field(Field::many("channel_members", ChannelMember::MODEL).inverse("thread"))
      .field(Field::many("attachments", Attachment::MODEL).inverse("thread"))
      .field(Field::many("activities", Activity::MODEL).inverse("thread"))
      .field(Field::one("chat_window", ChatWindow::MODEL).inverse("thread"))
      .field(Field::one("seen_message", Message::MODEL))
      .field(Field::attr("kind").compute(kind))
      .field(Field::one("correspondent", Persona::MODEL).compute(correspondent))
      .field(Field::attr("display_name").compute(display_name))
      .field(Field::one("newest_message", Message::MODEL).compute(newest_message))
      .field(Field::many("needaction_messages", Message::MODEL).compute(needaction_messages))
      .field(Field::attr("is_unread").compute(is_unread)),
  );
}

fn kind(store: &Store, thread: RecordId) -> Result<Computed> {
  let kind = match text(store, thread, "model")?.as_deref() {
    Some(MAILBOX_MODEL) => ThreadKind::Mailbox,
    Some(CHANNEL_MODEL) => crate::lenient(store, thread, "channel_type")?
      .filter(|k| !matches!(k, ThreadKind::Mailbox | ThreadKind::Record))
      .unwrap_or(ThreadKind::Channel),
    _ => ThreadKind::Record,
  };
  Ok(Computed::attr(kind.to_string()))
}

/// The other party of a one-to-one chat; yourself when chatting alone.
fn correspondent(store: &Store, thread: RecordId) -> Result<Computed> {
  if store.attr(thread, "kind")? != Value::from(ThreadKind::Chat.to_string()) {
    return Ok(Computed::one(None));
  }
  let me = self_persona(store)?;
  let mut personas = Vec::new();
  for member in store.many(thread, "channel_members")? {
    if let Some(persona) = store.one(member, "persona")? {
      personas.push(persona);
    }
  }
  let other = personas.iter().copied().find(|p| Some(*p) != me);
  let alone = me.filter(|me| me.is_in(&personas));
  Ok(Computed::one(other.or(alone)))
}

fn display_name(store: &Store, thread: RecordId) -> Result<Computed> {
  if let Some(persona) = store.one(thread, "correspondent")? {
    return Ok(Computed::Attr(store.attr(persona, "display_name")?));
  }
  Ok(Computed::attr(text(store, thread, "name")?.unwrap_or_default()))
}

fn newest_message(store: &Store, thread: RecordId) -> Result<Computed> {
  Ok(Computed::one(store.many(thread, "messages")?.last().copied()))
}

fn needaction_messages(store: &Store, thread: RecordId) -> Result<Computed> {
  let mut out = Vec::new();
  for message in store.many(thread, "messages")? {
    if crate::flag(store, message, "is_needaction")? {
      out.push(message);
    }
  }
  Ok(Computed::many(out))
}

fn is_unread(store: &Store, thread: RecordId) -> Result<Computed> {
  Ok(Computed::attr(crate::int(store, thread, "message_unread_counter")? > 0))
}
