//! Messages posted in threads.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use murmur_core::{Computed, Field, ModelDef, ModelRegistry, RecordId, Result, Store};
use serde_json::json;

use crate::{
  Handle,
  attachment::Attachment,
  notification::Notification,
  persona::{Persona, PersonaType},
  self_persona, text,
  thread::Thread,
};

/// Format of datetimes sent by the server.
pub const SERVER_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message(RecordId);

impl Handle for Message {
  const MODEL: &'static str = "Message";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }
}

impl Message {
  pub fn get(store: &Store, id: i64) -> Result<Option<Self>> { Self::find(store, json!(id)) }

  pub fn id(self, store: &Store) -> Result<i64> { crate::int(store, self.0, "id") }

  pub fn body(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "body") }

  pub fn message_type(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "message_type")
  }

  /// The server datetime, if present and well-formed.
  pub fn date(self, store: &Store) -> Result<Option<NaiveDateTime>> {
    Ok(parse_datetime(text(store, self.0, "date")?.as_deref()))
  }

  pub fn date_day(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "date_day") }

  pub fn thread(self, store: &Store) -> Result<Option<Thread>> {
    Ok(store.one(self.0, "thread")?.map(Thread::from_record))
  }

  pub fn author(self, store: &Store) -> Result<Option<Persona>> {
    Ok(store.one(self.0, "author")?.map(Persona::from_record))
  }

  pub fn attachments(self, store: &Store) -> Result<Vec<Attachment>> {
    Ok(
      store
        .many(self.0, "attachments")?
        .into_iter()
        .map(Attachment::from_record)
        .collect(),
    )
  }

  pub fn notifications(self, store: &Store) -> Result<Vec<Notification>> {
    Ok(
      store
        .many(self.0, "notifications")?
        .into_iter()
        .map(Notification::from_record)
        .collect(),
    )
  }

  pub fn is_starred(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_starred") }

  pub fn is_needaction(self, store: &Store) -> Result<bool> {
    crate::flag(store, self.0, "is_needaction")
  }

  pub fn is_empty(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_empty") }

  pub fn is_self_authored(self, store: &Store) -> Result<bool> {
    crate::flag(store, self.0, "is_self_authored")
  }
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(Message::MODEL)
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::attr("body"))
      .field(Field::attr("date"))
      .field(Field::attr("message_type"))
      .field(Field::attr("starred_partner_ids").default(json!([])))
      .field(Field::attr("needaction_partner_ids").default(json!([])))
      .field(Field::one("thread", Thread::MODEL).inverse("messages"))
      .field(Field::one("author", Persona::MODEL))
      .field(Field::many("attachments", Attachment::MODEL).inverse("message"))
      .field(Field::many("notifications", Notification::MODEL).inverse("message"))
      .field(Field::attr("is_starred").compute(is_starred))
      .field(Field::attr("is_needaction").compute(is_needaction))
      .field(Field::attr("is_empty").compute(is_empty))
      .field(Field::attr("is_self_authored").compute(is_self_authored))
      .field(Field::attr("date_day").compute(date_day)),
  );
}

/// Orders messages by server id.
pub(crate) fn by_id(store: &Store, a: RecordId, b: RecordId) -> Ordering {
  let id = |r| store.attr_as::<i64>(r, "id").ok().flatten().unwrap_or_default();
  id(a).cmp(&id(b))
}

pub(crate) fn parse_datetime(value: Option<&str>) -> Option<NaiveDateTime> {
  NaiveDateTime::parse_from_str(value?, SERVER_DATETIME).ok()
}

/// Whether the user's own partner id is listed in `field`.
fn lists_self(store: &Store, message: RecordId, field: &str) -> Result<bool> {
  let Some(me) = self_persona(store)? else {
    return Ok(false);
  };
  let kind: Option<PersonaType> = crate::lenient(store, me, "type")?;
  if kind != Some(PersonaType::Partner) {
    return Ok(false);
  }
  let me = crate::int(store, me, "id")?;
  let ids: Vec<i64> = crate::lenient(store, message, field)?.unwrap_or_default();
  Ok(ids.contains(&me))
}

fn is_starred(store: &Store, message: RecordId) -> Result<Computed> {
  Ok(Computed::attr(lists_self(store, message, "starred_partner_ids")?))
}

fn is_needaction(store: &Store, message: RecordId) -> Result<Computed> {
  Ok(Computed::attr(lists_self(store, message, "needaction_partner_ids")?))
}

/// No visible text and nothing attached.
fn is_empty(store: &Store, message: RecordId) -> Result<Computed> {
  let body = text(store, message, "body")?.unwrap_or_default();
  let visible = strip_tags(&body);
  let empty = visible.trim().is_empty() && store.many(message, "attachments")?.is_empty();
  Ok(Computed::attr(empty))
}

fn is_self_authored(store: &Store, message: RecordId) -> Result<Computed> {
  let author = store.one(message, "author")?;
  Ok(Computed::attr(author.is_some() && author == self_persona(store)?))
}

fn date_day(store: &Store, message: RecordId) -> Result<Computed> {
  let date = parse_datetime(text(store, message, "date")?.as_deref());
  Ok(Computed::attr(date.map(|d| d.date().to_string())))
}

fn strip_tags(html: &str) -> String {
  let mut out = String::with_capacity(html.len());
  let mut in_tag = false;
  for c in html.chars() {
    match c {
      '<' => in_tag = true,
      '>' => in_tag = false,
      c if !in_tag => out.push(c),
      _ => {}
    }
  }
  out
}
