//! Fields the messaging feature adds to the root `Store` model.

use chrono::NaiveDate;
use murmur_core::{Computed, Field, ModelRegistry, ROOT_MODEL, RecordId, Result, Store};

use crate::{
  Handle,
  activity::SERVER_DATE,
  chat_window::ChatWindow,
  persona::Persona,
  thread::{Thread, ThreadKind},
};

pub fn register(registry: &mut ModelRegistry) -> Result<()> {
  registry.extend(ROOT_MODEL, |def| {
    def
      .field(Field::one("self_persona", Persona::MODEL))
      .field(Field::many("chat_windows", ChatWindow::MODEL))
      .field(Field::attr("today"))
      .field(Field::attr("total_unread").compute(sum_unread))
  })?;
  Ok(())
}

pub fn self_persona(store: &Store) -> Result<Option<Persona>> {
  Ok(crate::self_persona(store)?.map(Persona::from_record))
}

/// Record which persona is the current user.
pub fn set_self_persona(store: &mut Store, persona: Persona) -> Result<()> {
  store.link(store.root(), "self_persona", persona.record())
}

/// Set the date activity states are measured against.
pub fn set_today(store: &mut Store, today: NaiveDate) -> Result<()> {
  store.set(store.root(), "today", today.format(SERVER_DATE).to_string())
}

/// Unread messages across every thread except mailboxes.
pub fn total_unread(store: &Store) -> Result<i64> { crate::int(store, store.root(), "total_unread") }

fn sum_unread(store: &Store, _root: RecordId) -> Result<Computed> {
  let mut total = 0;
  for thread in Thread::all(store)? {
    if thread.kind(store)? != ThreadKind::Mailbox {
      total += thread.unread_counter(store)?;
    }
  }
  Ok(Computed::attr(total))
}
