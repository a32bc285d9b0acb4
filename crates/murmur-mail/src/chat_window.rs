//! Chat windows: the on-screen presence of an opened thread.

use murmur_core::{Computed, Field, ModelDef, ModelRegistry, RecordId, Result, Store};
use serde_json::json;

use crate::{
  Handle, text,
  thread::{FoldState, Thread},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatWindow(RecordId);

impl Handle for ChatWindow {
  const MODEL: &'static str = "ChatWindow";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }
}

impl ChatWindow {
  /// The window of `thread`, created and listed on the root if needed.
  pub fn open(store: &mut Store, thread: Thread) -> Result<Self> {
    let window = Self::insert(store, json!({ "thread": thread.key(store)? }))?;
    store.link(store.root(), "chat_windows", window.0)?;
    Ok(window)
  }

  /// Windows in display order.
  pub fn listed(store: &Store) -> Result<Vec<Self>> {
    Ok(
      store
        .many(store.root(), "chat_windows")?
        .into_iter()
        .map(Self::from_record)
        .collect(),
    )
  }

  pub fn thread(self, store: &Store) -> Result<Option<Thread>> {
    Ok(store.one(self.0, "thread")?.map(Thread::from_record))
  }

  pub fn is_folded(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_folded") }

  pub fn display_name(self, store: &Store) -> Result<String> {
    Ok(text(store, self.0, "display_name")?.unwrap_or_default())
  }

  /// Ask the view to move focus into this window.
  pub fn focus(self, store: &mut Store) -> Result<()> {
    let requests = crate::int(store, self.0, "autofocus")? + 1;
    store.set(self.0, "autofocus", requests)
  }
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(ChatWindow::MODEL)
      .id(["thread"])
      .field(Field::one("thread", Thread::MODEL).inverse("chat_window"))
      .field(Field::attr("autofocus").default(0))
      .field(Field::attr("is_folded").compute(is_folded))
      .field(Field::attr("display_name").compute(display_name)),
  );
}

fn is_folded(store: &Store, window: RecordId) -> Result<Computed> {
  let folded = match store.one(window, "thread")? {
    Some(thread) => {
      store.attr(thread, "fold_state")? == json!(FoldState::Folded.to_string())
    }
    None => false,
  };
  Ok(Computed::attr(folded))
}

fn display_name(store: &Store, window: RecordId) -> Result<Computed> {
  match store.one(window, "thread")? {
    Some(thread) => Ok(Computed::Attr(store.attr(thread, "display_name")?)),
    None => Ok(Computed::attr("")),
  }
}
