//! Membership of a persona in a thread.

use murmur_core::{Field, ModelDef, ModelRegistry, RecordId, Result, Store};

use crate::{Handle, message::Message, persona::Persona, thread::Thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMember(RecordId);

impl Handle for ChannelMember {
  const MODEL: &'static str = "ChannelMember";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }
}

impl ChannelMember {
  pub fn thread(self, store: &Store) -> Result<Option<Thread>> {
    Ok(store.one(self.0, "thread")?.map(Thread::from_record))
  }

  pub fn persona(self, store: &Store) -> Result<Option<Persona>> {
    Ok(store.one(self.0, "persona")?.map(Persona::from_record))
  }

  pub fn last_seen_message(self, store: &Store) -> Result<Option<Message>> {
    Ok(store.one(self.0, "last_seen_message")?.map(Message::from_record))
  }
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(ChannelMember::MODEL)
      .id(["thread", "persona"])
      .field(Field::one("thread", Thread::MODEL).inverse("channel_members"))
      .field(Field::one("persona", Persona::MODEL).inverse("channel_members"))
      .field(Field::one("last_seen_message", Message::MODEL)),
  );
}
