//! Personas: the partners and guests that author messages and join threads.

use murmur_core::{Computed, Field, ModelDef, ModelRegistry, RecordId, Result, Store};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

use crate::{Handle, self_persona, text};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PersonaType {
  Partner,
  Guest,
}

impl PersonaType {
  /// The server model a persona of this type lives in.
  pub fn server_model(self) -> &'static str {
    match self {
      Self::Partner => "res.partner",
      Self::Guest => "mail.guest",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Persona(RecordId);

impl Handle for Persona {
  const MODEL: &'static str = "Persona";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }
}

impl Persona {
  pub fn get(store: &Store, kind: PersonaType, id: i64) -> Result<Option<Self>> {
    Self::find(store, json!({ "type": kind.to_string(), "id": id }))
  }

  /// The identifying payload of this persona.
  pub fn key(self, store: &Store) -> Result<Value> {
    Ok(json!({ "type": store.attr(self.0, "type")?, "id": store.attr(self.0, "id")? }))
  }

  pub fn id(self, store: &Store) -> Result<i64> { crate::int(store, self.0, "id") }

  pub fn kind(self, store: &Store) -> Result<Option<PersonaType>> {
    crate::lenient(store, self.0, "type")
  }

  pub fn name(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "name") }

  pub fn email(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "email") }

  pub fn im_status(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "im_status")
  }

  pub fn display_name(self, store: &Store) -> Result<String> {
    Ok(text(store, self.0, "display_name")?.unwrap_or_default())
  }

  pub fn avatar_url(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "avatar_url")
  }

  pub fn is_self(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_self") }
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(Persona::MODEL)
      .id(["type", "id"])
      .field(Field::attr("type"))
      .field(Field::attr("id"))
      .field(Field::attr("name"))
      .field(Field::attr("email"))
      .field(Field::attr("im_status"))
      .field(Field::many("channel_members", "ChannelMember").inverse("persona"))
      .field(Field::attr("display_name").compute(display_name))
      .field(Field::attr("avatar_url").compute(avatar_url))
      .field(Field::attr("is_self").compute(is_self)),
  );
}

fn display_name(store: &Store, persona: RecordId) -> Result<Computed> {
  let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
  let name = present(text(store, persona, "name")?)
    .or(present(text(store, persona, "email")?))
    .unwrap_or_else(|| "Unnamed".to_owned());
  Ok(Computed::attr(name))
}

fn avatar_url(store: &Store, persona: RecordId) -> Result<Computed> {
  let kind: Option<PersonaType> = crate::lenient(store, persona, "type")?;
  let id = store.attr(persona, "id")?;
  Ok(Computed::attr(
    kind.map(|k| format!("/web/image/{}/{id}/avatar_128", k.server_model())),
  ))
}

fn is_self(store: &Store, persona: RecordId) -> Result<Computed> {
  Ok(Computed::attr(self_persona(store)? == Some(persona)))
}
