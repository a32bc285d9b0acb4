//! File attachments of threads and messages.

use murmur_core::{Computed, Field, ModelDef, ModelRegistry, RecordId, Result, Store};
use serde_json::json;

use crate::{Handle, message::Message, text, thread::Thread};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment(RecordId);

impl Handle for Attachment {
  const MODEL: &'static str = "Attachment";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }
}

impl Attachment {
  pub fn get(store: &Store, id: i64) -> Result<Option<Self>> { Self::find(store, json!(id)) }

  pub fn name(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "name") }

  pub fn mimetype(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "mimetype")
  }

  pub fn is_uploading(self, store: &Store) -> Result<bool> {
    crate::flag(store, self.0, "uploading")
  }

  pub fn extension(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "extension")
  }

  pub fn is_image(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_image") }

  pub fn is_pdf(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_pdf") }

  pub fn is_text(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_text") }

  pub fn is_video(self, store: &Store) -> Result<bool> { crate::flag(store, self.0, "is_video") }

  /// Whether the attachment can be shown inline.
  pub fn is_viewable(self, store: &Store) -> Result<bool> {
    crate::flag(store, self.0, "is_viewable")
  }

  pub fn thread(self, store: &Store) -> Result<Option<Thread>> {
    Ok(store.one(self.0, "thread")?.map(Thread::from_record))
  }

  pub fn message(self, store: &Store) -> Result<Option<Message>> {
    Ok(store.one(self.0, "message")?.map(Message::from_record))
  }
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(Attachment::MODEL)
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::attr("name"))
      .field(Field::attr("mimetype"))
      .field(Field::attr("uploading").default(false))
      .field(Field::one("thread", Thread::MODEL).inverse("attachments"))
      .field(Field::one("message", Message::MODEL).inverse("attachments"))
      .field(Field::attr("is_image").compute(is_image))
      .field(Field::attr("is_pdf").compute(is_pdf))
      .field(Field::attr("is_text").compute(is_text))
      .field(Field::attr("is_video").compute(is_video))
      .field(Field::attr("is_viewable").compute(is_viewable))
      .field(Field::attr("extension").compute(extension)),
  );
}

fn mimetype(store: &Store, attachment: RecordId) -> Result<String> {
  Ok(text(store, attachment, "mimetype")?.unwrap_or_default().to_ascii_lowercase())
}

fn is_image(store: &Store, attachment: RecordId) -> Result<Computed> {
  Ok(Computed::attr(mimetype(store, attachment)?.starts_with("image/")))
}

fn is_pdf(store: &Store, attachment: RecordId) -> Result<Computed> {
  Ok(Computed::attr(mimetype(store, attachment)? == "application/pdf"))
}

fn is_text(store: &Store, attachment: RecordId) -> Result<Computed> {
  Ok(Computed::attr(mimetype(store, attachment)?.starts_with("text/")))
}

fn is_video(store: &Store, attachment: RecordId) -> Result<Computed> {
  Ok(Computed::attr(mimetype(store, attachment)?.starts_with("video/")))
}

fn is_viewable(store: &Store, attachment: RecordId) -> Result<Computed> {
  if crate::flag(store, attachment, "uploading")? {
    return Ok(Computed::attr(false));
  }
  let mut viewable = false;
  for field in ["is_image", "is_pdf", "is_text", "is_video"] {
    viewable |= crate::flag(store, attachment, field)?;
  }
  Ok(Computed::attr(viewable))
}

fn extension(store: &Store, attachment: RecordId) -> Result<Computed> {
  let name = text(store, attachment, "name")?.unwrap_or_default();
  let extension = name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .filter(|ext| !ext.is_empty());
  Ok(Computed::attr(extension))
}
