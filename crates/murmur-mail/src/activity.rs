//! Scheduled activities on threads, bucketed by deadline.

use std::cmp::Ordering;

use chrono::NaiveDate;
use murmur_core::{Computed, Field, ModelDef, ModelRegistry, RecordId, Result, Store};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{Display, EnumString};

use crate::{Handle, persona::Persona, text, thread::Thread};

/// Format of calendar dates sent by the server.
pub const SERVER_DATE: &str = "%Y-%m-%d";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
  Overdue,
  Today,
  Planned,
}

impl ActivityState {
  /// Bucket a deadline relative to `today`.
  pub fn of(deadline: NaiveDate, today: NaiveDate) -> Self {
    match deadline.cmp(&today) {
      Ordering::Less => Self::Overdue,
      Ordering::Equal => Self::Today,
      Ordering::Greater => Self::Planned,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Activity(RecordId);

impl Handle for Activity {
  const MODEL: &'static str = "Activity";

  fn from_record(record: RecordId) -> Self { Self(record) }

  fn record(self) -> RecordId { self.0 }
}

impl Activity {
  pub fn get(store: &Store, id: i64) -> Result<Option<Self>> { Self::find(store, json!(id)) }

  pub fn summary(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "summary") }

  pub fn note(self, store: &Store) -> Result<Option<String>> { text(store, self.0, "note") }

  pub fn activity_type(self, store: &Store) -> Result<Option<String>> {
    text(store, self.0, "activity_type")
  }

  pub fn deadline(self, store: &Store) -> Result<Option<NaiveDate>> {
    Ok(parse_date(text(store, self.0, "date_deadline")?.as_deref()))
  }

  /// `None` until both the deadline and the root's `today` are known.
  pub fn state(self, store: &Store) -> Result<Option<ActivityState>> {
    crate::lenient(store, self.0, "state")
  }

  pub fn thread(self, store: &Store) -> Result<Option<Thread>> {
    Ok(store.one(self.0, "thread")?.map(Thread::from_record))
  }

  pub fn assignee(self, store: &Store) -> Result<Option<Persona>> {
    Ok(store.one(self.0, "assignee")?.map(Persona::from_record))
  }
}

pub fn register(registry: &mut ModelRegistry) {
  registry.register(
    ModelDef::new(Activity::MODEL)
      .id(["id"])
      .field(Field::attr("id"))
      .field(Field::attr("summary"))
      .field(Field::attr("note"))
      .field(Field::attr("activity_type"))
      .field(Field::attr("date_deadline"))
      .field(Field::one("thread", Thread::MODEL).inverse("activities"))
      .field(Field::one("assignee", Persona::MODEL))
      .field(Field::attr("state").compute(state)),
  );
}

pub(crate) fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(value?, SERVER_DATE).ok()
}

fn state(store: &Store, activity: RecordId) -> Result<Computed> {
  let deadline = parse_date(text(store, activity, "date_deadline")?.as_deref());
  let today = parse_date(text(store, store.root(), "today")?.as_deref());
  let state = deadline
    .zip(today)
    .map(|(deadline, today)| ActivityState::of(deadline, today).to_string());
  Ok(Computed::attr(state))
}
