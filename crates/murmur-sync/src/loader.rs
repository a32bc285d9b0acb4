//! History loading with latest-request-wins fencing.
//!
//! Each load of a thread takes a new generation number before it goes to the
//! server. When the response arrives, it is applied only if no newer load of
//! the same thread started in the meantime.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use murmur_mail::{Handle, Message, Thread};
use serde_json::Value;

use crate::{
  Error, Result,
  shared::SharedStore,
  transport::{ThreadRef, Transport},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
  /// The page was applied; messages in server order.
  Loaded(Vec<Message>),
  /// A newer load of the same thread superseded this one.
  Stale,
}

pub struct ThreadLoader<T> {
  transport:   Arc<T>,
  store:       SharedStore,
  page_size:   usize,
  generations: Mutex<HashMap<ThreadRef, u64>>,
}

impl<T: Transport> ThreadLoader<T> {
  pub fn new(transport: Arc<T>, store: SharedStore, page_size: usize) -> Self {
    Self { transport, store, page_size, generations: Mutex::new(HashMap::new()) }
  }

  /// Fetch a page of `thread`'s history, older than `before` when given.
  pub async fn load(&self, thread: &ThreadRef, before: Option<i64>) -> Result<LoadOutcome> {
    let generation = self.begin(thread);
    let page = self
      .transport
      .fetch_messages(thread, before, self.page_size)
      .await
      .map_err(Error::transport)?;

    if !self.is_current(thread, generation) {
      tracing::debug!(?thread, generation, "discarded superseded history page");
      return Ok(LoadOutcome::Stale);
    }

    let key = thread.key();
    let messages = self
      .store
      .write(|store| {
        let target = Thread::insert(store, key.clone())?;
        let mut messages = Vec::with_capacity(page.len());
        for payload in page {
          let message = Message::insert(store, with_thread(payload, &key))?;
          messages.push(message);
        }
        tracing::debug!(thread = %target.record(), count = messages.len(), "loaded history");
        Ok(messages)
      })
      .await?;
    Ok(LoadOutcome::Loaded(messages))
  }

  fn begin(&self, thread: &ThreadRef) -> u64 {
    let mut generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
    let generation = generations.entry(thread.clone()).or_default();
    *generation += 1;
    *generation
  }

  fn is_current(&self, thread: &ThreadRef, generation: u64) -> bool {
    let generations = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
    generations.get(thread) == Some(&generation)
  }
}

/// Point a message payload at `thread` unless it names a thread already.
fn with_thread(payload: Value, thread: &Value) -> Value {
  match payload {
    Value::Object(mut map) => {
      map.entry("thread").or_insert_with(|| thread.clone());
      Value::Object(map)
    }
    other => other,
  }
}
