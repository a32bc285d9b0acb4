//! A store shared between async services, with change notification.
//!
//! Every access runs a synchronous closure under the lock, so a mutation is
//! never interleaved with another service's reads. After a write the store
//! revision is published on a `watch` channel if it moved.

use std::sync::Arc;

use murmur_core::Store;
use tokio::sync::{Mutex, watch};

use crate::Result;

#[derive(Clone)]
pub struct SharedStore {
  inner:    Arc<Mutex<Store>>,
  revision: Arc<watch::Sender<u64>>,
}

impl SharedStore {
  pub fn new(store: Store) -> Self {
    let (revision, _) = watch::channel(store.revision());
    Self { inner: Arc::new(Mutex::new(store)), revision: Arc::new(revision) }
  }

  pub async fn read<T>(&self, f: impl FnOnce(&Store) -> T) -> T {
    let store = self.inner.lock().await;
    f(&store)
  }

  /// Run a mutation and publish the new revision if anything changed. The
  /// revision is published even when `f` fails part-way.
  pub async fn write<T>(&self, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
    let mut store = self.inner.lock().await;
    let out = f(&mut store);
    let revision = store.revision();
    self.revision.send_if_modified(|current| {
      let moved = *current != revision;
      *current = revision;
      moved
    });
    out
  }

  /// Receives the store revision after every change.
  pub fn subscribe(&self) -> watch::Receiver<u64> { self.revision.subscribe() }

  pub fn revision(&self) -> u64 { *self.revision.borrow() }
}
