//! Dependency tracking for computed fields and observers.
//!
//! While a computed field or an observer runs, every field and collection it
//! reads is recorded against it. A write to any of those dependencies drops the
//! memoised value (or marks the observer stale), and the drop propagates to
//! everything that read the dropped value. Recomputation is lazy: nothing runs
//! until the next read.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::{field::Slot, record::RecordId};

/// Something a reader can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Dep {
  Field(RecordId, &'static str),
  Collection(&'static str),
}

/// Handle to a tracked read registered with [`crate::Store::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Reader {
  Computed(RecordId, &'static str),
  Observer(ObserverId),
}

#[derive(Debug, Default)]
pub(crate) struct Tracker {
  /// Readers currently running, innermost last.
  frames:        Vec<(Reader, HashSet<Dep>)>,
  dependents:    HashMap<Dep, HashSet<Reader>>,
  sources:       HashMap<Reader, HashSet<Dep>>,
  cache:         HashMap<(RecordId, &'static str), Slot>,
  observers:     HashSet<ObserverId>,
  stale:         IndexSet<ObserverId>,
  next_observer: u64,
}

impl Tracker {
  /// Record a read against the innermost running reader, if any.
  pub(crate) fn record(&mut self, dep: Dep) {
    if let Some((_, deps)) = self.frames.last_mut() {
      deps.insert(dep);
    }
  }

  pub(crate) fn cached(&self, record: RecordId, field: &'static str) -> Option<Slot> {
    self.cache.get(&(record, field)).cloned()
  }

  /// Start running `reader`. Fails if it is already running further up the
  /// stack, which means it (transitively) reads itself.
  pub(crate) fn begin(&mut self, reader: Reader) -> Result<(), ()> {
    if self.is_running(reader) {
      return Err(());
    }
    self.forget(reader);
    self.frames.push((reader, HashSet::new()));
    Ok(())
  }

  pub(crate) fn is_running(&self, reader: Reader) -> bool {
    self.frames.iter().any(|(r, _)| *r == reader)
  }

  /// Stop the innermost reader and register what it read.
  pub(crate) fn end(&mut self) {
    let Some((reader, deps)) = self.frames.pop() else {
      return;
    };
    for dep in &deps {
      self.dependents.entry(*dep).or_default().insert(reader);
    }
    self.sources.insert(reader, deps);
  }

  /// Stop the innermost reader without registering anything.
  pub(crate) fn abort(&mut self) { self.frames.pop(); }

  pub(crate) fn memoise(&mut self, record: RecordId, field: &'static str, slot: Slot) {
    self.cache.insert((record, field), slot);
  }

  /// Drop a reader's registrations.
  pub(crate) fn forget(&mut self, reader: Reader) {
    if let Some(deps) = self.sources.remove(&reader) {
      for dep in deps {
        if let Some(readers) = self.dependents.get_mut(&dep) {
          readers.remove(&reader);
          if readers.is_empty() {
            self.dependents.remove(&dep);
          }
        }
      }
    }
  }

  /// Propagate a write to `dep`. Returns how many readers were invalidated.
  pub(crate) fn invalidate(&mut self, dep: Dep) -> usize {
    let mut queue = vec![dep];
    let mut count = 0;
    while let Some(dep) = queue.pop() {
      let Some(readers) = self.dependents.remove(&dep) else {
        continue;
      };
      for reader in readers {
        self.forget(reader);
        count += 1;
        match reader {
          Reader::Computed(record, field) => {
            if self.cache.remove(&(record, field)).is_some() {
              queue.push(Dep::Field(record, field));
            }
          }
          Reader::Observer(id) => {
            if self.observers.contains(&id) {
              self.stale.insert(id);
            }
          }
        }
      }
    }
    count
  }

  /// Forget every memoised value of a deleted record.
  pub(crate) fn evict(&mut self, record: RecordId) {
    let fields: Vec<_> = self
      .cache
      .keys()
      .filter(|(r, _)| *r == record)
      .map(|(_, f)| *f)
      .collect();
    for field in fields {
      self.cache.remove(&(record, field));
      self.forget(Reader::Computed(record, field));
    }
  }

  // ── Observers ─────────────────────────────────────────────────────────────

  pub(crate) fn new_observer(&mut self) -> ObserverId {
    let id = ObserverId(self.next_observer);
    self.next_observer += 1;
    self.observers.insert(id);
    id
  }

  pub(crate) fn has_observer(&self, id: ObserverId) -> bool {
    self.observers.contains(&id)
  }

  pub(crate) fn mark_fresh(&mut self, id: ObserverId) { self.stale.shift_remove(&id); }

  pub(crate) fn is_stale(&self, id: ObserverId) -> bool { self.stale.contains(&id) }

  pub(crate) fn take_stale(&mut self) -> Vec<ObserverId> { self.stale.drain(..).collect() }

  pub(crate) fn remove_observer(&mut self, id: ObserverId) {
    self.observers.remove(&id);
    self.stale.shift_remove(&id);
    self.forget(Reader::Observer(id));
  }
}
