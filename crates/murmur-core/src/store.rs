//! [`Store`], the in-memory record graph.
//!
//! The store owns one collection per model, keyed by identifying key, and the
//! root singleton record. All mutation goes through `&mut self` and runs to
//! completion, so no reader can observe a half-applied relation change. Reads
//! take `&self`; memoised computed values and dependency bookkeeping live
//! behind a `RefCell`.

use std::{
  cell::RefCell,
  collections::HashMap,
  sync::Arc,
};

use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  command::{Change, Changes, RelationCommand, Target},
  field::{Field, FieldKind, Slot},
  model::{ModelDef, ModelRegistry, ROOT_MODEL},
  record::{Key, KeyPart, RecordId},
  tracking::{Dep, ObserverId, Reader, Tracker},
};

// ─── Internal state ──────────────────────────────────────────────────────────

#[derive(Debug)]
struct RecordData {
  model: &'static str,
  key:   Key,
  slots: HashMap<&'static str, Slot>,
}

#[derive(Debug, Default)]
struct Collection {
  by_key: HashMap<Key, RecordId>,
  order:  IndexSet<RecordId>,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The root of the record graph.
#[derive(Debug)]
pub struct Store {
  registry:    Arc<ModelRegistry>,
  records:     HashMap<RecordId, RecordData>,
  collections: HashMap<&'static str, Collection>,
  /// `target -> {(holder, field)}` for every stored relational reference.
  backrefs:    HashMap<RecordId, IndexSet<(RecordId, &'static str)>>,
  root:        RecordId,
  next_id:     u64,
  revision:    u64,
  tracker:     RefCell<Tracker>,
}

impl Store {
  /// Verify `registry` and create a store holding only the root record.
  pub fn new(registry: ModelRegistry) -> Result<Self> {
    registry.verify()?;
    let registry = Arc::new(registry);

    let mut store = Self {
      registry: Arc::clone(&registry),
      records: HashMap::new(),
      collections: HashMap::new(),
      backrefs: HashMap::new(),
      root: RecordId::new(0),
      next_id: 0,
      revision: 0,
      tracker: RefCell::new(Tracker::default()),
    };
    let root_def = registry.require(ROOT_MODEL)?;
    store.root = store.create(root_def, Key::default());
    tracing::debug!(models = registry.models().count(), "store created");
    Ok(store)
  }

  pub fn registry(&self) -> &ModelRegistry { &self.registry }

  /// The singleton record of the root model.
  pub fn root(&self) -> RecordId { self.root }

  /// Incremented by every write that changed the graph.
  pub fn revision(&self) -> u64 { self.revision }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Find or create the record of `model` identified by `payload`, then apply
  /// the rest of the payload to it.
  ///
  /// `payload` is an object holding at least the identifying fields, or a bare
  /// key value for models with a single identifying field.
  pub fn insert(&mut self, model: &str, payload: Value) -> Result<RecordId> {
    let registry = Arc::clone(&self.registry);
    let def = registry.require(model)?;
    let payload = normalize(def, payload)?;
    let changes = Changes::from_payload(def, &payload)?;

    let record = if def.name() == ROOT_MODEL {
      self.root
    } else {
      let key = self.resolve_key(def, &payload)?;
      let existing = self
        .collections
        .get(def.name())
        .and_then(|c| c.by_key.get(&key))
        .copied();
      match existing {
        Some(record) => record,
        None => self.create(def, key),
      }
    };

    self.apply_validated(record, def, changes)?;
    Ok(record)
  }

  /// [`Store::insert`] for each payload, in order.
  pub fn insert_all(
    &mut self,
    model: &str,
    payloads: impl IntoIterator<Item = Value>,
  ) -> Result<Vec<RecordId>> {
    payloads
      .into_iter()
      .map(|payload| self.insert(model, payload))
      .collect()
  }

  /// Apply a partial payload to an existing record. Fields absent from
  /// `payload` are left untouched.
  pub fn update(&mut self, record: RecordId, payload: Value) -> Result<()> {
    let registry = Arc::clone(&self.registry);
    let def = registry.require(self.data(record)?.model)?;
    let Value::Object(payload) = payload else {
      return Err(Error::InvalidCommand(format!(
        "{}: update payload must be an object",
        def.name()
      )));
    };
    let changes = Changes::from_payload(def, &payload)?;
    self.apply_validated(record, def, changes)
  }

  /// Apply typed changes to an existing record.
  pub fn apply(&mut self, record: RecordId, changes: Changes) -> Result<()> {
    let registry = Arc::clone(&self.registry);
    let def = registry.require(self.data(record)?.model)?;
    changes.validate(def)?;
    self.apply_validated(record, def, changes)
  }

  /// Assign a single attribute.
  pub fn set(
    &mut self,
    record: RecordId,
    field: &str,
    value: impl Into<Value>,
  ) -> Result<()> {
    self.apply(record, Changes::new().set(field, value))
  }

  /// Link `target` through a relational field (and its inverse).
  pub fn link(&mut self, record: RecordId, field: &str, target: RecordId) -> Result<()> {
    self.command(record, field, RelationCommand::add([target]))
  }

  /// Unlink `target` from a relational field (and its inverse).
  pub fn unlink(&mut self, record: RecordId, field: &str, target: RecordId) -> Result<()> {
    self.command(record, field, RelationCommand::remove([target]))
  }

  /// Empty a relational field.
  pub fn clear(&mut self, record: RecordId, field: &str) -> Result<()> {
    self.command(record, field, RelationCommand::Clear)
  }

  pub fn command(
    &mut self,
    record: RecordId,
    field: &str,
    command: RelationCommand,
  ) -> Result<()> {
    self.apply(record, Changes::new().command(field, command))
  }

  /// Remove `record` from its collection after clearing every relation it
  /// takes part in, in both directions. Counterpart records are kept.
  pub fn delete(&mut self, record: RecordId) -> Result<()> {
    if record == self.root {
      return Err(Error::RootDeletion);
    }
    let registry = Arc::clone(&self.registry);
    let model = self.data(record)?.model;
    let def = registry.require(model)?;

    for field in def.fields().filter(|f| f.is_relation() && !f.is_computed()) {
      for target in self.stored(record, field.name()).targets() {
        self.detach(&registry, record, field, target)?;
      }
    }

    let incoming: Vec<_> = self
      .backrefs
      .get(&record)
      .map(|refs| refs.iter().copied().collect())
      .unwrap_or_default();
    for (holder, field_name) in incoming {
      let holder_def = registry.require(self.data(holder)?.model)?;
      let field = holder_def.require(field_name)?;
      self.detach(&registry, holder, field, record)?;
    }
    self.backrefs.remove(&record);

    let data = self
      .records
      .remove(&record)
      .ok_or(Error::RecordNotFound(record))?;
    if let Some(collection) = self.collections.get_mut(model) {
      collection.by_key.remove(&data.key);
      collection.order.shift_remove(&record);
    }

    let tracker = self.tracker.get_mut();
    tracker.evict(record);
    for field in def.fields() {
      tracker.invalidate(Dep::Field(record, field.name()));
    }
    tracker.invalidate(Dep::Collection(model));
    self.revision += 1;

    tracing::debug!(model, %record, key = %data.key, "deleted record");
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn exists(&self, record: RecordId) -> bool { self.records.contains_key(&record) }

  pub fn model_of(&self, record: RecordId) -> Result<&'static str> {
    Ok(self.data(record)?.model)
  }

  pub fn key_of(&self, record: RecordId) -> Result<Key> { Ok(self.data(record)?.key.clone()) }

  /// Read an attribute. Unset attributes read as `null`.
  pub fn attr(&self, record: RecordId, field: &str) -> Result<Value> {
    match self.read(record, field, FieldKind::Attr)? {
      Slot::Attr(value) => Ok(value),
      _ => Ok(Value::Null),
    }
  }

  /// Read an attribute and deserialise it; `null` reads as `None`.
  pub fn attr_as<T: DeserializeOwned>(&self, record: RecordId, field: &str) -> Result<Option<T>> {
    match self.attr(record, field)? {
      Value::Null => Ok(None),
      value => Ok(Some(serde_json::from_value(value)?)),
    }
  }

  pub fn one(&self, record: RecordId, field: &str) -> Result<Option<RecordId>> {
    match self.read(record, field, FieldKind::One)? {
      Slot::One(target) => Ok(target),
      _ => Ok(None),
    }
  }

  pub fn many(&self, record: RecordId, field: &str) -> Result<Vec<RecordId>> {
    match self.read(record, field, FieldKind::Many)? {
      Slot::Many(targets) => Ok(targets.into_iter().collect()),
      _ => Ok(Vec::new()),
    }
  }

  /// Every record of `model`, in creation order.
  pub fn records(&self, model: &str) -> Result<Vec<RecordId>> {
    let def = self.registry.require(model)?;
    self.track(Dep::Collection(def.name()));
    Ok(
      self
        .collections
        .get(def.name())
        .map(|c| c.order.iter().copied().collect())
        .unwrap_or_default(),
    )
  }

  pub fn len(&self, model: &str) -> Result<usize> {
    let def = self.registry.require(model)?;
    self.track(Dep::Collection(def.name()));
    Ok(self.collections.get(def.name()).map_or(0, |c| c.order.len()))
  }

  /// Look up a record by identifying payload without creating it.
  pub fn find(&self, model: &str, payload: Value) -> Result<Option<RecordId>> {
    let def = self.registry.require(model)?;
    self.track(Dep::Collection(def.name()));
    if def.name() == ROOT_MODEL {
      return Ok(Some(self.root));
    }
    let payload = normalize(def, payload)?;
    let Some(key) = self.lookup_key(def, &payload)? else {
      return Ok(None);
    };
    Ok(
      self
        .collections
        .get(def.name())
        .and_then(|c| c.by_key.get(&key))
        .copied(),
    )
  }

  // ── Observers ─────────────────────────────────────────────────────────────

  /// Run `f` while recording what it reads. The returned id becomes stale
  /// once any of those reads would produce a different result.
  pub fn observe<T>(&self, f: impl FnOnce(&Store) -> T) -> (T, ObserverId) {
    let id = self.tracker.borrow_mut().new_observer();
    let out = self.run_observer(id, f);
    (out, id)
  }

  /// Re-run an observer, replacing what it depends on. Returns `None` for an
  /// unknown observer, or one that is already running.
  pub fn refresh<T>(&self, id: ObserverId, f: impl FnOnce(&Store) -> T) -> Option<T> {
    {
      let tracker = self.tracker.borrow();
      if !tracker.has_observer(id) || tracker.is_running(Reader::Observer(id)) {
        return None;
      }
    }
    Some(self.run_observer(id, f))
  }

  pub fn is_stale(&self, id: ObserverId) -> bool { self.tracker.borrow().is_stale(id) }

  /// Drain the observers that went stale since the last call.
  pub fn take_stale(&self) -> Vec<ObserverId> { self.tracker.borrow_mut().take_stale() }

  pub fn unobserve(&self, id: ObserverId) { self.tracker.borrow_mut().remove_observer(id); }

  fn run_observer<T>(&self, id: ObserverId, f: impl FnOnce(&Store) -> T) -> T {
    {
      let mut tracker = self.tracker.borrow_mut();
      let began = tracker.begin(Reader::Observer(id));
      debug_assert!(began.is_ok(), "observer {id:?} is already running");
      tracker.mark_fresh(id);
    }
    let out = f(self);
    self.tracker.borrow_mut().end();
    out
  }

  // ── Read internals ────────────────────────────────────────────────────────

  fn data(&self, record: RecordId) -> Result<&RecordData> {
    self.records.get(&record).ok_or(Error::RecordNotFound(record))
  }

  fn track(&self, dep: Dep) { self.tracker.borrow_mut().record(dep); }

  fn read(&self, record: RecordId, name: &str, expected: FieldKind) -> Result<Slot> {
    let data = self.data(record)?;
    let def = self.registry.require(data.model)?;
    let field = def.require(name)?;
    if field.kind() != expected {
      return Err(Error::KindMismatch {
        model:    def.name().to_owned(),
        field:    field.name().to_owned(),
        expected: expected.as_str(),
        actual:   field.kind().as_str(),
      });
    }

    self.track(Dep::Field(record, field.name()));
    match field.compute {
      None => Ok(
        data
          .slots
          .get(field.name())
          .cloned()
          .unwrap_or_else(|| Slot::empty(field)),
      ),
      Some(compute) => {
        if let Some(hit) = self.tracker.borrow().cached(record, field.name()) {
          return Ok(hit);
        }
        self.evaluate(record, def, field, compute)
      }
    }
  }

  fn evaluate(
    &self,
    record: RecordId,
    def: &ModelDef,
    field: &Field,
    compute: crate::field::ComputeFn,
  ) -> Result<Slot> {
    let reader = Reader::Computed(record, field.name());
    if self.tracker.borrow_mut().begin(reader).is_err() {
      return Err(Error::ComputeCycle {
        model: def.name().to_owned(),
        field: field.name().to_owned(),
      });
    }

    let computed = match compute(self, record) {
      Ok(computed) => computed,
      Err(err) => {
        self.tracker.borrow_mut().abort();
        return Err(err);
      }
    };
    if computed.kind() != field.kind() {
      self.tracker.borrow_mut().abort();
      return Err(Error::KindMismatch {
        model:    def.name().to_owned(),
        field:    field.name().to_owned(),
        expected: field.kind().as_str(),
        actual:   computed.kind().as_str(),
      });
    }

    let slot = Slot::from(computed);
    let mut tracker = self.tracker.borrow_mut();
    tracker.end();
    tracker.memoise(record, field.name(), slot.clone());
    Ok(slot)
  }

  /// The stored slot of a non-computed field, untracked.
  fn stored(&self, record: RecordId, field: &'static str) -> Slot {
    self
      .records
      .get(&record)
      .and_then(|d| d.slots.get(field))
      .cloned()
      .unwrap_or(Slot::Attr(Value::Null))
  }

  fn lookup_key(&self, def: &ModelDef, payload: &Map<String, Value>) -> Result<Option<Key>> {
    let mut parts = Vec::with_capacity(def.id_fields().len());
    for name in def.id_fields() {
      let field = def.require(name)?;
      let value = id_value(def, name, payload)?;
      let part = match field.kind() {
        FieldKind::One => {
          let target = field.target().unwrap_or_default();
          match self.find(target, value.clone())? {
            Some(record) => KeyPart::Record(record),
            None => return Ok(None),
          }
        }
        _ => attr_key_part(def, name, value)?,
      };
      parts.push(part);
    }
    Ok(Some(Key::new(parts)))
  }

  // ── Write internals ───────────────────────────────────────────────────────

  fn create(&mut self, def: &ModelDef, key: Key) -> RecordId {
    let record = RecordId::new(self.next_id);
    self.next_id += 1;

    let mut slots: HashMap<_, _> = def
      .fields()
      .filter(|f| !f.is_computed())
      .map(|f| (f.name(), Slot::empty(f)))
      .collect();
    // Scalar key parts are readable before the rest of the payload lands, so
    // sort comparators see them.
    for (name, part) in def.id_fields().iter().zip(key.parts()) {
      if let Some(value) = part.to_json() {
        slots.insert(*name, Slot::Attr(value));
      }
    }
    self.records.insert(record, RecordData { model: def.name(), key: key.clone(), slots });

    let collection = self.collections.entry(def.name()).or_default();
    collection.by_key.insert(key.clone(), record);
    collection.order.insert(record);

    self.touch(Dep::Collection(def.name()));
    tracing::debug!(model = def.name(), %record, %key, "created record");
    record
  }

  /// Bump the revision and propagate a write.
  fn touch(&mut self, dep: Dep) {
    self.revision += 1;
    let invalidated = self.tracker.get_mut().invalidate(dep);
    if invalidated > 0 {
      tracing::trace!(?dep, invalidated, "invalidated dependents");
    }
  }

  fn resolve_key(&mut self, def: &ModelDef, payload: &Map<String, Value>) -> Result<Key> {
    let mut parts = Vec::with_capacity(def.id_fields().len());
    for name in def.id_fields() {
      let field = def.require(name)?;
      let value = id_value(def, name, payload)?;
      let part = match field.kind() {
        FieldKind::One => {
          let target = field.target().unwrap_or_default();
          KeyPart::Record(self.resolve_target(def, field, target, Target::Data(value.clone()))?)
        }
        _ => attr_key_part(def, name, value)?,
      };
      parts.push(part);
    }
    Ok(Key::new(parts))
  }

  /// Turn a target into a record of `target_model`, inserting payload data.
  fn resolve_target(
    &mut self,
    def: &ModelDef,
    field: &Field,
    target_model: &str,
    target: Target,
  ) -> Result<RecordId> {
    match target {
      Target::Data(value) => self.insert(target_model, value),
      Target::Record(record) => {
        let actual = self.data(record)?.model;
        if actual != target_model {
          return Err(Error::TargetMismatch {
            model:    def.name().to_owned(),
            field:    field.name().to_owned(),
            expected: target_model.to_owned(),
            actual:   actual.to_owned(),
          });
        }
        Ok(record)
      }
    }
  }

  /// Like [`Store::resolve_target`] but never inserts; unknown data is `None`.
  fn lookup_target(&self, target_model: &str, target: Target) -> Result<Option<RecordId>> {
    match target {
      Target::Record(record) => Ok(self.exists(record).then_some(record)),
      Target::Data(value) => self.find(target_model, value),
    }
  }

  fn apply_validated(
    &mut self,
    record: RecordId,
    def: &ModelDef,
    changes: Changes,
  ) -> Result<()> {
    for (name, change) in changes.into_entries() {
      let field = def.require(&name)?;
      match change {
        Change::Set(value) => self.assign(record, def, field, value)?,
        Change::Link(None) => self.apply_command(record, def, field, RelationCommand::Clear)?,
        Change::Link(Some(target)) => {
          self.apply_command(record, def, field, RelationCommand::Add(vec![target]))?
        }
        Change::Commands(commands) => {
          for command in commands {
            self.apply_command(record, def, field, command)?;
          }
        }
      }
    }
    Ok(())
  }

  fn assign(&mut self, record: RecordId, def: &ModelDef, field: &Field, value: Value) -> Result<()> {
    if self.stored(record, field.name()) == Slot::Attr(value.clone()) {
      return Ok(());
    }
    if let Some(index) = def.id_position(field.name()) {
      let part = attr_key_part(def, field.name(), &value)?;
      self.rekey(record, def, index, part)?;
    }
    if let Some(data) = self.records.get_mut(&record) {
      data.slots.insert(field.name(), Slot::Attr(value));
    }
    self.touch(Dep::Field(record, field.name()));
    Ok(())
  }

  /// Move `record` to a new key after one identifying part changed.
  fn rekey(&mut self, record: RecordId, def: &ModelDef, index: usize, part: KeyPart) -> Result<()> {
    let old = self.data(record)?.key.clone();
    let new = old.with_part(index, part);
    if new == old {
      return Ok(());
    }
    let collection = self.collections.entry(def.name()).or_default();
    if collection.by_key.contains_key(&new) {
      return Err(Error::DuplicateIdentity {
        model: def.name().to_owned(),
        key:   new.to_string(),
      });
    }
    collection.by_key.remove(&old);
    collection.by_key.insert(new.clone(), record);
    if let Some(data) = self.records.get_mut(&record) {
      data.key = new;
    }
    Ok(())
  }

  fn apply_command(
    &mut self,
    record: RecordId,
    def: &ModelDef,
    field: &Field,
    command: RelationCommand,
  ) -> Result<()> {
    let registry = Arc::clone(&self.registry);
    let target_model = field.target().unwrap_or_default();
    let single = field.kind() == FieldKind::One;

    match command {
      RelationCommand::Add(targets) => {
        if single && targets.len() > 1 {
          return Err(single_target_error(def, field));
        }
        for target in targets {
          let target = self.resolve_target(def, field, target_model, target)?;
          self.attach(&registry, record, def, field, target)?;
        }
      }
      RelationCommand::Remove(targets) => {
        for target in targets {
          if let Some(target) = self.lookup_target(target_model, target)? {
            self.detach(&registry, record, field, target)?;
          }
        }
      }
      RelationCommand::Replace(targets) => {
        if single && targets.len() > 1 {
          return Err(single_target_error(def, field));
        }
        let mut wanted = IndexSet::with_capacity(targets.len());
        for target in targets {
          wanted.insert(self.resolve_target(def, field, target_model, target)?);
        }
        for current in self.stored(record, field.name()).targets() {
          if !wanted.contains(&current) {
            self.detach(&registry, record, field, current)?;
          }
        }
        for target in &wanted {
          self.attach(&registry, record, def, field, *target)?;
        }
        if field.sort.is_none() {
          self.reorder(record, field, wanted);
        }
      }
      RelationCommand::Clear => {
        for current in self.stored(record, field.name()).targets() {
          self.detach(&registry, record, field, current)?;
        }
      }
      RelationCommand::Delete(targets) => {
        for target in targets {
          if let Some(target) = self.lookup_target(target_model, target)? {
            self.delete(target)?;
          }
        }
      }
    }
    Ok(())
  }

  /// Link `holder.field -> target` and the inverse `target.inverse -> holder`.
  fn attach(
    &mut self,
    registry: &ModelRegistry,
    holder: RecordId,
    def: &ModelDef,
    field: &Field,
    target: RecordId,
  ) -> Result<()> {
    let current = self.stored(holder, field.name());
    if current.contains(target) {
      return Ok(());
    }
    if let Some(index) = def.id_position(field.name()) {
      self.rekey(holder, def, index, KeyPart::Record(target))?;
    }
    if let Slot::One(Some(previous)) = current {
      self.detach(registry, holder, field, previous)?;
    }

    let inverse = self.inverse_of(registry, field)?;
    if let Some(inverse) = inverse
      && inverse.kind() == FieldKind::One
      && let Slot::One(Some(other)) = self.stored(target, inverse.name())
      && other != holder
    {
      self.detach(registry, target, inverse, other)?;
    }

    self.raw_add(holder, field, target);
    if let Some(inverse) = inverse {
      self.raw_add(target, inverse, holder);
    }
    Ok(())
  }

  /// Unlink `holder.field -> target` and its inverse. No-op when not linked.
  fn detach(
    &mut self,
    registry: &ModelRegistry,
    holder: RecordId,
    field: &Field,
    target: RecordId,
  ) -> Result<()> {
    if !self.stored(holder, field.name()).contains(target) {
      return Ok(());
    }
    self.raw_remove(holder, field, target);
    if let Some(inverse) = self.inverse_of(registry, field)? {
      self.raw_remove(target, inverse, holder);
    }
    Ok(())
  }

  fn inverse_of<'r>(&self, registry: &'r ModelRegistry, field: &Field) -> Result<Option<&'r Field>> {
    match (field.target(), field.inverse_name()) {
      (Some(target), Some(inverse)) => Ok(Some(registry.require(target)?.require(inverse)?)),
      _ => Ok(None),
    }
  }

  fn raw_add(&mut self, holder: RecordId, field: &Field, target: RecordId) {
    let name = field.name();
    let Some(slot) = self.records.get_mut(&holder).and_then(|d| d.slots.get_mut(name)) else {
      return;
    };
    let changed = match slot {
      Slot::One(current) => current.replace(target) != Some(target),
      Slot::Many(set) => set.insert(target),
      Slot::Attr(_) => false,
    };
    if !changed {
      return;
    }
    self.backrefs.entry(target).or_default().insert((holder, name));
    if let Some(sort) = field.sort {
      let mut members = match self.stored(holder, name) {
        Slot::Many(set) => set.into_iter().collect::<Vec<_>>(),
        _ => Vec::new(),
      };
      members.sort_by(|a, b| sort(self, *a, *b));
      if let Some(data) = self.records.get_mut(&holder) {
        data.slots.insert(name, Slot::Many(members.into_iter().collect()));
      }
    }
    self.touch(Dep::Field(holder, name));
  }

  fn raw_remove(&mut self, holder: RecordId, field: &Field, target: RecordId) {
    let name = field.name();
    let Some(slot) = self.records.get_mut(&holder).and_then(|d| d.slots.get_mut(name)) else {
      return;
    };
    let changed = match slot {
      Slot::One(current) if *current == Some(target) => {
        *current = None;
        true
      }
      Slot::Many(set) => set.shift_remove(&target),
      _ => false,
    };
    if !changed {
      return;
    }
    if let Some(refs) = self.backrefs.get_mut(&target) {
      refs.shift_remove(&(holder, name));
    }
    self.touch(Dep::Field(holder, name));
  }

  /// Put the members of a `many` field in the given order.
  fn reorder(&mut self, holder: RecordId, field: &Field, order: IndexSet<RecordId>) {
    let name = field.name();
    let Some(data) = self.records.get_mut(&holder) else {
      return;
    };
    let same = matches!(data.slots.get(name), Some(Slot::Many(set)) if set.iter().eq(order.iter()));
    if !same {
      data.slots.insert(name, Slot::Many(order));
      self.touch(Dep::Field(holder, name));
    }
  }
}

// ─── Payload helpers ─────────────────────────────────────────────────────────

/// Expand a bare key value into an object for single-key models.
fn normalize(def: &ModelDef, payload: Value) -> Result<Map<String, Value>> {
  match payload {
    Value::Object(map) => Ok(map),
    Value::Null if def.is_singleton() => Ok(Map::new()),
    value => match def.id_fields() {
      [only] => {
        let mut map = Map::new();
        map.insert((*only).to_owned(), value);
        Ok(map)
      }
      [] => Err(Error::InvalidCommand(format!(
        "{}: singleton payload must be an object",
        def.name()
      ))),
      [first, ..] => Err(Error::MalformedIdentity {
        model: def.name().to_owned(),
        field: (*first).to_owned(),
        value,
      }),
    },
  }
}

fn id_value<'p>(def: &ModelDef, name: &str, payload: &'p Map<String, Value>) -> Result<&'p Value> {
  payload
    .get(name)
    .filter(|v| !v.is_null())
    .ok_or_else(|| Error::MissingIdentity {
      model: def.name().to_owned(),
      field: name.to_owned(),
    })
}

fn attr_key_part(def: &ModelDef, name: &str, value: &Value) -> Result<KeyPart> {
  KeyPart::from_json(value).ok_or_else(|| Error::MalformedIdentity {
    model: def.name().to_owned(),
    field: name.to_owned(),
    value: value.clone(),
  })
}

fn single_target_error(def: &ModelDef, field: &Field) -> Error {
  Error::InvalidCommand(format!("{}.{} holds a single record", def.name(), field.name()))
}
