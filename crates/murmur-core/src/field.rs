//! Field descriptors: how the store's generic machinery treats each field.
//!
//! Declaring a field has no side effects. Relations name their target model
//! and, optionally, the inverse field on that model that the store keeps in
//! sync. Symmetry of inverses is checked when the registry is verified, not
//! here.

use std::{cmp::Ordering, fmt};

use indexmap::IndexSet;
use serde_json::Value;
use strum::{Display, IntoStaticStr};

use crate::{Result, record::RecordId, store::Store};

/// Derives a field value from other fields. Reads go through the store and are
/// tracked; the store passes only a shared reference, so a compute cannot
/// mutate the graph.
pub type ComputeFn = fn(&Store, RecordId) -> Result<Computed>;

/// Orders the members of a `many` field. Applied whenever membership changes.
pub type SortFn = fn(&Store, RecordId, RecordId) -> Ordering;

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
  /// A scalar value.
  Attr,
  /// Zero or one reference to another record.
  One,
  /// An ordered, deduplicated set of references.
  Many,
}

impl FieldKind {
  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Computed ────────────────────────────────────────────────────────────────

/// The output of a [`ComputeFn`]; must match the field's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Computed {
  Attr(Value),
  One(Option<RecordId>),
  Many(Vec<RecordId>),
}

impl Computed {
  pub fn attr(value: impl Into<Value>) -> Self { Self::Attr(value.into()) }

  pub fn one(record: Option<RecordId>) -> Self { Self::One(record) }

  pub fn many(records: impl IntoIterator<Item = RecordId>) -> Self {
    Self::Many(records.into_iter().collect())
  }

  pub(crate) fn kind(&self) -> FieldKind {
    match self {
      Self::Attr(_) => FieldKind::Attr,
      Self::One(_) => FieldKind::One,
      Self::Many(_) => FieldKind::Many,
    }
  }
}

// ─── Slot ────────────────────────────────────────────────────────────────────

/// Stored (or memoised) value of one field on one record.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
  Attr(Value),
  One(Option<RecordId>),
  Many(IndexSet<RecordId>),
}

impl Slot {
  pub(crate) fn empty(field: &Field) -> Self {
    match field.kind {
      FieldKind::Attr => Self::Attr(field.default.clone().unwrap_or(Value::Null)),
      FieldKind::One => Self::One(None),
      FieldKind::Many => Self::Many(IndexSet::new()),
    }
  }

  /// Every record this slot references.
  pub(crate) fn targets(&self) -> Vec<RecordId> {
    match self {
      Self::Attr(_) => Vec::new(),
      Self::One(r) => r.iter().copied().collect(),
      Self::Many(set) => set.iter().copied().collect(),
    }
  }

  pub(crate) fn contains(&self, record: RecordId) -> bool {
    match self {
      Self::Attr(_) => false,
      Self::One(r) => *r == Some(record),
      Self::Many(set) => set.contains(&record),
    }
  }
}

impl From<Computed> for Slot {
  fn from(c: Computed) -> Self {
    match c {
      Computed::Attr(v) => Self::Attr(v),
      Computed::One(r) => Self::One(r),
      Computed::Many(v) => Self::Many(v.into_iter().collect()),
    }
  }
}

// ─── Field ───────────────────────────────────────────────────────────────────

/// Declaration of a single field on a model.
#[derive(Clone)]
pub struct Field {
  pub(crate) name:    &'static str,
  pub(crate) kind:    FieldKind,
  pub(crate) target:  Option<&'static str>,
  pub(crate) inverse: Option<&'static str>,
  pub(crate) compute: Option<ComputeFn>,
  pub(crate) default: Option<Value>,
  pub(crate) sort:    Option<SortFn>,
}

impl Field {
  fn new(name: &'static str, kind: FieldKind, target: Option<&'static str>) -> Self {
    Self {
      name,
      kind,
      target,
      inverse: None,
      compute: None,
      default: None,
      sort: None,
    }
  }

  /// A scalar attribute.
  pub fn attr(name: &'static str) -> Self { Self::new(name, FieldKind::Attr, None) }

  /// A single relation to `target`.
  pub fn one(name: &'static str, target: &'static str) -> Self {
    Self::new(name, FieldKind::One, Some(target))
  }

  /// A collection relation to `target`.
  pub fn many(name: &'static str, target: &'static str) -> Self {
    Self::new(name, FieldKind::Many, Some(target))
  }

  /// The field on the target model that mirrors this one.
  pub fn inverse(mut self, inverse: &'static str) -> Self {
    self.inverse = Some(inverse);
    self
  }

  pub fn compute(mut self, compute: ComputeFn) -> Self {
    self.compute = Some(compute);
    self
  }

  /// Initial value of an attribute on record creation.
  pub fn default(mut self, value: impl Into<Value>) -> Self {
    self.default = Some(value.into());
    self
  }

  pub fn sort(mut self, sort: SortFn) -> Self {
    self.sort = Some(sort);
    self
  }

  pub fn name(&self) -> &'static str { self.name }

  pub fn kind(&self) -> FieldKind { self.kind }

  pub fn target(&self) -> Option<&'static str> { self.target }

  pub fn inverse_name(&self) -> Option<&'static str> { self.inverse }

  pub fn is_computed(&self) -> bool { self.compute.is_some() }

  pub fn is_relation(&self) -> bool { self.kind != FieldKind::Attr }
}

impl fmt::Debug for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Field")
      .field("name", &self.name)
      .field("kind", &self.kind)
      .field("target", &self.target)
      .field("inverse", &self.inverse)
      .field("computed", &self.compute.is_some())
      .field("default", &self.default)
      .field("sorted", &self.sort.is_some())
      .finish()
  }
}
