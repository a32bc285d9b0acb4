//! Record identity: handles and identifying keys.
//!
//! A [`RecordId`] is the only way to address a record in the graph. Two
//! handles are equal exactly when they name the same record; the store never
//! compares records by value.

use std::fmt;

use serde_json::Value;

// ─── RecordId ────────────────────────────────────────────────────────────────

/// An opaque, copyable handle to a record owned by a [`crate::Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
  pub(crate) fn new(raw: u64) -> Self { Self(raw) }

  /// The store-local sequence number behind this handle.
  pub fn raw(self) -> u64 { self.0 }

  /// Whether this record is one of `records`, by identity.
  pub fn is_in<'a>(self, records: impl IntoIterator<Item = &'a RecordId>) -> bool {
    records.into_iter().any(|r| *r == self)
  }

  /// Whether this record is absent from `records`, by identity.
  pub fn is_not_in<'a>(
    self,
    records: impl IntoIterator<Item = &'a RecordId>,
  ) -> bool {
    !self.is_in(records)
  }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "record#{}", self.0)
  }
}

// ─── Key ─────────────────────────────────────────────────────────────────────

/// One component of an identifying key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
  Int(i64),
  Str(String),
  Bool(bool),
  /// The value of a `one` relation used as (part of) the identity.
  Record(RecordId),
}

impl KeyPart {
  /// Convert a scalar payload value. Floats, arrays, objects and `null` have no
  /// stable identity and yield `None`.
  pub fn from_json(value: &Value) -> Option<Self> {
    match value {
      Value::Number(n) => n.as_i64().map(Self::Int),
      Value::String(s) => Some(Self::Str(s.clone())),
      Value::Bool(b) => Some(Self::Bool(*b)),
      _ => None,
    }
  }

  /// The payload value of a scalar part; `None` for record parts.
  pub fn to_json(&self) -> Option<Value> {
    match self {
      Self::Int(i) => Some(Value::from(*i)),
      Self::Str(s) => Some(Value::from(s.as_str())),
      Self::Bool(b) => Some(Value::from(*b)),
      Self::Record(_) => None,
    }
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(i) => write!(f, "{i}"),
      Self::Str(s) => write!(f, "{s:?}"),
      Self::Bool(b) => write!(f, "{b}"),
      Self::Record(r) => write!(f, "{r}"),
    }
  }
}

/// The tuple of identifying field values of a record, in declaration order.
/// Singleton models have the empty key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Key(Vec<KeyPart>);

impl Key {
  pub fn new(parts: Vec<KeyPart>) -> Self { Self(parts) }

  pub fn parts(&self) -> &[KeyPart] { &self.0 }

  /// A copy of this key with the part at `index` replaced.
  pub(crate) fn with_part(&self, index: usize, part: KeyPart) -> Self {
    let mut parts = self.0.clone();
    parts[index] = part;
    Self(parts)
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("(")?;
    for (i, part) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{part}")?;
    }
    f.write_str(")")
  }
}
