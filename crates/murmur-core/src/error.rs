//! Error types for `murmur-core`.
//!
//! Every variant is a programming error in the caller's data contract: the
//! store never swallows them, and feature code is expected to surface a
//! user-facing message of its own.

use strum::Display;
use thiserror::Error;

use crate::record::RecordId;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
  Identity,
  Schema,
  Model,
  Runtime,
}

#[derive(Debug, Error)]
pub enum Error {
  // ── Identity ────────────────────────────────────────────────────────────
  #[error("{model}: payload is missing identifying field `{field}`")]
  MissingIdentity { model: String, field: String },

  #[error("{model}: identifying field `{field}` has malformed value {value}")]
  MalformedIdentity {
    model: String,
    field: String,
    value: serde_json::Value,
  },

  #[error("{model}: another record already has key {key}")]
  DuplicateIdentity { model: String, key: String },

  // ── Schema ──────────────────────────────────────────────────────────────
  #[error("unknown field `{field}` on model {model}")]
  UnknownField { model: String, field: String },

  #[error("{model}.{field}: inverse `{inverse}` is not a relation on {target}")]
  UnknownInverse {
    model:   String,
    field:   String,
    target:  String,
    inverse: String,
  },

  #[error("{model}.{field}: inverse {target}.{inverse} does not point back")]
  AsymmetricInverse {
    model:   String,
    field:   String,
    target:  String,
    inverse: String,
  },

  #[error("{model}.{field} is computed and cannot be assigned")]
  ComputedAssignment { model: String, field: String },

  #[error("{model}.{field} is computed and cannot declare an inverse")]
  ComputedInverse { model: String, field: String },

  #[error("{model}.{field} cannot identify records: {reason}")]
  InvalidIdentityField {
    model:  String,
    field:  String,
    reason: &'static str,
  },

  #[error("{model}.{field} is a `{actual}` field, expected `{expected}`")]
  KindMismatch {
    model:    String,
    field:    String,
    expected: &'static str,
    actual:   &'static str,
  },

  #[error("{model}.{field} targets {expected}, got a {actual} record")]
  TargetMismatch {
    model:    String,
    field:    String,
    expected: String,
    actual:   String,
  },

  #[error("invalid relation command: {0}")]
  InvalidCommand(String),

  // ── Model ───────────────────────────────────────────────────────────────
  #[error("unknown model: {0}")]
  UnknownModel(String),

  // ── Runtime ─────────────────────────────────────────────────────────────
  #[error("record not found: {0}")]
  RecordNotFound(RecordId),

  #[error("the root store record cannot be deleted")]
  RootDeletion,

  #[error("{model}.{field} depends on itself")]
  ComputeCycle { model: String, field: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn class(&self) -> ErrorClass {
    match self {
      Self::MissingIdentity { .. }
      | Self::MalformedIdentity { .. }
      | Self::DuplicateIdentity { .. } => ErrorClass::Identity,
      Self::UnknownField { .. }
      | Self::UnknownInverse { .. }
      | Self::AsymmetricInverse { .. }
      | Self::ComputedAssignment { .. }
      | Self::ComputedInverse { .. }
      | Self::InvalidIdentityField { .. }
      | Self::KindMismatch { .. }
      | Self::TargetMismatch { .. }
      | Self::InvalidCommand(_) => ErrorClass::Schema,
      Self::UnknownModel(_) => ErrorClass::Model,
      Self::RecordNotFound(_)
      | Self::RootDeletion
      | Self::ComputeCycle { .. }
      | Self::Serialization(_) => ErrorClass::Runtime,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
