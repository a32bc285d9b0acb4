//! Core of the murmur record graph.
//!
//! A [`Store`] holds every record of every registered model. Records are
//! addressed by [`RecordId`] and found by identifying key; relations keep their
//! declared inverses in sync; computed fields are memoised and recomputed
//! lazily after any field they read changes.
//!
//! This crate has no I/O and no async. Feature services feed it server
//! payloads through [`Store::insert`] and [`Store::update`].

pub mod command;
pub mod error;
pub mod field;
pub mod model;
pub mod record;
pub mod store;
mod tracking;

pub use command::{Change, Changes, RelationCommand, Target};
pub use error::{Error, ErrorClass, Result};
pub use field::{ComputeFn, Computed, Field, FieldKind, SortFn};
pub use model::{ModelDef, ModelRegistry, ROOT_MODEL};
pub use record::{Key, KeyPart, RecordId};
pub use store::Store;
pub use tracking::ObserverId;

#[cfg(test)]
mod tests;
