//! Change sets and relation commands.
//!
//! A [`Changes`] value is the validated, typed form of an update. Server
//! payloads are converted into one by [`Changes::from_payload`]; in-process
//! callers build one directly.
//!
//! Relational payload forms accepted for a field:
//!
//! | Payload | `one` field | `many` field |
//! |---------|-------------|--------------|
//! | `null` | clear | clear |
//! | object or bare key | link (inserting the target) | replace with that record |
//! | `[record, ...]` | error | replace with exactly these |
//! | `[["add", ...], ...]` | commands | commands |

use std::str::FromStr;

use serde_json::{Map, Value};
use strum::EnumString;

use crate::{
  Error, Result,
  field::{Field, FieldKind},
  model::ModelDef,
  record::RecordId,
};

// ─── Targets ─────────────────────────────────────────────────────────────────

/// A record referenced by a relational change: either an existing handle or
/// payload data to insert into (or look up in) the target model.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
  Record(RecordId),
  Data(Value),
}

impl From<RecordId> for Target {
  fn from(r: RecordId) -> Self { Self::Record(r) }
}

impl From<Value> for Target {
  fn from(v: Value) -> Self { Self::Data(v) }
}

// ─── RelationCommand ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
enum Op {
  Add,
  Remove,
  Replace,
  Clear,
  Delete,
}

/// How to apply a relational update.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationCommand {
  /// Link each target (inserting payload targets).
  Add(Vec<Target>),
  /// Unlink each target that is currently linked; unknown targets are ignored.
  Remove(Vec<Target>),
  /// Make the relation hold exactly these targets, in this order.
  Replace(Vec<Target>),
  /// Unlink everything.
  Clear,
  /// Unlink and delete each target record.
  Delete(Vec<Target>),
}

impl RelationCommand {
  pub fn add(targets: impl IntoIterator<Item = impl Into<Target>>) -> Self {
    Self::Add(targets.into_iter().map(Into::into).collect())
  }

  pub fn remove(targets: impl IntoIterator<Item = impl Into<Target>>) -> Self {
    Self::Remove(targets.into_iter().map(Into::into).collect())
  }

  pub fn replace(targets: impl IntoIterator<Item = impl Into<Target>>) -> Self {
    Self::Replace(targets.into_iter().map(Into::into).collect())
  }

  pub fn delete(targets: impl IntoIterator<Item = impl Into<Target>>) -> Self {
    Self::Delete(targets.into_iter().map(Into::into).collect())
  }

  /// Parse a command tuple such as `["add", {...}]`, `["remove", [1, 2]]` or
  /// `["clear"]`.
  pub fn from_json(value: &Value) -> Result<Self> {
    let Value::Array(parts) = value else {
      return Err(Error::InvalidCommand(format!("expected [op, records], got {value}")));
    };
    let Some((op, rest)) = parts.split_first() else {
      return Err(Error::InvalidCommand("empty command".into()));
    };
    let op = op
      .as_str()
      .and_then(|s| Op::from_str(s).ok())
      .ok_or_else(|| Error::InvalidCommand(format!("unknown operation {op}")))?;

    match op {
      Op::Clear if rest.is_empty() => Ok(Self::Clear),
      Op::Clear => Err(Error::InvalidCommand("`clear` takes no records".into())),
      Op::Add => Ok(Self::Add(command_targets(op, rest)?)),
      Op::Remove => Ok(Self::Remove(command_targets(op, rest)?)),
      Op::Replace => Ok(Self::Replace(command_targets(op, rest)?)),
      Op::Delete => Ok(Self::Delete(command_targets(op, rest)?)),
    }
  }
}

fn command_targets(op: Op, rest: &[Value]) -> Result<Vec<Target>> {
  match rest {
    [Value::Array(items)] => Ok(items.iter().cloned().map(Target::Data).collect()),
    [single] => Ok(vec![Target::Data(single.clone())]),
    [] => Err(Error::InvalidCommand(format!("`{op:?}` needs records"))),
    _ => Err(Error::InvalidCommand(format!(
      "`{op:?}` takes a single record or a list"
    ))),
  }
}

// ─── Changes ─────────────────────────────────────────────────────────────────

/// A change to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
  /// Assign an attribute.
  Set(Value),
  /// Point a `one` field at a target, or clear it.
  Link(Option<Target>),
  /// Apply relation commands in order.
  Commands(Vec<RelationCommand>),
}

/// An ordered set of field changes for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
  entries: Vec<(String, Change)>,
}

impl Changes {
  pub fn new() -> Self { Self::default() }

  pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.entries.push((field.into(), Change::Set(value.into())));
    self
  }

  pub fn link(mut self, field: impl Into<String>, target: impl Into<Target>) -> Self {
    self.entries.push((field.into(), Change::Link(Some(target.into()))));
    self
  }

  pub fn clear(mut self, field: impl Into<String>) -> Self {
    self.entries.push((field.into(), Change::Commands(vec![RelationCommand::Clear])));
    self
  }

  /// Append a relation command; consecutive commands on the same field are
  /// grouped.
  pub fn command(mut self, field: impl Into<String>, command: RelationCommand) -> Self {
    let field = field.into();
    match self.entries.last_mut() {
      Some((name, Change::Commands(cmds))) if *name == field => cmds.push(command),
      _ => self.entries.push((field, Change::Commands(vec![command]))),
    }
    self
  }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
    self.entries.iter().map(|(f, c)| (f.as_str(), c))
  }

  pub(crate) fn into_entries(self) -> Vec<(String, Change)> { self.entries }

  /// Convert a server payload into changes for `model`, validating every field
  /// before anything is written.
  pub fn from_payload(model: &ModelDef, payload: &Map<String, Value>) -> Result<Self> {
    let mut entries = Vec::with_capacity(payload.len());
    for (name, value) in payload {
      let field = assignable(model, name)?;
      let change = match field.kind() {
        FieldKind::Attr => Change::Set(value.clone()),
        FieldKind::One => one_change(model, field, value)?,
        FieldKind::Many => Change::Commands(many_commands(value)?),
      };
      entries.push((field.name().to_owned(), change));
    }
    Ok(Self { entries })
  }

  /// Check every change names an assignable field of a matching kind.
  pub fn validate(&self, model: &ModelDef) -> Result<()> {
    for (name, change) in &self.entries {
      let field = assignable(model, name)?;
      let ok = match change {
        Change::Set(_) => field.kind() == FieldKind::Attr,
        Change::Link(_) => field.kind() == FieldKind::One,
        Change::Commands(_) => field.is_relation(),
      };
      if !ok {
        let expected = match change {
          Change::Set(_) => FieldKind::Attr.as_str(),
          Change::Link(_) => FieldKind::One.as_str(),
          Change::Commands(_) => "relation",
        };
        return Err(Error::KindMismatch {
          model: model.name().to_owned(),
          field: name.clone(),
          expected,
          actual: field.kind().as_str(),
        });
      }
    }
    Ok(())
  }
}

fn assignable<'m>(model: &'m ModelDef, name: &str) -> Result<&'m Field> {
  let field = model.require(name)?;
  if field.is_computed() {
    return Err(Error::ComputedAssignment {
      model: model.name().to_owned(),
      field: name.to_owned(),
    });
  }
  Ok(field)
}

fn is_command_list(items: &[Value]) -> bool {
  !items.is_empty() && items.iter().all(Value::is_array)
}

fn parse_commands(items: &[Value]) -> Result<Vec<RelationCommand>> {
  items.iter().map(RelationCommand::from_json).collect()
}

fn one_change(model: &ModelDef, field: &Field, value: &Value) -> Result<Change> {
  match value {
    Value::Null => Ok(Change::Link(None)),
    Value::Array(items) if is_command_list(items) => {
      Ok(Change::Commands(parse_commands(items)?))
    }
    Value::Array(_) => Err(Error::InvalidCommand(format!(
      "{}.{} holds a single record",
      model.name(),
      field.name()
    ))),
    other => Ok(Change::Link(Some(Target::Data(other.clone())))),
  }
}

fn many_commands(value: &Value) -> Result<Vec<RelationCommand>> {
  match value {
    Value::Null => Ok(vec![RelationCommand::Clear]),
    Value::Array(items) if is_command_list(items) => parse_commands(items),
    Value::Array(items) if items.iter().any(Value::is_array) => Err(
      Error::InvalidCommand("cannot mix commands and records in one list".into()),
    ),
    Value::Array(items) => Ok(vec![RelationCommand::Replace(
      items.iter().cloned().map(Target::Data).collect(),
    )]),
    other => Ok(vec![RelationCommand::Replace(vec![Target::Data(other.clone())])]),
  }
}
