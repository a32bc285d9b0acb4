//! Model definitions and the registry that maps model names to them.
//!
//! Feature modules register their models during startup. Registering a name
//! twice replaces the earlier definition; a module that wants to build on
//! another's model composes explicitly with [`ModelRegistry::extend`].

use indexmap::IndexMap;

use crate::{
  Error, Result,
  field::{Field, FieldKind},
};

/// Name of the built-in singleton model backing [`crate::Store::root`].
pub const ROOT_MODEL: &str = "Store";

// ─── ModelDef ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModelDef {
  name:   &'static str,
  id:     Vec<&'static str>,
  fields: IndexMap<&'static str, Field>,
}

impl ModelDef {
  /// A model with no fields. Without [`ModelDef::id`] it is a singleton.
  pub fn new(name: &'static str) -> Self {
    Self { name, id: Vec::new(), fields: IndexMap::new() }
  }

  /// Declare the identifying fields, in key order.
  pub fn id(mut self, fields: impl IntoIterator<Item = &'static str>) -> Self {
    self.id = fields.into_iter().collect();
    self
  }

  /// Add a field, replacing any earlier field of the same name.
  pub fn field(mut self, field: Field) -> Self {
    self.fields.insert(field.name, field);
    self
  }

  pub fn name(&self) -> &'static str { self.name }

  pub fn id_fields(&self) -> &[&'static str] { &self.id }

  pub fn is_singleton(&self) -> bool { self.id.is_empty() }

  pub fn get(&self, name: &str) -> Option<&Field> { self.fields.get(name) }

  pub fn fields(&self) -> impl Iterator<Item = &Field> { self.fields.values() }

  /// Look up a field, failing with [`Error::UnknownField`].
  pub fn require(&self, name: &str) -> Result<&Field> {
    self.fields.get(name).ok_or_else(|| Error::UnknownField {
      model: self.name.to_owned(),
      field: name.to_owned(),
    })
  }

  pub(crate) fn id_position(&self, field: &str) -> Option<usize> {
    self.id.iter().position(|f| *f == field)
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ModelRegistry {
  models: IndexMap<&'static str, ModelDef>,
}

impl Default for ModelRegistry {
  fn default() -> Self { Self::new() }
}

impl ModelRegistry {
  /// A registry holding only the root model.
  pub fn new() -> Self {
    let mut models = IndexMap::new();
    models.insert(ROOT_MODEL, ModelDef::new(ROOT_MODEL));
    Self { models }
  }

  /// Register `def` under its name. A previous definition is replaced, not
  /// merged.
  pub fn register(&mut self, def: ModelDef) -> &mut Self {
    let name = def.name;
    if self.models.insert(name, def).is_some() {
      tracing::debug!(model = name, "model definition overridden");
    }
    self
  }

  /// Replace the definition of `name` with `f` applied to the current one.
  pub fn extend(
    &mut self,
    name: &str,
    f: impl FnOnce(ModelDef) -> ModelDef,
  ) -> Result<&mut Self> {
    let current = self.require(name)?.clone();
    Ok(self.register(f(current)))
  }

  pub fn model(&self, name: &str) -> Option<&ModelDef> { self.models.get(name) }

  pub fn models(&self) -> impl Iterator<Item = &ModelDef> { self.models.values() }

  /// Look up a model, failing with [`Error::UnknownModel`].
  pub fn require(&self, name: &str) -> Result<&ModelDef> {
    self
      .models
      .get(name)
      .ok_or_else(|| Error::UnknownModel(name.to_owned()))
  }

  /// Check the registry is internally consistent: every relation target is
  /// registered, every inverse is symmetric, and identifying fields are
  /// usable as identity.
  pub fn verify(&self) -> Result<()> {
    let root = self.require(ROOT_MODEL)?;
    if !root.is_singleton() {
      return Err(Error::InvalidIdentityField {
        model:  ROOT_MODEL.to_owned(),
        field:  root.id[0].to_owned(),
        reason: "the root model is a singleton",
      });
    }

    for model in self.models() {
      for id in &model.id {
        let field = model.require(id)?;
        let reason = if field.is_computed() {
          Some("computed fields are not stored")
        } else if field.kind == FieldKind::Many {
          Some("collection relations have no single value")
        } else {
          None
        };
        if let Some(reason) = reason {
          return Err(Error::InvalidIdentityField {
            model: model.name.to_owned(),
            field: field.name.to_owned(),
            reason,
          });
        }
      }

      for field in model.fields() {
        self.verify_field(model, field)?;
      }
    }

    Ok(())
  }

  fn verify_field(&self, model: &ModelDef, field: &Field) -> Result<()> {
    if field.sort.is_some() && field.kind != FieldKind::Many {
      return Err(Error::KindMismatch {
        model:    model.name.to_owned(),
        field:    field.name.to_owned(),
        expected: FieldKind::Many.as_str(),
        actual:   field.kind.as_str(),
      });
    }

    let Some(target_name) = field.target else {
      return Ok(());
    };
    let target = self.require(target_name)?;

    let Some(inverse_name) = field.inverse else {
      return Ok(());
    };
    if field.is_computed() {
      return Err(Error::ComputedInverse {
        model: model.name.to_owned(),
        field: field.name.to_owned(),
      });
    }

    let inverse = target
      .get(inverse_name)
      .filter(|f| f.is_relation())
      .ok_or_else(|| Error::UnknownInverse {
        model:   model.name.to_owned(),
        field:   field.name.to_owned(),
        target:  target_name.to_owned(),
        inverse: inverse_name.to_owned(),
      })?;

    let points_back = inverse.target == Some(model.name)
      && inverse.inverse == Some(field.name)
      && !inverse.is_computed();
    if !points_back {
      return Err(Error::AsymmetricInverse {
        model:   model.name.to_owned(),
        field:   field.name.to_owned(),
        target:  target_name.to_owned(),
        inverse: inverse_name.to_owned(),
      });
    }

    Ok(())
  }
}
