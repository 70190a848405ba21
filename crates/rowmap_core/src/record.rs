//! Record state: schema-ordered values with dirty tracking.

use crate::error::{CoreError, CoreResult};
use crate::model::Model;
use crate::schema::{self, ModelSchema, PropertySpec};
use crate::validate::validate;
use rowmap_storage::{PropertyType, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// One record of a model: schema-ordered values plus a modified flag.
///
/// All property access is table-driven through the schema's name index;
/// `set` validates against the declared type and marks the record modified
/// only when the stored value actually changed.
pub struct Record<M: Model> {
    schema: Arc<ModelSchema>,
    values: Vec<Value>,
    modified: bool,
    _marker: PhantomData<M>,
}

impl<M: Model> Record<M> {
    /// Creates a record with every property at its schema default.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] when the model's annotation block is
    /// malformed.
    pub fn new() -> CoreResult<Self> {
        let schema = schema::schema::<M>()?;
        let values = schema
            .properties()
            .iter()
            .map(|spec| spec.default.clone())
            .collect();
        Ok(Self {
            schema,
            values,
            modified: false,
            _marker: PhantomData,
        })
    }

    /// Builds a record directly from schema-ordered values, bypassing
    /// validation. Used by row rehydration.
    pub(crate) fn from_raw(schema: Arc<ModelSchema>, values: Vec<Value>) -> Self {
        Self {
            schema,
            values,
            modified: false,
            _marker: PhantomData,
        }
    }

    /// The record's parsed schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    fn spec(&self, property: &str) -> CoreResult<(usize, &PropertySpec)> {
        self.schema
            .index_of(property)
            .map(|i| (i, &self.schema.properties()[i]))
            .ok_or_else(|| CoreError::unknown_property(property))
    }

    /// Reads a property value.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProperty`] for undeclared names.
    pub fn get(&self, property: &str) -> CoreResult<&Value> {
        let (index, _) = self.spec(property)?;
        Ok(&self.values[index])
    }

    /// Writes a property value after validating it.
    ///
    /// The modified flag is raised only when the new value differs from the
    /// stored one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProperty`] for undeclared names,
    /// [`CoreError::TypeMismatch`] or [`CoreError::Range`] for values the
    /// declared type rejects.
    pub fn set(&mut self, property: &str, value: impl Into<Value>) -> CoreResult<()> {
        let value = value.into();
        let (index, spec) = self.spec(property)?;
        validate(spec, &value)?;
        if self.values[index] != value {
            self.values[index] = value;
            self.modified = true;
        }
        Ok(())
    }

    /// Whether any `set` changed a value since construction or the last
    /// successful save.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Property names in declaration order.
    #[must_use]
    pub fn list_property_names(&self) -> Vec<&str> {
        self.schema
            .properties()
            .iter()
            .map(|spec| spec.name.as_str())
            .collect()
    }

    /// Field aliases in declaration order.
    #[must_use]
    pub fn list_field_names(&self) -> Vec<&str> {
        self.schema
            .properties()
            .iter()
            .map(|spec| spec.field.as_str())
            .collect()
    }

    /// The storage-side field alias of a property.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProperty`] for undeclared names.
    pub fn property_alias(&self, property: &str) -> CoreResult<&str> {
        let (_, spec) = self.spec(property)?;
        Ok(&spec.field)
    }

    /// The property a storage-side field alias maps back to.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnmappedField`] when no property declares the
    /// alias.
    pub fn field_property(&self, field: &str) -> CoreResult<&str> {
        self.schema
            .property_by_field(field)
            .map(|spec| spec.name.as_str())
            .ok_or_else(|| CoreError::UnmappedField {
                field: field.to_string(),
            })
    }

    /// Whether a property takes part in the unique criteria.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProperty`] for undeclared names.
    pub fn is_unique(&self, property: &str) -> CoreResult<bool> {
        let (_, spec) = self.spec(property)?;
        Ok(spec.unique)
    }

    /// Whether a property must hold a non-null value at persistence time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProperty`] for undeclared names.
    pub fn must_persist_non_null(&self, property: &str) -> CoreResult<bool> {
        let (_, spec) = self.spec(property)?;
        Ok(!spec.nullable)
    }

    /// A property's schema default.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProperty`] for undeclared names.
    pub fn default_value(&self, property: &str) -> CoreResult<&Value> {
        let (_, spec) = self.spec(property)?;
        Ok(&spec.default)
    }

    /// A property's declared type.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownProperty`] for undeclared names.
    pub fn property_type(&self, property: &str) -> CoreResult<&PropertyType> {
        let (_, spec) = self.spec(property)?;
        Ok(&spec.ty)
    }

    /// Property name → coerced value map, in name order.
    ///
    /// Values are coerced to their declared type the way backends receive
    /// them; date-times stay date-times.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.schema
            .properties()
            .iter()
            .zip(&self.values)
            .map(|(spec, value)| (spec.name.clone(), coerce(spec, value)))
            .collect()
    }

    pub(crate) fn coerced_value(&self, index: usize) -> Value {
        coerce(&self.schema.properties()[index], &self.values[index])
    }
}

/// Coerces a stored value to its declared type for persistence.
pub(crate) fn coerce(spec: &PropertySpec, value: &Value) -> Value {
    match &spec.ty {
        PropertyType::Integer => value
            .as_integer()
            .map_or_else(|| value.clone(), Value::Integer),
        PropertyType::Float => value.as_float().map_or_else(|| value.clone(), Value::Float),
        PropertyType::String => value.as_text().map_or_else(|| value.clone(), Value::Text),
        _ => value.clone(),
    }
}

impl<M: Model> fmt::Display for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (spec, value)) in self.schema.properties().iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} => {}", spec.name, value)?;
        }
        Ok(())
    }
}

impl<M: Model> Clone for Record<M> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            values: self.values.clone(),
            modified: self.modified,
            _marker: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &M::NAME)
            .field("values", &self.values)
            .field("modified", &self.modified)
            .finish()
    }
}
