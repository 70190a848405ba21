//! Model schemas parsed from annotation blocks.

mod parse;
mod registry;

pub use registry::{
    collection_name, connection_name, reset_collection_override, reset_connection_override,
    schema, set_collection_override, set_connection_override,
};

use rowmap_storage::{PropertyType, Value};
use std::collections::HashMap;

/// One parsed property declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    /// Property name.
    pub name: String,
    /// Declared type.
    pub ty: PropertyType,
    /// Storage-side field alias; equals `name` unless an alias was declared.
    pub field: String,
    /// Maximum serialized length, where declared.
    pub size: Option<u32>,
    /// Default value assigned at construction.
    pub default: Value,
    /// Whether null is acceptable at persistence time.
    pub nullable: bool,
    /// Whether the property takes part in the record's unique criteria.
    pub unique: bool,
}

/// An immutable per-model schema.
///
/// Holds the ordered property list plus name and field-alias indexes.
/// Built once per model and shared behind an `Arc` from the process-wide
/// registry.
#[derive(Debug)]
pub struct ModelSchema {
    model: String,
    collection: Option<String>,
    connection: Option<String>,
    properties: Vec<PropertySpec>,
    by_name: HashMap<String, usize>,
    by_field: HashMap<String, usize>,
}

impl ModelSchema {
    fn build(
        model: String,
        collection: Option<String>,
        connection: Option<String>,
        properties: Vec<PropertySpec>,
    ) -> Self {
        let by_name = properties
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.name.clone(), i))
            .collect();
        let by_field = properties
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.field.clone(), i))
            .collect();
        Self {
            model,
            collection,
            connection,
            properties,
            by_name,
            by_field,
        }
    }

    /// The model name this schema was parsed for.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The declared collection name, if any.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// The declared connection name, if any.
    #[must_use]
    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// The properties in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    /// Index of a property by name.
    #[must_use]
    pub fn index_of(&self, property: &str) -> Option<usize> {
        self.by_name.get(property).copied()
    }

    /// Index of a property by its field alias.
    #[must_use]
    pub fn index_by_field(&self, field: &str) -> Option<usize> {
        self.by_field.get(field).copied()
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, property: &str) -> Option<&PropertySpec> {
        self.index_of(property).map(|i| &self.properties[i])
    }

    /// Looks up a property by its field alias.
    #[must_use]
    pub fn property_by_field(&self, field: &str) -> Option<&PropertySpec> {
        self.index_by_field(field).map(|i| &self.properties[i])
    }
}
