//! Error types for the mapping core.

use rowmap_storage::StorageError;
use thiserror::Error;

/// Result type for mapping operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the mapping core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A schema annotation block could not be parsed.
    #[error("invalid schema for model {model}: {message}")]
    Schema {
        /// Model name.
        model: String,
        /// What was wrong with the annotation block.
        message: String,
    },

    /// A value's shape does not satisfy a property's declared type.
    #[error("value of type {actual} is not valid for {property} of type {expected}")]
    TypeMismatch {
        /// Property name.
        property: String,
        /// Declared type.
        expected: String,
        /// Runtime shape of the rejected value.
        actual: String,
    },

    /// A value exceeds a property's declared size bound.
    #[error("value of length {length} exceeds size {size} of property {property}")]
    Range {
        /// Property name.
        property: String,
        /// Declared maximum serialized length.
        size: u32,
        /// Serialized length of the rejected value.
        length: usize,
    },

    /// A property name not declared by the schema.
    #[error("unknown property: {property}")]
    UnknownProperty {
        /// The undeclared name.
        property: String,
    },

    /// A fetched row carried a field no property maps to.
    #[error("no property maps to field: {field}")]
    UnmappedField {
        /// The unmapped storage-side field name.
        field: String,
    },

    /// A non-nullable property was null at persistence time.
    #[error("property {property} must not be null")]
    NullPersistence {
        /// Property name.
        property: String,
    },

    /// A model declared no collection and none was set at runtime.
    #[error("model {model} has no collection name")]
    MissingCollection {
        /// Model name.
        model: String,
    },

    /// A request that cannot be carried out as configured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the misconfiguration.
        message: String,
    },

    /// A connection name with no registered storage backend.
    #[error("no storage registered for connection: {connection}")]
    UnknownConnection {
        /// The unregistered connection name.
        connection: String,
    },

    /// A storage backend failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl CoreError {
    /// Creates a schema parse error.
    pub fn schema(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown property error.
    pub fn unknown_property(property: impl Into<String>) -> Self {
        Self::UnknownProperty {
            property: property.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
