//! Process-wide schema cache and per-model name overrides.
//!
//! Schemas are parsed once per model name and shared behind an `Arc`.
//! Connection and collection overrides are runtime redirections layered
//! over the annotation block, mainly for tests and multi-tenant setups;
//! both come with reset hooks.

use super::ModelSchema;
use crate::connections::DEFAULT_CONNECTION_NAME;
use crate::error::{CoreError, CoreResult};
use crate::model::Model;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

static SCHEMAS: RwLock<Option<HashMap<&'static str, Arc<ModelSchema>>>> = RwLock::new(None);
static CONNECTION_OVERRIDES: RwLock<Option<HashMap<String, String>>> = RwLock::new(None);
static COLLECTION_OVERRIDES: RwLock<Option<HashMap<String, String>>> = RwLock::new(None);

/// Returns the cached schema for a model, parsing it on first use.
///
/// # Errors
///
/// Returns [`CoreError::Schema`] when the model's annotation block is
/// malformed.
pub fn schema<M: Model>() -> CoreResult<Arc<ModelSchema>> {
    if let Some(cached) = SCHEMAS
        .read()
        .as_ref()
        .and_then(|map| map.get(M::NAME))
    {
        return Ok(Arc::clone(cached));
    }

    let parsed = Arc::new(ModelSchema::parse(M::NAME, M::SCHEMA)?);
    let mut guard = SCHEMAS.write();
    let map = guard.get_or_insert_with(HashMap::new);
    // First writer wins if two threads raced on the parse.
    Ok(Arc::clone(map.entry(M::NAME).or_insert(parsed)))
}

/// Resolves the collection name for a schema, override first.
///
/// # Errors
///
/// Returns [`CoreError::MissingCollection`] when neither an override nor
/// the annotation block names a collection.
pub fn collection_name(schema: &ModelSchema) -> CoreResult<String> {
    if let Some(name) = COLLECTION_OVERRIDES
        .read()
        .as_ref()
        .and_then(|map| map.get(schema.model()))
    {
        return Ok(name.clone());
    }
    schema
        .collection()
        .map(str::to_string)
        .ok_or_else(|| CoreError::MissingCollection {
            model: schema.model().to_string(),
        })
}

/// Resolves the connection name for a schema, override first, falling back
/// to [`DEFAULT_CONNECTION_NAME`].
#[must_use]
pub fn connection_name(schema: &ModelSchema) -> String {
    if let Some(name) = CONNECTION_OVERRIDES
        .read()
        .as_ref()
        .and_then(|map| map.get(schema.model()))
    {
        return name.clone();
    }
    schema
        .connection()
        .unwrap_or(DEFAULT_CONNECTION_NAME)
        .to_string()
}

/// Redirects a model to another connection for the rest of the process.
pub fn set_connection_override(model: &str, connection: impl Into<String>) {
    CONNECTION_OVERRIDES
        .write()
        .get_or_insert_with(HashMap::new)
        .insert(model.to_string(), connection.into());
}

/// Removes a model's connection override.
pub fn reset_connection_override(model: &str) {
    if let Some(map) = CONNECTION_OVERRIDES.write().as_mut() {
        map.remove(model);
    }
}

/// Redirects a model to another collection for the rest of the process.
pub fn set_collection_override(model: &str, collection: impl Into<String>) {
    COLLECTION_OVERRIDES
        .write()
        .get_or_insert_with(HashMap::new)
        .insert(model.to_string(), collection.into());
}

/// Removes a model's collection override.
pub fn reset_collection_override(model: &str) {
    if let Some(map) = COLLECTION_OVERRIDES.write().as_mut() {
        map.remove(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Registered;

    impl Model for Registered {
        const NAME: &'static str = "registry_tests::Registered";
        const SCHEMA: &'static str = "
            @collection registered
            @property integer id - unique
        ";
    }

    #[test]
    fn schema_is_cached_per_model() {
        let first = schema::<Registered>().unwrap();
        let second = schema::<Registered>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn overrides_layer_over_the_block() {
        struct Overridden;
        impl Model for Overridden {
            const NAME: &'static str = "registry_tests::Overridden";
            const SCHEMA: &'static str = "
                @collection originals
                @property integer id - unique
            ";
        }

        let parsed = schema::<Overridden>().unwrap();
        assert_eq!(collection_name(&parsed).unwrap(), "originals");
        assert_eq!(connection_name(&parsed), DEFAULT_CONNECTION_NAME);

        set_collection_override(Overridden::NAME, "replacements");
        set_connection_override(Overridden::NAME, "replica");
        assert_eq!(collection_name(&parsed).unwrap(), "replacements");
        assert_eq!(connection_name(&parsed), "replica");

        reset_collection_override(Overridden::NAME);
        reset_connection_override(Overridden::NAME);
        assert_eq!(collection_name(&parsed).unwrap(), "originals");
        assert_eq!(connection_name(&parsed), DEFAULT_CONNECTION_NAME);
    }

    #[test]
    fn missing_collection_is_a_first_use_error() {
        struct Uncollected;
        impl Model for Uncollected {
            const NAME: &'static str = "registry_tests::Uncollected";
            const SCHEMA: &'static str = "@property integer id - unique";
        }

        let parsed = schema::<Uncollected>().unwrap();
        let err = collection_name(&parsed).unwrap_err();
        assert!(matches!(err, CoreError::MissingCollection { .. }));
    }
}
