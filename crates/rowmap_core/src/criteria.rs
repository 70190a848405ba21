//! Criteria building and payload hydration for records.

use crate::error::{CoreError, CoreResult};
use crate::model::Model;
use crate::record::Record;
use crate::schema::ModelSchema;
use rowmap_storage::{Condition, Criterion, Payload, PayloadField, Value};

/// Resolves a property name to its storage-side field alias.
///
/// # Errors
///
/// Returns [`CoreError::UnknownProperty`] for undeclared names.
pub(crate) fn resolve_field(schema: &ModelSchema, property: &str) -> CoreResult<String> {
    schema
        .property(property)
        .map(|spec| spec.field.clone())
        .ok_or_else(|| CoreError::unknown_property(property))
}

/// Builds an equality criteria list from property/value pairs, resolving
/// property names to field aliases.
///
/// # Errors
///
/// Returns [`CoreError::UnknownProperty`] for undeclared names.
pub fn criteria_from_pairs(
    schema: &ModelSchema,
    pairs: &[(&str, Value)],
) -> CoreResult<Vec<Criterion>> {
    pairs
        .iter()
        .map(|(property, value)| {
            Ok(Criterion::equals(
                resolve_field(schema, property)?,
                value.clone(),
            ))
        })
        .collect()
}

/// Resolves a criteria list given in property terms to field terms.
///
/// # Errors
///
/// Returns [`CoreError::UnknownProperty`] for undeclared names.
pub fn resolve_criteria(
    schema: &ModelSchema,
    criteria: &[(&str, Condition, Value)],
) -> CoreResult<Vec<Criterion>> {
    criteria
        .iter()
        .map(|(property, condition, value)| {
            Ok(Criterion::new(
                resolve_field(schema, property)?,
                *condition,
                value.clone(),
            ))
        })
        .collect()
}

impl<M: Model> Record<M> {
    /// Builds the write payload: every property's field alias, declared
    /// type and coerced value, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NullPersistence`] when a not-null property
    /// holds null and the payload is not for an insert. Inserts are exempt
    /// so a store-generated identity can stay unset.
    pub fn hydrate(&self, for_insert: bool) -> CoreResult<Payload> {
        let mut payload = Vec::with_capacity(self.schema().properties().len());
        for (index, spec) in self.schema().properties().iter().enumerate() {
            let value = self.coerced_value(index);
            if value.is_null() && !spec.nullable && !for_insert {
                return Err(CoreError::NullPersistence {
                    property: spec.name.clone(),
                });
            }
            payload.push(PayloadField {
                field: spec.field.clone(),
                ty: spec.ty.clone(),
                value,
            });
        }
        Ok(payload)
    }

    /// One equality criterion per unique property with its current value.
    ///
    /// A null value stays in the list; it signals an identity not assigned
    /// yet and is interpreted by [`Record::exists`].
    #[must_use]
    pub fn unique_criteria(&self) -> Vec<Criterion> {
        self.schema()
            .properties()
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.unique)
            .map(|(index, spec)| Criterion::equals(spec.field.clone(), self.coerced_value(index)))
            .collect()
    }
}
