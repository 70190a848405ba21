//! Active-record persistence operations.

use crate::connections;
use crate::criteria::criteria_from_pairs;
use crate::error::{CoreError, CoreResult};
use crate::model::Model;
use crate::query::Query;
use crate::record::Record;
use crate::schema;
use rowmap_storage::{Criterion, Value};

impl<M: Model> Record<M> {
    /// The collection this record persists to, override first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingCollection`] when neither an override
    /// nor the annotation block names one.
    pub fn collection_name(&self) -> CoreResult<String> {
        schema::collection_name(self.schema())
    }

    /// The connection this record persists through, override first.
    #[must_use]
    pub fn connection_name(&self) -> String {
        schema::connection_name(self.schema())
    }

    /// Redirects this model to another collection for the rest of the
    /// process.
    pub fn set_collection_name(collection: impl Into<String>) {
        schema::set_collection_override(M::NAME, collection);
    }

    /// Removes this model's collection override.
    pub fn reset_collection_name() {
        schema::reset_collection_override(M::NAME);
    }

    /// Redirects this model to another connection for the rest of the
    /// process.
    pub fn set_connection_name(connection: impl Into<String>) {
        schema::set_connection_override(M::NAME, connection);
    }

    /// Removes this model's connection override.
    pub fn reset_connection_name() {
        schema::reset_connection_override(M::NAME);
    }

    /// Saves the record: a no-op unless modified, an insert when no stored
    /// record matches the unique criteria, an update otherwise.
    ///
    /// Clears the modified flag on success. Returns the backend-generated
    /// identity when the save inserted and the backend produces one.
    ///
    /// # Errors
    ///
    /// Propagates hydration, configuration and storage failures.
    pub fn save(&mut self) -> CoreResult<Option<i64>> {
        if !self.is_modified() {
            return Ok(None);
        }
        let generated = if self.exists()? {
            self.update()?;
            None
        } else {
            self.insert()?
        };
        self.clear_modified();
        Ok(generated)
    }

    /// Inserts the record unconditionally.
    ///
    /// # Errors
    ///
    /// Propagates hydration, configuration and storage failures.
    pub fn insert(&self) -> CoreResult<Option<i64>> {
        let payload = self.hydrate(true)?;
        let collection = self.collection_name()?;
        let handle = connections::storage(&self.connection_name())?;
        let generated = handle.lock().insert(&collection, &payload)?;
        tracing::debug!(model = M::NAME, collection, "inserted record");
        Ok(generated)
    }

    /// Updates the stored record matching the unique criteria.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] when the schema declares no
    /// unique properties; propagates hydration and storage failures.
    pub fn update(&self) -> CoreResult<()> {
        let criteria = self.unique_criteria();
        if criteria.is_empty() {
            return Err(CoreError::configuration(format!(
                "model {} declares no unique properties to update by",
                M::NAME
            )));
        }
        self.update_matching(&criteria)
    }

    /// Updates stored records matching explicit property/value criteria.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] when the criteria list is
    /// empty; propagates resolution, hydration and storage failures.
    pub fn update_by(&self, pairs: &[(&str, Value)]) -> CoreResult<()> {
        let criteria = criteria_from_pairs(self.schema(), pairs)?;
        if criteria.is_empty() {
            return Err(CoreError::configuration(
                "update_by requires at least one criterion",
            ));
        }
        self.update_matching(&criteria)
    }

    fn update_matching(&self, criteria: &[Criterion]) -> CoreResult<()> {
        let payload = self.hydrate(false)?;
        let collection = self.collection_name()?;
        let handle = connections::storage(&self.connection_name())?;
        handle.lock().update(&collection, &payload, criteria)?;
        tracing::debug!(model = M::NAME, collection, "updated record");
        Ok(())
    }

    /// Removes the stored record matching the unique criteria.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] when the schema declares no
    /// unique properties; propagates storage failures.
    pub fn remove(&self) -> CoreResult<()> {
        let criteria = self.unique_criteria();
        if criteria.is_empty() {
            return Err(CoreError::configuration(format!(
                "model {} declares no unique properties to remove by",
                M::NAME
            )));
        }
        self.remove_matching(&criteria)
    }

    /// Removes stored records matching explicit property/value criteria.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] when the criteria list is
    /// empty; propagates resolution and storage failures.
    pub fn remove_by(&self, pairs: &[(&str, Value)]) -> CoreResult<()> {
        let criteria = criteria_from_pairs(self.schema(), pairs)?;
        if criteria.is_empty() {
            return Err(CoreError::configuration(
                "remove_by requires at least one criterion",
            ));
        }
        self.remove_matching(&criteria)
    }

    fn remove_matching(&self, criteria: &[Criterion]) -> CoreResult<()> {
        let collection = self.collection_name()?;
        let handle = connections::storage(&self.connection_name())?;
        handle.lock().remove(&collection, criteria)?;
        tracing::debug!(model = M::NAME, collection, "removed record");
        Ok(())
    }

    /// Whether a stored record matches the unique criteria.
    ///
    /// A null unique value means the identity is not assigned yet, so the
    /// record is reported as not existing without asking the backend. With
    /// several unique properties this can misreport when only some are
    /// set; the criteria would then match more loosely than intended.
    ///
    /// # Errors
    ///
    /// Propagates configuration and storage failures.
    pub fn exists(&self) -> CoreResult<bool> {
        let criteria = self.unique_criteria();
        if criteria.is_empty() || criteria.iter().any(|criterion| criterion.value.is_null()) {
            return Ok(false);
        }
        let collection = self.collection_name()?;
        let handle = connections::storage(&self.connection_name())?;
        let exists = handle.lock().exists(&collection, &criteria)?;
        Ok(exists)
    }

    /// Starts a fresh query over this model's collection.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] when the model's annotation block is
    /// malformed.
    pub fn find() -> CoreResult<Query<M>> {
        Query::new()
    }
}
