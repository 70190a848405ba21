//! Storage backend trait definition.

use crate::criteria::Criterion;
use crate::error::StorageResult;
use crate::value::{PropertyType, Value};
use std::collections::BTreeMap;

/// One row as returned by a backend: field alias → native value.
pub type Row = BTreeMap<String, Value>;

/// One field of a write payload.
///
/// The declared type travels with the value so each backend can apply its
/// own coercion before the write.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadField {
    /// Storage-side field name.
    pub field: String,
    /// Declared property type.
    pub ty: PropertyType,
    /// Current value.
    pub value: Value,
}

/// A hydrated write payload, in schema order.
pub type Payload = Vec<PayloadField>;

/// Ordering and paging options for a read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Sort fields, in precedence order.
    pub order: Vec<String>,
    /// One shared direction applied to all sort fields.
    pub ascending: bool,
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            ascending: true,
            limit: None,
            offset: None,
        }
    }
}

impl ReadOptions {
    /// Options with no ordering, limit or offset.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// A storage backend for RowMap records.
///
/// Backends translate the backend-neutral criteria model into their native
/// query form and return rows as field-alias→value maps. All operations are
/// synchronous and blocking; failures carry the resolved native query for
/// diagnosis.
///
/// # Invariants
///
/// - Criteria values bind in criteria order.
/// - `update` never changes a backend's native identity field.
/// - After [`StorageBackend::close`], every operation fails with
///   [`crate::StorageError::Closed`].
///
/// # Implementors
///
/// - [`crate::SqlStorage`] - relational storage over a SQL driver
/// - [`crate::DocumentStorage`] - document storage over a document driver
/// - [`crate::SearchStorage`] - search-index storage over a search driver
pub trait StorageBackend: Send {
    /// Fetches rows matching the criteria.
    ///
    /// `fields` lists the field aliases to materialize; an empty slice
    /// requests all fields.
    ///
    /// # Errors
    ///
    /// Returns an error if a criterion cannot be translated or the driver
    /// fails.
    fn get(
        &mut self,
        collection: &str,
        fields: &[String],
        criteria: &[Criterion],
        options: &ReadOptions,
    ) -> StorageResult<Vec<Row>>;

    /// Inserts one record.
    ///
    /// Returns the generated identity where the backend has one (the SQL
    /// backend's last-insert id); `None` where not applicable.
    ///
    /// # Errors
    ///
    /// Returns an error if a payload value cannot be represented or the
    /// driver fails.
    fn insert(&mut self, collection: &str, payload: &Payload) -> StorageResult<Option<i64>>;

    /// Updates records matching the criteria with the payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a criterion cannot be translated or the driver
    /// fails.
    fn update(
        &mut self,
        collection: &str,
        payload: &Payload,
        criteria: &[Criterion],
    ) -> StorageResult<()>;

    /// Removes records matching the criteria.
    ///
    /// # Errors
    ///
    /// Returns an error if a criterion cannot be translated or the driver
    /// fails.
    fn remove(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<()>;

    /// Checks whether any record matches the criteria.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn exists(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<bool>;

    /// Counts records matching the criteria.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails.
    fn count(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<u64>;

    /// Releases the underlying connection.
    ///
    /// The backend is invalid for further use afterwards.
    fn close(&mut self);
}
