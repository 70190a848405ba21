//! Document storage backend and driver seam.

mod memory;

pub use memory::MemoryDocumentDriver;

use crate::backend::{Payload, ReadOptions, Row, StorageBackend};
use crate::criteria::{Condition, Criterion};
use crate::error::{StorageError, StorageResult};
use crate::value::{PropertyType, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

const BACKEND_NAME: &str = "document";

/// The native identity field of a document store.
pub const ID_FIELD: &str = "_id";

/// A document identity.
///
/// Generated ids are 32-character hex strings; equality criteria on
/// [`ID_FIELD`] are special-cased to this type when a filter is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates an id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The string form of the id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored document: identity plus named field values.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document identity.
    pub id: DocumentId,
    /// Field values.
    pub fields: BTreeMap<String, Value>,
}

/// A case-insensitive pattern built from a `LIKE` value.
///
/// A `%` wildcard at either end of the original value removes the anchor at
/// that end; the needle itself is matched literally.
#[derive(Debug, Clone, PartialEq)]
pub struct LikePattern {
    needle: String,
    anchor_start: bool,
    anchor_end: bool,
}

impl LikePattern {
    /// Builds a pattern from a `LIKE` comparison value.
    #[must_use]
    pub fn from_like(value: &str) -> Self {
        Self {
            needle: value.replace('%', "").to_lowercase(),
            anchor_start: !value.starts_with('%'),
            anchor_end: !value.ends_with('%'),
        }
    }

    /// Tests a candidate string against the pattern.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        match (self.anchor_start, self.anchor_end) {
            (true, true) => candidate == self.needle,
            (true, false) => candidate.starts_with(&self.needle),
            (false, true) => candidate.ends_with(&self.needle),
            (false, false) => candidate.contains(&self.needle),
        }
    }
}

impl fmt::Display for LikePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}{}{}/i",
            if self.anchor_start { "^" } else { "" },
            self.needle,
            if self.anchor_end { "$" } else { "" }
        )
    }
}

/// One field condition of a document filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Direct equality.
    Eq(Value),
    /// Equality against the native document id.
    IdEq(DocumentId),
    /// Strictly less than.
    Lt(Value),
    /// Strictly greater than.
    Gt(Value),
    /// Less than or equal.
    Le(Value),
    /// Greater than or equal.
    Ge(Value),
    /// Case-insensitive pattern match.
    Pattern(LikePattern),
}

/// A native document filter: field conditions combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(pub Vec<(String, FilterOp)>);

impl Filter {
    /// Builds a filter from a backend-neutral criteria list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedCondition`] for conditions the
    /// document dialect cannot express.
    pub fn from_criteria(criteria: &[Criterion]) -> StorageResult<Self> {
        let mut entries = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            let op = match criterion.condition {
                Condition::Eq if criterion.field == ID_FIELD => {
                    FilterOp::IdEq(DocumentId::new(criterion.value.to_string()))
                }
                Condition::Eq => FilterOp::Eq(criterion.value.clone()),
                Condition::Lt => FilterOp::Lt(criterion.value.clone()),
                Condition::Gt => FilterOp::Gt(criterion.value.clone()),
                Condition::Le => FilterOp::Le(criterion.value.clone()),
                Condition::Ge => FilterOp::Ge(criterion.value.clone()),
                Condition::Like => {
                    FilterOp::Pattern(LikePattern::from_like(&criterion.value.to_string()))
                }
                Condition::Matches => {
                    return Err(StorageError::UnsupportedCondition {
                        backend: BACKEND_NAME,
                        condition: criterion.condition,
                    })
                }
            };
            entries.push((criterion.field.clone(), op));
        }
        Ok(Self(entries))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (field, op)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match op {
                FilterOp::Eq(value) => write!(f, "{field}: \"{value}\"")?,
                FilterOp::IdEq(id) => write!(f, "{field}: ObjectId(\"{id}\")")?,
                FilterOp::Lt(value) => write!(f, "{field}: {{$lt: {value}}}")?,
                FilterOp::Gt(value) => write!(f, "{field}: {{$gt: {value}}}")?,
                FilterOp::Le(value) => write!(f, "{field}: {{$lte: {value}}}")?,
                FilterOp::Ge(value) => write!(f, "{field}: {{$gte: {value}}}")?,
                FilterOp::Pattern(pattern) => write!(f, "{field}: {pattern}")?,
            }
        }
        write!(f, "}}")
    }
}

/// A low-level document store driver.
///
/// The driver owns document persistence and filter evaluation; the backend
/// owns criteria translation and value coercion. [`MemoryDocumentDriver`]
/// is the bundled implementation.
pub trait DocumentDriver: Send {
    /// Finds documents matching the filter, honoring sort/skip/limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    fn find(
        &mut self,
        collection: &str,
        filter: &Filter,
        options: &ReadOptions,
    ) -> StorageResult<Vec<Document>>;

    /// Inserts a document, honoring a caller-provided [`ID_FIELD`] entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    fn insert(
        &mut self,
        collection: &str,
        fields: BTreeMap<String, Value>,
    ) -> StorageResult<DocumentId>;

    /// Applies the changes to every document matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    fn update(
        &mut self,
        collection: &str,
        filter: &Filter,
        changes: &BTreeMap<String, Value>,
    ) -> StorageResult<()>;

    /// Removes every document matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    fn remove(&mut self, collection: &str, filter: &Filter) -> StorageResult<()>;

    /// Counts documents matching the filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails.
    fn count(&mut self, collection: &str, filter: &Filter) -> StorageResult<u64>;
}

/// Document storage backend.
///
/// Translates criteria into a native [`Filter`], maps sort/skip/limit to
/// find options, and coerces typed values before writes. Null and
/// empty-string values are skipped on insert and update (the store never
/// persists an empty string as a field), and [`ID_FIELD`] is never updated.
pub struct DocumentStorage {
    driver: Option<Box<dyn DocumentDriver>>,
}

impl DocumentStorage {
    /// Wraps a document driver.
    #[must_use]
    pub fn new(driver: Box<dyn DocumentDriver>) -> Self {
        Self {
            driver: Some(driver),
        }
    }

    /// Opens a backend over a fresh in-memory driver.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self::new(Box::new(MemoryDocumentDriver::new()))
    }

    fn driver(&mut self) -> StorageResult<&mut Box<dyn DocumentDriver>> {
        self.driver.as_mut().ok_or(StorageError::Closed)
    }

    /// Coerces a payload value by its declared type before a write.
    fn coerce(ty: &PropertyType, value: &Value) -> Value {
        match ty {
            PropertyType::Float => value.as_float().map_or_else(|| value.clone(), Value::Float),
            PropertyType::Integer => value
                .as_integer()
                .map_or_else(|| value.clone(), Value::Integer),
            PropertyType::String => value.as_text().map_or_else(|| value.clone(), Value::Text),
            _ => value.clone(),
        }
    }

    fn skipped(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    fn write_fields(payload: &Payload, include_id: bool) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        for entry in payload {
            if !include_id && entry.field == ID_FIELD {
                continue;
            }
            if Self::skipped(&entry.value) {
                continue;
            }
            fields.insert(entry.field.clone(), Self::coerce(&entry.ty, &entry.value));
        }
        fields
    }
}

impl StorageBackend for DocumentStorage {
    fn get(
        &mut self,
        collection: &str,
        fields: &[String],
        criteria: &[Criterion],
        options: &ReadOptions,
    ) -> StorageResult<Vec<Row>> {
        let filter = Filter::from_criteria(criteria)?;
        tracing::debug!(filter = %filter, collection, "executing document find");
        let documents = self.driver()?.find(collection, &filter, options)?;

        let mut rows = Vec::with_capacity(documents.len());
        for document in documents {
            let mut row = Row::new();
            row.insert(ID_FIELD.to_string(), Value::Text(document.id.to_string()));
            for (field, value) in document.fields {
                let value = match value {
                    Value::DateTime(dt) => {
                        Value::Text(dt.format(crate::value::DATE_TIME_FORMAT).to_string())
                    }
                    other => other,
                };
                row.insert(field, value);
            }
            if !fields.is_empty() {
                row.retain(|field, _| fields.iter().any(|wanted| wanted == field));
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn insert(&mut self, collection: &str, payload: &Payload) -> StorageResult<Option<i64>> {
        let fields = Self::write_fields(payload, true);
        self.driver()?.insert(collection, fields)?;
        Ok(None)
    }

    fn update(
        &mut self,
        collection: &str,
        payload: &Payload,
        criteria: &[Criterion],
    ) -> StorageResult<()> {
        let filter = Filter::from_criteria(criteria)?;
        let changes = Self::write_fields(payload, false);
        tracing::debug!(filter = %filter, collection, "executing document update");
        self.driver()?.update(collection, &filter, &changes)
    }

    fn remove(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<()> {
        let filter = Filter::from_criteria(criteria)?;
        tracing::debug!(filter = %filter, collection, "executing document remove");
        self.driver()?.remove(collection, &filter)
    }

    fn exists(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<bool> {
        Ok(self.count(collection, criteria)? > 0)
    }

    fn count(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<u64> {
        let filter = Filter::from_criteria(criteria)?;
        self.driver()?.count(collection, &filter)
    }

    fn close(&mut self) {
        self.driver = None;
    }
}
