//! Search-index storage backend and driver seam.

mod memory;

pub use memory::MemorySearchEngine;

use crate::backend::{Payload, ReadOptions, Row, StorageBackend};
use crate::criteria::{Condition, Criterion};
use crate::error::{StorageError, StorageResult};
use crate::value::{PropertyType, Value};
use std::collections::BTreeMap;
use std::fmt;

const BACKEND_NAME: &str = "search";

/// The reserved field scoping each indexed document to its collection.
pub const COLLECTION_FIELD: &str = "collection";

/// One clause of a search query.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchClause {
    /// Exact phrase match on one field.
    Phrase {
        /// Field name.
        field: String,
        /// Matched value.
        value: Value,
    },
    /// Open-ended range from a lower bound.
    RangeFrom {
        /// Field name.
        field: String,
        /// Inclusive lower bound.
        value: Value,
    },
    /// Open-ended range up to an upper bound.
    RangeTo {
        /// Field name.
        field: String,
        /// Inclusive upper bound.
        value: Value,
    },
    /// Free text matched across all fields.
    Raw {
        /// Query text.
        text: String,
    },
}

impl fmt::Display for SearchClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Phrase { field, value } => write!(f, "{field}:\"{value}\""),
            Self::RangeFrom { field, value } => write!(f, "{field}:[{value} TO *]"),
            Self::RangeTo { field, value } => write!(f, "{field}:[* TO {value}]"),
            Self::Raw { text } => f.write_str(text),
        }
    }
}

/// A typed search query: clauses combined with AND.
///
/// The rendered form is what a search engine would receive and is embedded
/// in failure reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    /// Query clauses, collection scope first.
    pub clauses: Vec<SearchClause>,
}

impl SearchQuery {
    /// Builds a query scoped to a collection from a criteria list.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedCondition`] for conditions the
    /// search dialect cannot express.
    pub fn from_criteria(collection: &str, criteria: &[Criterion]) -> StorageResult<Self> {
        let mut clauses = vec![SearchClause::Phrase {
            field: COLLECTION_FIELD.to_string(),
            value: Value::Text(collection.to_string()),
        }];
        for criterion in criteria {
            let clause = match criterion.condition {
                Condition::Eq => SearchClause::Phrase {
                    field: criterion.field.clone(),
                    value: criterion.value.clone(),
                },
                Condition::Ge => SearchClause::RangeFrom {
                    field: criterion.field.clone(),
                    value: criterion.value.clone(),
                },
                Condition::Le => SearchClause::RangeTo {
                    field: criterion.field.clone(),
                    value: criterion.value.clone(),
                },
                Condition::Matches => SearchClause::Raw {
                    text: criterion.value.to_string(),
                },
                Condition::Lt | Condition::Gt | Condition::Like => {
                    return Err(StorageError::UnsupportedCondition {
                        backend: BACKEND_NAME,
                        condition: criterion.condition,
                    })
                }
            };
            clauses.push(clause);
        }
        Ok(Self { clauses })
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

/// One indexed document with its engine-internal id.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDocument {
    /// Engine-internal document id.
    pub id: u64,
    /// Indexed field values.
    pub fields: BTreeMap<String, Value>,
}

/// The outcome of a search: the full hit count plus the requested page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// Total number of matching documents, independent of paging.
    pub total: u64,
    /// The documents of the requested page.
    pub documents: Vec<SearchDocument>,
}

/// A low-level search engine driver.
///
/// The driver owns indexing and query evaluation; the backend owns criteria
/// translation and value coercion. [`MemorySearchEngine`] is the bundled
/// implementation.
pub trait SearchDriver: Send {
    /// Runs a query, honoring sort/skip/limit.
    ///
    /// A limit of zero returns the total hit count with no documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn search(&mut self, query: &SearchQuery, options: &ReadOptions) -> StorageResult<SearchHits>;

    /// Indexes one document.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn add(&mut self, fields: BTreeMap<String, Value>) -> StorageResult<()>;

    /// Deletes documents by engine-internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails.
    fn delete(&mut self, ids: &[u64]) -> StorageResult<()>;
}

/// Search-index storage backend.
///
/// Every document carries a synthetic [`COLLECTION_FIELD`] phrase so one
/// index can serve multiple collections. Supported conditions are equality,
/// the inclusive range bounds and the catch-all text match; an update is
/// executed as remove-then-insert since indexed documents are immutable.
/// `DateTime` values are indexed as epoch seconds.
pub struct SearchStorage {
    driver: Option<Box<dyn SearchDriver>>,
}

impl SearchStorage {
    /// Wraps a search driver.
    #[must_use]
    pub fn new(driver: Box<dyn SearchDriver>) -> Self {
        Self {
            driver: Some(driver),
        }
    }

    /// Opens a backend over a fresh in-memory engine.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self::new(Box::new(MemorySearchEngine::new()))
    }

    fn driver(&mut self) -> StorageResult<&mut Box<dyn SearchDriver>> {
        self.driver.as_mut().ok_or(StorageError::Closed)
    }

    fn index_fields(collection: &str, payload: &Payload) -> StorageResult<BTreeMap<String, Value>> {
        let mut fields = BTreeMap::new();
        fields.insert(
            COLLECTION_FIELD.to_string(),
            Value::Text(collection.to_string()),
        );
        for entry in payload {
            if entry.value.is_null() {
                continue;
            }
            let value = match &entry.ty {
                PropertyType::Array => {
                    return Err(StorageError::unsupported(format!(
                        "array field \"{}\" cannot be indexed",
                        entry.field
                    )))
                }
                PropertyType::DateTime => match &entry.value {
                    Value::DateTime(dt) => Value::Integer(dt.and_utc().timestamp()),
                    other => other.clone(),
                },
                PropertyType::Float => entry
                    .value
                    .as_float()
                    .map_or_else(|| entry.value.clone(), Value::Float),
                PropertyType::Integer => entry
                    .value
                    .as_integer()
                    .map_or_else(|| entry.value.clone(), Value::Integer),
                PropertyType::String => entry
                    .value
                    .as_text()
                    .map_or_else(|| entry.value.clone(), Value::Text),
                _ => entry.value.clone(),
            };
            fields.insert(entry.field.clone(), value);
        }
        Ok(fields)
    }

    fn matching_ids(&mut self, query: &SearchQuery) -> StorageResult<Vec<u64>> {
        let hits = self.driver()?.search(query, &ReadOptions::none())?;
        Ok(hits.documents.iter().map(|document| document.id).collect())
    }

    fn total_only(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<u64> {
        let query = SearchQuery::from_criteria(collection, criteria)?;
        let options = ReadOptions {
            limit: Some(0),
            ..ReadOptions::none()
        };
        tracing::debug!(query = %query, "executing search count");
        Ok(self.driver()?.search(&query, &options)?.total)
    }
}

impl StorageBackend for SearchStorage {
    fn get(
        &mut self,
        collection: &str,
        fields: &[String],
        criteria: &[Criterion],
        options: &ReadOptions,
    ) -> StorageResult<Vec<Row>> {
        let query = SearchQuery::from_criteria(collection, criteria)?;
        tracing::debug!(query = %query, "executing search query");
        let hits = self.driver()?.search(&query, options)?;

        let mut rows = Vec::with_capacity(hits.documents.len());
        for document in hits.documents {
            let mut row = Row::new();
            for (field, value) in document.fields {
                if field == COLLECTION_FIELD {
                    continue;
                }
                if !fields.is_empty() && !fields.iter().any(|wanted| wanted == &field) {
                    continue;
                }
                row.insert(field, value);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn insert(&mut self, collection: &str, payload: &Payload) -> StorageResult<Option<i64>> {
        let fields = Self::index_fields(collection, payload)?;
        self.driver()?.add(fields)?;
        Ok(None)
    }

    fn update(
        &mut self,
        collection: &str,
        payload: &Payload,
        criteria: &[Criterion],
    ) -> StorageResult<()> {
        // Indexed documents are immutable, so replace wholesale.
        self.remove(collection, criteria)?;
        self.insert(collection, payload)?;
        Ok(())
    }

    fn remove(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<()> {
        let query = SearchQuery::from_criteria(collection, criteria)?;
        tracing::debug!(query = %query, "executing search delete");
        let ids = self.matching_ids(&query)?;
        self.driver()?.delete(&ids)
    }

    fn exists(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<bool> {
        Ok(self.total_only(collection, criteria)? > 0)
    }

    fn count(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<u64> {
        self.total_only(collection, criteria)
    }

    fn close(&mut self) {
        self.driver = None;
    }
}
