//! # RowMap Storage
//!
//! Storage backend trait and implementations for RowMap.
//!
//! This crate defines the backend-neutral query surface of RowMap: typed
//! [`Value`]s, an ordered [`Criterion`] list, and the [`StorageBackend`]
//! trait that each storage dialect implements. The mapping layer never
//! speaks a native query language; it hands every backend the same
//! criteria and payload shapes.
//!
//! ## Design Principles
//!
//! - Criteria are translated, never interpolated by the caller
//! - Each backend applies its own value coercion before writes
//! - Failures carry the resolved native query for diagnosis
//! - Backends must be `Send` so connections can be shared behind a lock
//!
//! ## Available Backends
//!
//! - [`SqlStorage`] - relational storage over SQLite
//! - [`DocumentStorage`] - document storage over a [`DocumentDriver`]
//! - [`SearchStorage`] - search-index storage over a [`SearchDriver`]
//!
//! ## Example
//!
//! ```rust
//! use rowmap_storage::{
//!     Criterion, PayloadField, PropertyType, ReadOptions, SqlStorage,
//!     StorageBackend, Value,
//! };
//!
//! let mut backend = SqlStorage::open_in_memory().unwrap();
//! backend
//!     .connection()
//!     .unwrap()
//!     .execute("CREATE TABLE users (name TEXT)", [])
//!     .unwrap();
//! backend
//!     .insert(
//!         "users",
//!         &vec![PayloadField {
//!             field: "name".into(),
//!             ty: PropertyType::String,
//!             value: Value::Text("Jane".into()),
//!         }],
//!     )
//!     .unwrap();
//! let criteria = [Criterion::equals("name", Value::Text("Jane".into()))];
//! assert!(backend.exists("users", &criteria).unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod criteria;
mod document;
mod error;
mod search;
mod sql;
mod value;

pub use backend::{Payload, PayloadField, ReadOptions, Row, StorageBackend};
pub use criteria::{Condition, Criterion};
pub use document::{
    Document, DocumentDriver, DocumentId, DocumentStorage, Filter, FilterOp, LikePattern,
    MemoryDocumentDriver, ID_FIELD,
};
pub use error::{StorageError, StorageResult};
pub use search::{
    MemorySearchEngine, SearchClause, SearchDocument, SearchDriver, SearchHits, SearchQuery,
    SearchStorage, COLLECTION_FIELD,
};
pub use sql::SqlStorage;
pub use value::{parse_date_time, PropertyType, Value, DATE_TIME_FORMAT};
