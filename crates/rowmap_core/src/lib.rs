//! # RowMap Core
//!
//! Schema-driven object mapping over interchangeable storage backends.
//!
//! A model describes itself with an annotation block; RowMap parses the
//! block once, validates every mutation against it, and moves records in
//! and out of whichever backend the model's connection points at.
//!
//! ## Concepts
//!
//! - [`Model`] - a type naming itself and carrying its annotation block
//! - [`Record`] - one row/document of a model, with dirty tracking
//! - [`Query`] - a lazy, restartable cursor over matching records
//! - [`connections`] - the process-wide name → backend registry
//!
//! ## Example
//!
//! ```rust
//! use rowmap_core::{connections, Model, Record};
//! use rowmap_storage::DocumentStorage;
//!
//! struct User;
//!
//! impl Model for User {
//!     const NAME: &'static str = "readme::User";
//!     const SCHEMA: &'static str = "
//!         @collection users
//!         @connection readme
//!         @property string(64) handle - unique
//!         @property string(255) name - null
//!     ";
//! }
//!
//! connections::register("readme", DocumentStorage::open_in_memory());
//!
//! let mut user = Record::<User>::new().unwrap();
//! user.set("handle", "jane").unwrap();
//! user.set("name", "Jane Doe").unwrap();
//! user.save().unwrap();
//!
//! let mut query = Record::<User>::find().unwrap();
//! let found = query.current().unwrap().unwrap();
//! assert_eq!(found.get("name").unwrap().to_string(), "Jane Doe");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod connections;
mod criteria;
mod error;
mod model;
mod query;
mod record;
pub mod schema;
mod store;
mod validate;

pub use criteria::{criteria_from_pairs, resolve_criteria};
pub use error::{CoreError, CoreResult};
pub use model::Model;
pub use query::{Query, DEFAULT_LIMIT};
pub use record::Record;
pub use schema::{ModelSchema, PropertySpec};
pub use validate::validate;

pub use rowmap_storage::{Condition, Criterion, PropertyType, StorageBackend, Value};
