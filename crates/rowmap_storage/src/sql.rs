//! Relational storage backend over a SQL driver.

use crate::backend::{Payload, ReadOptions, Row, StorageBackend};
use crate::criteria::{Condition, Criterion};
use crate::error::{StorageError, StorageResult};
use crate::value::{Value, DATE_TIME_FORMAT};
use rusqlite::Connection;

const BACKEND_NAME: &str = "sql";

/// Relational storage backend.
///
/// Builds parameterized statements with backtick-quoted identifiers; values
/// bind positionally in criteria order. Date-time values serialize to
/// `YYYY-MM-DD HH:MM:SS`. On execution failure the error embeds the query
/// with placeholders interpolated back for debugging.
///
/// `exists` and `count` are implemented by delegating to `get` and
/// measuring cardinality; there is no native COUNT optimization.
///
/// # Example
///
/// ```rust
/// use rowmap_storage::SqlStorage;
///
/// let storage = SqlStorage::open_in_memory().unwrap();
/// assert!(storage.connection().is_some());
/// ```
pub struct SqlStorage {
    connection: Option<Connection>,
}

impl SqlStorage {
    /// Wraps an existing driver connection.
    #[must_use]
    pub fn new(connection: Connection) -> Self {
        Self {
            connection: Some(connection),
        }
    }

    /// Opens a backend over a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot open the database.
    pub fn open_in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()
            .map_err(|e| StorageError::query_failed("open :memory:", e.to_string()))?;
        Ok(Self::new(connection))
    }

    /// The underlying driver connection, if the backend is still open.
    #[must_use]
    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.connection.as_ref().ok_or(StorageError::Closed)
    }

    fn where_clause(criteria: &[Criterion]) -> StorageResult<String> {
        if criteria.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            if criterion.condition == Condition::Matches {
                return Err(StorageError::UnsupportedCondition {
                    backend: BACKEND_NAME,
                    condition: criterion.condition,
                });
            }
            parts.push(format!(
                "`{}` {} ?",
                criterion.field,
                criterion.condition.symbol()
            ));
        }
        Ok(format!(" WHERE {}", parts.join(" AND ")))
    }

    fn order_clause(options: &ReadOptions) -> String {
        if options.order.is_empty() {
            return String::new();
        }
        let fields = options
            .order
            .iter()
            .map(|f| format!("`{f}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let direction = if options.ascending { "ASC" } else { "DESC" };
        format!(" ORDER BY {fields} {direction}")
    }

    fn limit_clause(options: &ReadOptions) -> String {
        match (options.limit, options.offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
            (Some(limit), None) => format!(" LIMIT {limit}"),
            // OFFSET needs a LIMIT in SQLite; -1 means unbounded.
            (None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
            (None, None) => String::new(),
        }
    }

    fn bind_value(value: &Value) -> rusqlite::types::Value {
        match value {
            Value::Null => rusqlite::types::Value::Null,
            Value::Integer(n) => rusqlite::types::Value::Integer(*n),
            Value::Float(n) => rusqlite::types::Value::Real(*n),
            Value::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
            Value::DateTime(dt) => {
                rusqlite::types::Value::Text(dt.format(DATE_TIME_FORMAT).to_string())
            }
            Value::Text(_) | Value::List(_) => rusqlite::types::Value::Text(value.to_string()),
        }
    }

    fn criteria_binds(criteria: &[Criterion]) -> Vec<rusqlite::types::Value> {
        criteria.iter().map(|c| Self::bind_value(&c.value)).collect()
    }

    fn payload_binds(payload: &Payload) -> Vec<rusqlite::types::Value> {
        payload.iter().map(|f| Self::bind_value(&f.value)).collect()
    }

    /// Replaces positional placeholders with their bound values, for error
    /// messages only.
    fn interpolate(query: &str, binds: &[rusqlite::types::Value]) -> String {
        let mut out = String::with_capacity(query.len());
        let mut binds = binds.iter();
        for ch in query.chars() {
            if ch == '?' {
                match binds.next() {
                    Some(rusqlite::types::Value::Null) | None => out.push_str("NULL"),
                    Some(rusqlite::types::Value::Integer(n)) => out.push_str(&n.to_string()),
                    Some(rusqlite::types::Value::Real(n)) => out.push_str(&n.to_string()),
                    Some(rusqlite::types::Value::Text(s)) => {
                        out.push('\'');
                        out.push_str(s);
                        out.push('\'');
                    }
                    Some(rusqlite::types::Value::Blob(b)) => {
                        out.push_str(&format!("x'<{} bytes>'", b.len()));
                    }
                }
            } else {
                out.push(ch);
            }
        }
        out
    }

    fn from_driver(value: rusqlite::types::Value) -> Value {
        match value {
            rusqlite::types::Value::Null => Value::Null,
            rusqlite::types::Value::Integer(n) => Value::Integer(n),
            rusqlite::types::Value::Real(n) => Value::Float(n),
            rusqlite::types::Value::Text(s) => Value::Text(s),
            rusqlite::types::Value::Blob(b) => {
                Value::Text(String::from_utf8_lossy(&b).into_owned())
            }
        }
    }
}

impl StorageBackend for SqlStorage {
    fn get(
        &mut self,
        collection: &str,
        fields: &[String],
        criteria: &[Criterion],
        options: &ReadOptions,
    ) -> StorageResult<Vec<Row>> {
        let select = if fields.is_empty() {
            "*".to_string()
        } else {
            fields
                .iter()
                .map(|f| format!("`{f}`"))
                .collect::<Vec<_>>()
                .join(",")
        };
        let query = format!(
            "SELECT {select} FROM `{collection}`{}{}{};",
            Self::where_clause(criteria)?,
            Self::order_clause(options),
            Self::limit_clause(options),
        );
        let binds = Self::criteria_binds(criteria);
        tracing::debug!(query = %query, "executing sql get");

        let conn = self.conn()?;
        let run = || -> Result<Vec<Row>, rusqlite::Error> {
            let mut statement = conn.prepare(&query)?;
            let column_names: Vec<String> = statement
                .column_names()
                .iter()
                .map(|name| (*name).to_string())
                .collect();
            let mut rows = statement.query(rusqlite::params_from_iter(binds.clone()))?;
            let mut result = Vec::new();
            while let Some(row) = rows.next()? {
                let mut out = Row::new();
                for (index, name) in column_names.iter().enumerate() {
                    let value: rusqlite::types::Value = row.get(index)?;
                    out.insert(name.clone(), Self::from_driver(value));
                }
                result.push(out);
            }
            Ok(result)
        };
        run().map_err(|e| {
            StorageError::query_failed(Self::interpolate(&query, &binds), e.to_string())
        })
    }

    fn insert(&mut self, collection: &str, payload: &Payload) -> StorageResult<Option<i64>> {
        let columns = payload
            .iter()
            .map(|f| format!("`{}`", f.field))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; payload.len()].join(", ");
        let query =
            format!("INSERT INTO `{collection}` ({columns}) VALUES ({placeholders});");
        let binds = Self::payload_binds(payload);
        tracing::debug!(query = %query, "executing sql insert");

        let conn = self.conn()?;
        conn.prepare(&query)
            .and_then(|mut statement| statement.execute(rusqlite::params_from_iter(binds.clone())))
            .map_err(|e| {
                StorageError::query_failed(Self::interpolate(&query, &binds), e.to_string())
            })?;
        Ok(Some(conn.last_insert_rowid()))
    }

    fn update(
        &mut self,
        collection: &str,
        payload: &Payload,
        criteria: &[Criterion],
    ) -> StorageResult<()> {
        let assignments = payload
            .iter()
            .map(|f| format!("`{}` = ?", f.field))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "UPDATE `{collection}` SET {assignments}{};",
            Self::where_clause(criteria)?
        );
        let mut binds = Self::payload_binds(payload);
        binds.extend(Self::criteria_binds(criteria));
        tracing::debug!(query = %query, "executing sql update");

        let conn = self.conn()?;
        conn.prepare(&query)
            .and_then(|mut statement| statement.execute(rusqlite::params_from_iter(binds.clone())))
            .map_err(|e| {
                StorageError::query_failed(Self::interpolate(&query, &binds), e.to_string())
            })?;
        Ok(())
    }

    fn remove(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<()> {
        let query = format!(
            "DELETE FROM `{collection}`{};",
            Self::where_clause(criteria)?
        );
        let binds = Self::criteria_binds(criteria);
        tracing::debug!(query = %query, "executing sql remove");

        let conn = self.conn()?;
        conn.prepare(&query)
            .and_then(|mut statement| statement.execute(rusqlite::params_from_iter(binds.clone())))
            .map_err(|e| {
                StorageError::query_failed(Self::interpolate(&query, &binds), e.to_string())
            })?;
        Ok(())
    }

    fn exists(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<bool> {
        Ok(!self
            .get(collection, &[], criteria, &ReadOptions::none())?
            .is_empty())
    }

    fn count(&mut self, collection: &str, criteria: &[Criterion]) -> StorageResult<u64> {
        Ok(self.get(collection, &[], criteria, &ReadOptions::none())?.len() as u64)
    }

    fn close(&mut self) {
        self.connection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{parse_date_time, PropertyType};

    fn field(name: &str, ty: PropertyType, value: Value) -> crate::backend::PayloadField {
        crate::backend::PayloadField {
            field: name.to_string(),
            ty,
            value,
        }
    }

    fn user_storage() -> SqlStorage {
        let storage = SqlStorage::open_in_memory().unwrap();
        storage
            .connection()
            .unwrap()
            .execute_batch(
                "CREATE TABLE users (
                    user_id INTEGER PRIMARY KEY,
                    first_name TEXT,
                    created TEXT
                );",
            )
            .unwrap();
        storage
    }

    fn insert_user(storage: &mut SqlStorage, name: &str, created: &str) -> i64 {
        let payload = vec![
            field("first_name", PropertyType::String, Value::Text(name.into())),
            field(
                "created",
                PropertyType::DateTime,
                Value::DateTime(parse_date_time(created).unwrap()),
            ),
        ];
        storage.insert("users", &payload).unwrap().unwrap()
    }

    #[test]
    fn insert_returns_generated_id() {
        let mut storage = user_storage();
        let first = insert_user(&mut storage, "Alice", "2021-01-01 10:00:00");
        let second = insert_user(&mut storage, "Bob", "2021-01-02 10:00:00");
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn get_filters_and_types_rows() {
        let mut storage = user_storage();
        insert_user(&mut storage, "Alice", "2021-01-01 10:00:00");
        insert_user(&mut storage, "Bob", "2021-01-02 10:00:00");

        let criteria = vec![Criterion::equals("first_name", Value::Text("Bob".into()))];
        let rows = storage
            .get(
                "users",
                &["user_id".into(), "first_name".into(), "created".into()],
                &criteria,
                &ReadOptions::none(),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["first_name"], Value::Text("Bob".into()));
        assert_eq!(rows[0]["user_id"], Value::Integer(2));
        assert_eq!(rows[0]["created"], Value::Text("2021-01-02 10:00:00".into()));
    }

    #[test]
    fn order_and_paging_clauses() {
        let mut storage = user_storage();
        insert_user(&mut storage, "Charlie", "2021-01-03 10:00:00");
        insert_user(&mut storage, "Alice", "2021-01-01 10:00:00");
        insert_user(&mut storage, "Bob", "2021-01-02 10:00:00");

        let options = ReadOptions {
            order: vec!["first_name".into()],
            ascending: true,
            limit: Some(2),
            offset: Some(1),
        };
        let rows = storage
            .get("users", &["first_name".into()], &[], &options)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["first_name"], Value::Text("Bob".into()));
        assert_eq!(rows[1]["first_name"], Value::Text("Charlie".into()));

        let descending = ReadOptions {
            order: vec!["first_name".into()],
            ascending: false,
            limit: Some(1),
            offset: None,
        };
        let rows = storage
            .get("users", &["first_name".into()], &[], &descending)
            .unwrap();
        assert_eq!(rows[0]["first_name"], Value::Text("Charlie".into()));
    }

    #[test]
    fn offset_without_limit_still_skips_rows() {
        let mut storage = user_storage();
        insert_user(&mut storage, "Alice", "2021-01-01 10:00:00");
        insert_user(&mut storage, "Bob", "2021-01-02 10:00:00");
        insert_user(&mut storage, "Charlie", "2021-01-03 10:00:00");

        let options = ReadOptions {
            order: vec!["first_name".into()],
            ascending: true,
            limit: None,
            offset: Some(1),
        };
        let rows = storage
            .get("users", &["first_name".into()], &[], &options)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["first_name"], Value::Text("Bob".into()));
        assert_eq!(rows[1]["first_name"], Value::Text("Charlie".into()));
    }

    #[test]
    fn interpolate_summarizes_blob_binds() {
        let binds = vec![rusqlite::types::Value::Blob(vec![1, 2, 3])];
        let rendered = SqlStorage::interpolate("SELECT ? FROM t", &binds);
        assert_eq!(rendered, "SELECT x'<3 bytes>' FROM t");
    }

    #[test]
    fn update_changes_matching_rows() {
        let mut storage = user_storage();
        insert_user(&mut storage, "Alice", "2021-01-01 10:00:00");

        let payload = vec![field(
            "first_name",
            PropertyType::String,
            Value::Text("Alicia".into()),
        )];
        let criteria = vec![Criterion::equals("user_id", Value::Integer(1))];
        storage.update("users", &payload, &criteria).unwrap();

        let rows = storage
            .get("users", &["first_name".into()], &criteria, &ReadOptions::none())
            .unwrap();
        assert_eq!(rows[0]["first_name"], Value::Text("Alicia".into()));
    }

    #[test]
    fn remove_and_exists() {
        let mut storage = user_storage();
        insert_user(&mut storage, "Alice", "2021-01-01 10:00:00");
        let criteria = vec![Criterion::equals("first_name", Value::Text("Alice".into()))];

        assert!(storage.exists("users", &criteria).unwrap());
        storage.remove("users", &criteria).unwrap();
        assert!(!storage.exists("users", &criteria).unwrap());
        assert_eq!(storage.count("users", &[]).unwrap(), 0);
    }

    #[test]
    fn error_embeds_interpolated_query() {
        let mut storage = user_storage();
        let criteria = vec![Criterion::equals("missing", Value::Text("x".into()))];
        let err = storage
            .get("users", &[], &criteria, &ReadOptions::none())
            .unwrap_err();
        match err {
            StorageError::QueryFailed { query, .. } => {
                assert!(query.contains("`missing` = 'x'"), "query was: {query}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn matches_condition_is_rejected() {
        let mut storage = user_storage();
        let criteria = vec![Criterion::new("*", Condition::Matches, Value::Text("x".into()))];
        let err = storage
            .get("users", &[], &criteria, &ReadOptions::none())
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedCondition { .. }));
    }

    #[test]
    fn closed_backend_rejects_operations() {
        let mut storage = user_storage();
        storage.close();
        let err = storage
            .get("users", &[], &[], &ReadOptions::none())
            .unwrap_err();
        assert!(matches!(err, StorageError::Closed));
        assert!(storage.connection().is_none());
    }
}
