//! Lazy, restartable result cursor.

use crate::connections;
use crate::criteria::resolve_field;
use crate::error::CoreResult;
use crate::model::Model;
use crate::record::Record;
use crate::schema::{self, ModelSchema};
use rowmap_storage::{
    parse_date_time, Condition, Criterion, PropertyType, ReadOptions, Row, Value,
};
use chrono::DateTime;
use std::marker::PhantomData;
use std::sync::Arc;

/// Limit installed when an offset is set without one.
///
/// An offset without a limit would page over an unbounded result; the
/// substitute keeps the query finite while a warning flags the omission.
pub const DEFAULT_LIMIT: u64 = 10_000;

/// A lazy query over one model's collection.
///
/// Criteria, ordering and paging accumulate on the cursor; the backend is
/// asked once, on the first call that needs rows, and the rows are kept for
/// the cursor's lifetime. `rewind` restarts iteration over the same rows
/// without refetching.
pub struct Query<M: Model> {
    schema: Arc<ModelSchema>,
    criteria: Vec<Criterion>,
    order: Vec<String>,
    ascending: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    limit_defaulted: bool,
    rows: Option<Vec<Row>>,
    position: usize,
    _marker: PhantomData<M>,
}

impl<M: Model> Query<M> {
    /// Creates an unrestricted query.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Schema`] when the model's annotation
    /// block is malformed.
    pub fn new() -> CoreResult<Self> {
        Ok(Self {
            schema: schema::schema::<M>()?,
            criteria: Vec::new(),
            order: Vec::new(),
            ascending: true,
            limit: None,
            offset: None,
            limit_defaulted: false,
            rows: None,
            position: 0,
            _marker: PhantomData,
        })
    }

    /// Adds a criterion on a property.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnknownProperty`] for undeclared names.
    pub fn where_(
        &mut self,
        property: &str,
        condition: Condition,
        value: impl Into<Value>,
    ) -> CoreResult<&mut Self> {
        let field = resolve_field(&self.schema, property)?;
        self.criteria.push(Criterion::new(field, condition, value.into()));
        Ok(self)
    }

    /// Adds an equality criterion on a property.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnknownProperty`] for undeclared names.
    pub fn where_equals(
        &mut self,
        property: &str,
        value: impl Into<Value>,
    ) -> CoreResult<&mut Self> {
        self.where_(property, Condition::Eq, value)
    }

    /// Adds a strict exclusive range on a property.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnknownProperty`] for undeclared names.
    pub fn where_between(
        &mut self,
        property: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> CoreResult<&mut Self> {
        self.where_(property, Condition::Gt, low)?;
        self.where_(property, Condition::Lt, high)
    }

    /// Adds the catch-all full-text criterion.
    ///
    /// Only the search backend can execute it; other backends fail the
    /// query with an unsupported-condition error.
    pub fn where_any_matches(&mut self, text: impl Into<String>) -> &mut Self {
        self.criteria
            .push(Criterion::new("*", Condition::Matches, Value::Text(text.into())));
        self
    }

    /// Sets the sort properties and their shared direction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnknownProperty`] for undeclared names.
    pub fn order_by(&mut self, properties: &[&str], ascending: bool) -> CoreResult<&mut Self> {
        let mut order = Vec::with_capacity(properties.len());
        for property in properties {
            order.push(resolve_field(&self.schema, property)?);
        }
        self.order = order;
        self.ascending = ascending;
        Ok(self)
    }

    /// Caps the number of rows fetched.
    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self.limit_defaulted = false;
        self
    }

    /// Skips rows before the first one returned.
    ///
    /// An offset without a limit installs [`DEFAULT_LIMIT`] and emits a
    /// warning; [`Query::limit_defaulted`] reports the substitution.
    pub fn offset(&mut self, offset: u64) -> &mut Self {
        if self.limit.is_none() {
            tracing::warn!(
                model = M::NAME,
                default_limit = DEFAULT_LIMIT,
                "offset set without a limit, installing the default limit"
            );
            self.limit = Some(DEFAULT_LIMIT);
            self.limit_defaulted = true;
        }
        self.offset = Some(offset);
        self
    }

    /// Whether the last `offset` call had to install [`DEFAULT_LIMIT`].
    #[must_use]
    pub fn limit_defaulted(&self) -> bool {
        self.limit_defaulted
    }

    fn fetch(&mut self) -> CoreResult<&[Row]> {
        if self.rows.is_none() {
            let collection = schema::collection_name(&self.schema)?;
            let connection = schema::connection_name(&self.schema);
            let fields: Vec<String> = self
                .schema
                .properties()
                .iter()
                .map(|spec| spec.field.clone())
                .collect();
            let options = ReadOptions {
                order: self.order.clone(),
                ascending: self.ascending,
                limit: self.limit,
                offset: self.offset,
            };
            let handle = connections::storage(&connection)?;
            let rows = handle.lock().get(&collection, &fields, &self.criteria, &options)?;
            tracing::debug!(model = M::NAME, rows = rows.len(), "materialized query");
            self.rows = Some(rows);
            self.position = 0;
        }
        Ok(self.rows.as_deref().unwrap_or_default())
    }

    /// Number of matching records.
    ///
    /// Uses the materialized rows when already fetched or when an explicit
    /// limit bounds the result; otherwise asks the backend to count without
    /// fetching rows.
    ///
    /// # Errors
    ///
    /// Propagates configuration and storage failures.
    pub fn count(&mut self) -> CoreResult<u64> {
        if self.rows.is_some() || self.limit.is_some() {
            return Ok(self.fetch()?.len() as u64);
        }
        let collection = schema::collection_name(&self.schema)?;
        let connection = schema::connection_name(&self.schema);
        let handle = connections::storage(&connection)?;
        let count = handle.lock().count(&collection, &self.criteria)?;
        Ok(count)
    }

    /// Whether no record matches.
    ///
    /// # Errors
    ///
    /// Propagates configuration and storage failures.
    pub fn is_empty(&mut self) -> CoreResult<bool> {
        Ok(self.count()? == 0)
    }

    /// Restarts iteration at the first row without refetching.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Advances the cursor one row.
    pub fn next(&mut self) {
        self.position += 1;
    }

    /// Whether the cursor points at a fetched row.
    ///
    /// # Errors
    ///
    /// Propagates configuration and storage failures from the first fetch.
    pub fn valid(&mut self) -> CoreResult<bool> {
        let position = self.position;
        Ok(position < self.fetch()?.len())
    }

    /// The cursor position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Rehydrates the row at the cursor into a fresh record.
    ///
    /// Returns `None` when the cursor is out of bounds. Fields map back to
    /// properties through the schema's field index; date-time properties
    /// are parsed from their stored text or epoch representation, with
    /// unparseable text becoming null. Rehydrated records are unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::UnmappedField`] when a row carries a
    /// field no property declares; propagates fetch failures.
    pub fn current(&mut self) -> CoreResult<Option<Record<M>>> {
        let position = self.position;
        let schema = Arc::clone(&self.schema);
        let rows = self.fetch()?;
        let Some(row) = rows.get(position) else {
            return Ok(None);
        };

        let mut values: Vec<Value> = schema
            .properties()
            .iter()
            .map(|_| Value::Null)
            .collect();
        for (field, value) in row {
            let Some(index) = schema.index_by_field(field) else {
                return Err(crate::error::CoreError::UnmappedField {
                    field: field.clone(),
                });
            };
            let spec = &schema.properties()[index];
            values[index] = if spec.ty == PropertyType::DateTime {
                rehydrate_date_time(value)
            } else {
                value.clone()
            };
        }
        Ok(Some(Record::from_raw(schema, values)))
    }
}

/// Recovers a date-time from its stored representation.
///
/// Relational and document backends return formatted text, the search
/// backend epoch seconds. Empty or unparseable text becomes null.
fn rehydrate_date_time(value: &Value) -> Value {
    match value {
        Value::DateTime(_) => value.clone(),
        Value::Text(text) if !text.is_empty() && text != "NULL" => {
            parse_date_time(text).map_or(Value::Null, Value::DateTime)
        }
        Value::Integer(epoch) => DateTime::from_timestamp(*epoch, 0)
            .map_or(Value::Null, |dt| Value::DateTime(dt.naive_utc())),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_without_limit_installs_default() {
        struct Paged;
        impl Model for Paged {
            const NAME: &'static str = "query_tests::Paged";
            const SCHEMA: &'static str = "
                @collection paged
                @property integer id - unique
            ";
        }

        let mut query = Query::<Paged>::new().unwrap();
        query.offset(20);
        assert!(query.limit_defaulted());
        assert_eq!(query.limit, Some(DEFAULT_LIMIT));

        // An explicit limit afterwards clears the substitution.
        query.limit(5);
        assert!(!query.limit_defaulted());
    }

    #[test]
    fn criteria_resolve_to_field_aliases() {
        struct Aliased;
        impl Model for Aliased {
            const NAME: &'static str = "query_tests::Aliased";
            const SCHEMA: &'static str = "
                @collection aliased
                @property integer id thing_id - unique
                @property string name - null
            ";
        }

        let mut query = Query::<Aliased>::new().unwrap();
        query
            .where_equals("id", 4)
            .unwrap()
            .where_between("id", 1, 10)
            .unwrap()
            .where_any_matches("text");
        assert_eq!(query.criteria.len(), 4);
        assert_eq!(query.criteria[0].field, "thing_id");
        assert_eq!(query.criteria[1].condition, Condition::Gt);
        assert_eq!(query.criteria[2].condition, Condition::Lt);
        assert_eq!(query.criteria[3].field, "*");

        assert!(query.where_equals("nope", 1).is_err());
        assert!(query.order_by(&["nope"], true).is_err());
    }

    #[test]
    fn date_time_rehydration() {
        let parsed = rehydrate_date_time(&Value::Text("2021-01-02 03:04:05".into()));
        assert_eq!(
            parsed,
            Value::DateTime(parse_date_time("2021-01-02 03:04:05").unwrap())
        );
        assert_eq!(rehydrate_date_time(&Value::Text(String::new())), Value::Null);
        assert_eq!(rehydrate_date_time(&Value::Text("NULL".into())), Value::Null);
        assert_eq!(rehydrate_date_time(&Value::Text("garbage".into())), Value::Null);

        let epoch = parse_date_time("2021-01-02 03:04:05").unwrap().and_utc().timestamp();
        assert_eq!(
            rehydrate_date_time(&Value::Integer(epoch)),
            Value::DateTime(parse_date_time("2021-01-02 03:04:05").unwrap())
        );
    }
}
