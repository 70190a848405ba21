//! End-to-end suite driving the same model shape through all three
//! backends.

use rowmap_core::{connections, Condition, CoreError, Model, Record, Value};
use rowmap_storage::{
    parse_date_time, DocumentStorage, SearchStorage, SqlStorage, StorageError,
};

fn register_sql(connection: &str, table_sql: &str) {
    let backend = SqlStorage::open_in_memory().unwrap();
    backend.connection().unwrap().execute(table_sql, []).unwrap();
    connections::register(connection, backend);
}

struct SqlUser;

impl Model for SqlUser {
    const NAME: &'static str = "parity::SqlUser";
    const SCHEMA: &'static str = "
        @collection users
        @connection parity::sql
        @property integer(11) id user_id - null unique
        @property string(255) name
        @property DateTime joined - null
    ";
}

struct DocUser;

impl Model for DocUser {
    const NAME: &'static str = "parity::DocUser";
    const SCHEMA: &'static str = "
        @collection users
        @connection parity::doc
        @property integer(11) id user_id - null unique
        @property string(255) name
        @property DateTime joined - null
    ";
}

struct Mail;

impl Model for Mail {
    const NAME: &'static str = "parity::Mail";
    const SCHEMA: &'static str = "
        @collection mails
        @connection parity::search
        @property integer owner - unique
        @property string(255) subject
        @property DateTime sent - null
    ";
}

fn seed<M: Model>(names: &[(&str, i64)]) {
    for (name, id) in names {
        let mut record = Record::<M>::new().unwrap();
        record.set("id", *id).unwrap();
        record.set("name", *name).unwrap();
        record
            .set("joined", parse_date_time("2021-06-01 12:00:00").unwrap())
            .unwrap();
        record.save().unwrap();
    }
}

#[test]
fn sql_round_trip_with_dates() {
    register_sql(
        "parity::sql",
        "CREATE TABLE users (user_id INTEGER PRIMARY KEY, name TEXT, joined TEXT)",
    );
    seed::<SqlUser>(&[("Alice", 1), ("Bob", 2)]);

    let mut query = Record::<SqlUser>::find().unwrap();
    query.where_equals("id", 2).unwrap();
    let found = query.current().unwrap().unwrap();
    assert_eq!(found.get("name").unwrap(), &Value::Text("Bob".into()));
    assert_eq!(
        found.get("joined").unwrap(),
        &Value::DateTime(parse_date_time("2021-06-01 12:00:00").unwrap())
    );
    assert!(!found.is_modified());
}

#[test]
fn document_round_trip_and_count_parity() {
    register_sql(
        "parity::count_sql",
        "CREATE TABLE users (user_id INTEGER PRIMARY KEY, name TEXT, joined TEXT)",
    );
    connections::register("parity::doc", DocumentStorage::open_in_memory());

    struct CountSqlUser;
    impl Model for CountSqlUser {
        const NAME: &'static str = "parity::CountSqlUser";
        const SCHEMA: &'static str = "
            @collection users
            @connection parity::count_sql
            @property integer(11) id user_id - null unique
            @property string(255) name
            @property DateTime joined - null
        ";
    }

    let people: &[(&str, i64)] = &[("Alice", 1), ("Bob", 2), ("Carol", 3)];
    seed::<CountSqlUser>(people);
    seed::<DocUser>(people);

    // Same criteria, same cardinality, either backend.
    let mut sql_query = Record::<CountSqlUser>::find().unwrap();
    sql_query.where_("id", Condition::Ge, 2).unwrap();
    let mut doc_query = Record::<DocUser>::find().unwrap();
    doc_query.where_("id", Condition::Ge, 2).unwrap();
    assert_eq!(sql_query.count().unwrap(), 2);
    assert_eq!(sql_query.count().unwrap(), doc_query.count().unwrap());

    let found = doc_query.current().unwrap().unwrap();
    assert_eq!(
        found.get("joined").unwrap(),
        &Value::DateTime(parse_date_time("2021-06-01 12:00:00").unwrap())
    );
}

#[test]
fn cursor_orders_pages_and_rewinds() {
    register_sql(
        "parity::cursor",
        "CREATE TABLE users (user_id INTEGER PRIMARY KEY, name TEXT, joined TEXT)",
    );

    struct CursorUser;
    impl Model for CursorUser {
        const NAME: &'static str = "parity::CursorUser";
        const SCHEMA: &'static str = "
            @collection users
            @connection parity::cursor
            @property integer(11) id user_id - null unique
            @property string(255) name
            @property DateTime joined - null
        ";
    }

    seed::<CursorUser>(&[("Delta", 4), ("Alpha", 1), ("Charlie", 3), ("Bravo", 2)]);

    let mut query = Record::<CursorUser>::find().unwrap();
    query.order_by(&["name"], false).unwrap().limit(3);

    let mut names = Vec::new();
    while query.valid().unwrap() {
        names.push(query.current().unwrap().unwrap().get("name").unwrap().to_string());
        query.next();
    }
    assert_eq!(names, ["Delta", "Charlie", "Bravo"]);

    // Rewinding restarts over the same materialized rows.
    query.rewind();
    assert!(query.valid().unwrap());
    let first = query.current().unwrap().unwrap();
    assert_eq!(first.get("name").unwrap(), &Value::Text("Delta".into()));
    assert_eq!(query.count().unwrap(), 3);
}

#[test]
fn search_supports_text_and_rejects_strict_ranges() {
    connections::register("parity::search", SearchStorage::open_in_memory());

    for (subject, owner, sent) in [
        ("Quarterly report", 1, "2021-03-31 09:00:00"),
        ("Lunch plans", 2, "2021-04-01 11:30:00"),
    ] {
        let mut mail = Record::<Mail>::new().unwrap();
        mail.set("owner", owner).unwrap();
        mail.set("subject", subject).unwrap();
        mail.set("sent", parse_date_time(sent).unwrap()).unwrap();
        mail.save().unwrap();
    }

    let mut query = Record::<Mail>::find().unwrap();
    query.where_any_matches("report quarterly");
    let found = query.current().unwrap().unwrap();
    assert_eq!(found.get("owner").unwrap(), &Value::Integer(1));
    assert_eq!(
        found.get("sent").unwrap(),
        &Value::DateTime(parse_date_time("2021-03-31 09:00:00").unwrap())
    );

    let mut strict = Record::<Mail>::find().unwrap();
    strict.where_("owner", Condition::Lt, 2).unwrap();
    let err = strict.count().unwrap_err();
    assert!(matches!(
        err,
        CoreError::Storage(StorageError::UnsupportedCondition { .. })
    ));
}

#[test]
fn save_then_update_round_trip() {
    register_sql(
        "parity::update",
        "CREATE TABLE users (user_id INTEGER PRIMARY KEY, name TEXT, joined TEXT)",
    );

    struct UpdateUser;
    impl Model for UpdateUser {
        const NAME: &'static str = "parity::UpdateUser";
        const SCHEMA: &'static str = "
            @collection users
            @connection parity::update
            @property integer(11) id user_id - null unique
            @property string(255) name
            @property DateTime joined - null
        ";
    }

    let mut record = Record::<UpdateUser>::new().unwrap();
    record.set("name", "Original").unwrap();
    let id = record.save().unwrap().unwrap();

    record.set("id", id).unwrap();
    record.set("name", "Renamed").unwrap();
    record.save().unwrap();

    let mut query = Record::<UpdateUser>::find().unwrap();
    assert_eq!(query.count().unwrap(), 1);
    let stored = query.current().unwrap().unwrap();
    assert_eq!(stored.get("name").unwrap(), &Value::Text("Renamed".into()));
}
