//! Shared fixtures for the querying suite.

#![allow(dead_code)]

use std::sync::{Arc, Once};

pub use valuta::{
    BackendOptions, Database, Error, JoinType, Key, Model, ModelBuilder, Node, Record, RowId,
    Value, ValueType,
};

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn key(raw: &str) -> Key {
    Key::new(raw).unwrap()
}

/// `Post` with attributes on every strategy:
/// - `title`, `content`: Key-Value (text)
/// - `amount`, `tax`: Table on `post_prices`
/// - `net`: Table on a second price table, `post_net_prices`
/// - `price`: Column (integer)
/// - `notes`: Json
pub fn post_model() -> (Arc<Database>, Model) {
    init_tracing();
    let db = Arc::new(Database::new());
    let model = ModelBuilder::new("Post", "posts")
        .attribute("title", BackendOptions::key_value(ValueType::Text))
        .attribute("content", BackendOptions::key_value(ValueType::Text))
        .attribute("amount", BackendOptions::table().with_value_type(ValueType::Integer))
        .attribute("tax", BackendOptions::table().with_value_type(ValueType::Integer))
        .attribute(
            "net",
            BackendOptions::table()
                .with_value_type(ValueType::Integer)
                .with_association("net_prices")
                .with_table_name("post_net_prices"),
        )
        .attribute(
            "price",
            BackendOptions::column().with_value_type(ValueType::Integer),
        )
        .attribute("notes", BackendOptions::json())
        .build(db.clone())
        .unwrap();
    (db, model)
}

/// Save a new post with `(attribute, key, value)` assignments.
pub fn create(model: &Model, values: &[(&str, &str, Value)]) -> RowId {
    let mut post = model.new_record().unwrap();
    for (attribute, raw_key, value) in values {
        post.set(attribute, &key(raw_key), value.clone()).unwrap();
    }
    post.save().unwrap();
    post.id().unwrap()
}

pub fn ids(records: &[Record]) -> Vec<RowId> {
    records.iter().filter_map(Record::id).collect()
}

/// `model.attr(name, key) = value`
pub fn eq(model: &Model, name: &str, raw_key: &str, value: impl Into<Value>) -> Node {
    Node::equals(model.attr(name, &key(raw_key)).unwrap(), value)
}
