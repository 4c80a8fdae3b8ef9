//! Shared fixtures for the backend suite.

#![allow(dead_code)]

use std::sync::{Arc, Once};

pub use valuta::{
    BackendOptions, ColumnType, Database, Error, Key, KeySet, Model, ModelBuilder, Record, Value,
    ValueType,
};

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output to the test writer (once per process).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

pub fn db() -> Arc<Database> {
    init_tracing();
    Arc::new(Database::new())
}

pub fn key(raw: &str) -> Key {
    Key::new(raw).unwrap()
}

/// One text-valued declaration per storage strategy.
pub fn all_strategies() -> Vec<(&'static str, BackendOptions)> {
    vec![
        ("column", BackendOptions::column()),
        ("json", BackendOptions::json()),
        ("hstore", BackendOptions::hstore()),
        ("key_value", BackendOptions::key_value(ValueType::Text)),
        ("table", BackendOptions::table()),
    ]
}

/// `Product` with a single keyed `price` attribute.
pub fn product_model(db: &Arc<Database>, options: BackendOptions) -> Model {
    ModelBuilder::new("Product", "products")
        .column("name", ColumnType::Text)
        .attribute("price", options)
        .build(db.clone())
        .unwrap()
}

/// Save `record` and load a fresh copy of it.
pub fn save_and_find(model: &Model, record: &mut Record) -> Record {
    record.save().unwrap();
    model.find(record.id().unwrap()).unwrap().unwrap()
}
