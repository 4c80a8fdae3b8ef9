//! Column strategy: one owner column per key.

use crate::common::*;

/// Owner table managed by the host with only `price_usd` and `price_eur`.
fn hand_migrated(db: &std::sync::Arc<Database>) -> Model {
    db.create_table(
        valuta::TableSchema::new("products")
            .column("price_usd", ColumnType::Integer)
            .column("price_eur", ColumnType::Integer),
    )
    .unwrap();
    ModelBuilder::new("Product", "products")
        .attribute(
            "price",
            BackendOptions::column().with_value_type(ValueType::Integer),
        )
        .migrate(false)
        .build(db.clone())
        .unwrap()
}

#[test]
fn write_to_unmapped_key_is_ignored() {
    let db = db();
    let model = hand_migrated(&db);
    let mut product = model.new_record().unwrap();

    assert_eq!(product.set("price", &key("chf"), 10).unwrap(), None);
    assert_eq!(product.get("price", &key("chf")).unwrap(), None);
    assert!(!product.is_present("price", &key("chf")).unwrap());

    product.save().unwrap();
    let columns = db.column_names("products").unwrap();
    assert!(!columns.iter().any(|c| c == "price_chf"));
}

#[test]
fn keys_come_from_mapped_columns_in_order() {
    let db = db();
    let model = hand_migrated(&db);
    let mut product = model.new_record().unwrap();
    product.set("price", &key("usd"), 12).unwrap();
    product.set("price", &key("eur"), 11).unwrap();

    let mut found = save_and_find(&model, &mut product);
    assert_eq!(found.keys("price").unwrap(), vec![key("eur"), key("usd")]);
}

#[test]
fn host_added_column_adds_a_key() {
    let db = db();
    let model = hand_migrated(&db);
    let xau = valuta::TableSchema::new("products").column("price_xau", ColumnType::Integer);
    db.apply(&valuta_storage::SchemaRequirement::Table(xau)).unwrap();

    let mut product = model.new_record().unwrap();
    product.set("price", &key("usd"), 12).unwrap();
    product.set_column("price_xau", 3).unwrap();

    let mut found = save_and_find(&model, &mut product);
    assert!(!KeySet::default().contains(&key("xau")));
    assert_eq!(found.keys("price").unwrap(), vec![key("usd"), key("xau")]);
}

#[test]
fn values_are_coerced_to_the_column_type() {
    let db = db();
    let model = hand_migrated(&db);
    let mut product = model.new_record().unwrap();

    assert_eq!(
        product.set("price", &key("usd"), "42").unwrap(),
        Some(Value::Int(42))
    );
    let err = product.set("price", &key("usd"), "forty-two").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn migrated_model_has_a_column_per_available_key() {
    let db = db();
    product_model(&db, BackendOptions::column());
    let columns = db.column_names("products").unwrap();
    for key in KeySet::default().iter() {
        let expected = format!("price_{}", key);
        assert!(columns.contains(&expected), "missing {}", expected);
    }
}
