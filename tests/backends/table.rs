//! Table strategy: one price record per (owner, key) holding every
//! attribute of the association.

use crate::common::*;

fn priced_model(db: &std::sync::Arc<Database>) -> Model {
    ModelBuilder::new("Product", "products")
        .attribute("amount", BackendOptions::table().with_value_type(ValueType::Integer))
        .attribute("tax", BackendOptions::table().with_value_type(ValueType::Integer))
        .build(db.clone())
        .unwrap()
}

#[test]
fn attributes_share_one_record_per_key() {
    let db = db();
    let model = priced_model(&db);
    let mut product = model.new_record().unwrap();
    product.set("amount", &key("usd"), 100).unwrap();
    product.set("tax", &key("usd"), 8).unwrap();
    product.set("amount", &key("eur"), 90).unwrap();
    product.save().unwrap();

    assert_eq!(db.count("product_prices").unwrap(), 2);
    let mut found = model.find(product.id().unwrap()).unwrap().unwrap();
    assert_eq!(found.get("tax", &key("usd")).unwrap(), Some(Value::Int(8)));
    assert_eq!(found.get("tax", &key("eur")).unwrap(), None);
    assert_eq!(found.keys("amount").unwrap(), vec![key("usd"), key("eur")]);
    assert_eq!(found.keys("tax").unwrap(), vec![key("usd")]);
}

#[test]
fn record_survives_while_any_attribute_is_present() {
    let db = db();
    let model = priced_model(&db);
    let mut product = model.new_record().unwrap();
    product.set("amount", &key("usd"), 100).unwrap();
    product.set("tax", &key("usd"), 8).unwrap();
    let mut found = save_and_find(&model, &mut product);

    found.set("tax", &key("usd"), Value::Null).unwrap();
    found.save().unwrap();
    assert_eq!(db.count("product_prices").unwrap(), 1);

    found.set("amount", &key("usd"), "").unwrap();
    found.save().unwrap();
    assert_eq!(db.count("product_prices").unwrap(), 0);
}

#[test]
fn foreign_key_defaults_to_owner_type() {
    let db = db();
    priced_model(&db);
    let columns = db.column_names("product_prices").unwrap();
    assert_eq!(columns, vec!["product_id", "key", "amount", "tax"]);
}

#[test]
fn custom_table_and_foreign_key() {
    let db = db();
    let model = ModelBuilder::new("Product", "products")
        .attribute(
            "amount",
            BackendOptions::table()
                .with_value_type(ValueType::Integer)
                .with_table_name("product_costs")
                .with_foreign_key("item_id")
                .with_association("costs"),
        )
        .build(db.clone())
        .unwrap();
    let mut product = model.new_record().unwrap();
    product.set("amount", &key("usd"), 3).unwrap();
    product.save().unwrap();

    let rows = db
        .select_where("product_costs", &[("item_id", Value::from(product.id().unwrap()))])
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("key"), &Value::from("usd"));
}

#[test]
fn attribute_named_like_a_price_column_is_misconfigured() {
    let db = db();
    let err = ModelBuilder::new("Product", "products")
        .attribute("key", BackendOptions::table())
        .build(db)
        .unwrap_err();
    assert!(matches!(err, Error::BackendMisconfigured { .. }));
}
