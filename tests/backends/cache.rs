//! The cache layer memoizes reads per key until a lifecycle event.

use valuta::AccessOptions;

use crate::common::*;

fn saved_product(db: &std::sync::Arc<Database>, options: BackendOptions) -> (Model, valuta::RowId) {
    let model = product_model(db, options);
    let mut product = model.new_record().unwrap();
    product.set("price", &key("usd"), "ten").unwrap();
    product.save().unwrap();
    let id = product.id().unwrap();
    (model, id)
}

#[test]
fn repeated_reads_load_the_association_once() {
    let db = db();
    let (model, id) = saved_product(&db, BackendOptions::key_value(ValueType::Text));
    let mut found = model.find(id).unwrap().unwrap();

    let before = db.stats();
    for _ in 0..5 {
        assert_eq!(found.get("price", &key("usd")).unwrap(), Some(Value::from("ten")));
        assert_eq!(found.get("price", &key("eur")).unwrap(), None);
    }
    let after = db.stats();
    assert_eq!(after.selects - before.selects, 1);
}

#[test]
fn cached_value_survives_storage_change_until_reload() {
    let db = db();
    let (model, id) = saved_product(&db, BackendOptions::key_value(ValueType::Text));
    let mut found = model.find(id).unwrap().unwrap();
    assert_eq!(found.get("price", &key("usd")).unwrap(), Some(Value::from("ten")));

    // Remove the price behind the record's back.
    let removed = db
        .delete_where("valuta_text_prices", &[("owner_id", Value::from(id))])
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(found.get("price", &key("usd")).unwrap(), Some(Value::from("ten")));

    found.reload().unwrap();
    assert_eq!(found.get("price", &key("usd")).unwrap(), None);
}

#[test]
fn bypass_reads_through_to_storage() {
    let db = db();
    let (model, id) = saved_product(&db, BackendOptions::json());
    let mut found = model.find(id).unwrap().unwrap();

    let mut price = found.accessor("price").unwrap();
    assert_eq!(price.get(&key("usd")).unwrap(), Some(Value::from("ten")));
    price
        .set_with(&key("usd"), Value::from("eleven"), &AccessOptions::uncached())
        .unwrap();

    // The cached read predates the uncached write.
    assert_eq!(price.get(&key("usd")).unwrap(), Some(Value::from("ten")));
    assert_eq!(
        price
            .get_with(&key("usd"), &AccessOptions::uncached())
            .unwrap(),
        Some(Value::from("eleven"))
    );
}

#[test]
fn uncached_hash_attribute_reads_live_values() {
    let db = db();
    let (model, id) = saved_product(&db, BackendOptions::json().with_cache(false));
    let mut found = model.find(id).unwrap().unwrap();

    let mut price = found.accessor("price").unwrap();
    assert_eq!(price.get(&key("usd")).unwrap(), Some(Value::from("ten")));
    price
        .set_with(&key("usd"), Value::from("eleven"), &AccessOptions::uncached())
        .unwrap();
    assert_eq!(price.get(&key("usd")).unwrap(), Some(Value::from("eleven")));
}

#[test]
fn save_clears_the_cache() {
    let db = db();
    let (model, id) = saved_product(&db, BackendOptions::key_value(ValueType::Text));
    let mut found = model.find(id).unwrap().unwrap();
    found.get("price", &key("usd")).unwrap();
    found.save().unwrap();

    let before = db.stats();
    assert_eq!(found.get("price", &key("usd")).unwrap(), Some(Value::from("ten")));
    // Association stays loaded across save; only the cache was dropped.
    assert_eq!(db.stats().selects, before.selects);
}

#[test]
fn key_value_without_cache_is_rejected() {
    let db = db();
    let err = ModelBuilder::new("Product", "products")
        .attribute(
            "price",
            BackendOptions::key_value(ValueType::Text).with_cache(false),
        )
        .build(db)
        .unwrap_err();
    assert!(matches!(err, Error::CacheRequired { .. }));
}
