//! write(k, v); read(k) == v for every strategy, before and after a save.

use crate::common::*;

#[test]
fn write_then_read_in_memory() {
    for (name, options) in all_strategies() {
        let db = db();
        let model = product_model(&db, options);
        let mut product = model.new_record().unwrap();

        let stored = product.set("price", &key("usd"), "ten").unwrap();
        assert_eq!(stored, Some(Value::from("ten")), "{}", name);
        assert_eq!(
            product.get("price", &key("usd")).unwrap(),
            Some(Value::from("ten")),
            "{}",
            name
        );
        assert_eq!(product.get("price", &key("eur")).unwrap(), None, "{}", name);
    }
}

#[test]
fn write_then_read_after_save() {
    for (name, options) in all_strategies() {
        let db = db();
        let model = product_model(&db, options);
        let mut product = model.new_record().unwrap();
        product.set("price", &key("usd"), "ten").unwrap();
        product.set("price", &key("jpy"), "sen").unwrap();

        let mut found = save_and_find(&model, &mut product);
        assert_eq!(
            found.get("price", &key("usd")).unwrap(),
            Some(Value::from("ten")),
            "{}",
            name
        );
        assert_eq!(
            found.get("price", &key("jpy")).unwrap(),
            Some(Value::from("sen")),
            "{}",
            name
        );
        assert_eq!(found.keys("price").unwrap().len(), 2, "{}", name);
    }
}

#[test]
fn overwrite_keeps_one_value_per_key() {
    for (name, options) in all_strategies() {
        let db = db();
        let model = product_model(&db, options);
        let mut product = model.new_record().unwrap();
        product.set("price", &key("usd"), "ten").unwrap();
        let mut found = save_and_find(&model, &mut product);

        found.set("price", &key("usd"), "eleven").unwrap();
        let mut again = save_and_find(&model, &mut found);
        assert_eq!(
            again.get("price", &key("usd")).unwrap(),
            Some(Value::from("eleven")),
            "{}",
            name
        );
        assert_eq!(again.keys("price").unwrap(), vec![key("usd")], "{}", name);
    }
}

#[test]
fn unavailable_key_is_rejected() {
    let db = db();
    let model = ModelBuilder::new("Product", "products")
        .defaults(valuta::DeclarationDefaults {
            keys: std::sync::Arc::new(KeySet::new(["usd", "eur"]).unwrap()),
            ..valuta::DeclarationDefaults::default()
        })
        .attribute("price", BackendOptions::key_value(ValueType::Text))
        .build(db)
        .unwrap();
    let mut product = model.new_record().unwrap();

    let err = product.set("price", &key("jpy"), "x").unwrap_err();
    assert!(matches!(err, Error::InvalidKey { .. }));
    assert!(product.get("price", &key("jpy")).is_err());
}

#[test]
fn accessor_reports_strategy() {
    for (name, options) in all_strategies() {
        let db = db();
        let model = product_model(&db, options);
        let mut product = model.new_record().unwrap();
        let accessor = product.accessor("price").unwrap();
        assert_eq!(accessor.attribute(), "price");
        let expected = match name {
            "json" | "hstore" => "hash_valued",
            other => other,
        };
        assert_eq!(accessor.strategy(), expected);
    }
}
