//! A blank write clears the key once the owner is saved.

use crate::common::*;

#[test]
fn blank_write_clears_presence_after_save() {
    for blank in [Value::Null, Value::from(""), Value::from("   ")] {
        for (name, options) in all_strategies() {
            let db = db();
            let model = product_model(&db, options);
            let mut product = model.new_record().unwrap();
            product.set("price", &key("usd"), "ten").unwrap();
            let mut found = save_and_find(&model, &mut product);
            assert!(found.is_present("price", &key("usd")).unwrap(), "{}", name);

            found.set("price", &key("usd"), blank.clone()).unwrap();
            let mut again = save_and_find(&model, &mut found);
            assert!(
                !again.is_present("price", &key("usd")).unwrap(),
                "{} with {:?}",
                name,
                blank
            );
            assert!(again.keys("price").unwrap().is_empty(), "{}", name);
        }
    }
}

#[test]
fn blank_write_deletes_key_value_record() {
    let db = db();
    let model = product_model(&db, BackendOptions::key_value(ValueType::Text));
    let mut product = model.new_record().unwrap();
    product.set("price", &key("usd"), "ten").unwrap();
    product.set("price", &key("eur"), "zehn").unwrap();
    product.save().unwrap();
    assert_eq!(db.count("valuta_text_prices").unwrap(), 2);

    product.set("price", &key("usd"), Value::Null).unwrap();
    product.save().unwrap();
    assert_eq!(db.count("valuta_text_prices").unwrap(), 1);
}

#[test]
fn blank_write_on_new_record_never_persists() {
    let db = db();
    let model = product_model(&db, BackendOptions::key_value(ValueType::Text));
    let mut product = model.new_record().unwrap();
    product.set("price", &key("usd"), "").unwrap();
    product.save().unwrap();
    assert_eq!(db.count("valuta_text_prices").unwrap(), 0);
}

#[test]
fn blank_entries_are_stripped_from_hash_column() {
    let db = db();
    let model = product_model(&db, BackendOptions::json());
    let mut product = model.new_record().unwrap();
    product.set("price", &key("usd"), "ten").unwrap();
    product.set("price", &key("eur"), "").unwrap();
    product.save().unwrap();

    let row = db.get("products", product.id().unwrap()).unwrap().unwrap();
    let map = row.get("price").as_map().unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.contains_key("usd"));
}

#[test]
fn false_is_not_blank() {
    let db = db();
    let model = product_model(&db, BackendOptions::json());
    let mut product = model.new_record().unwrap();
    product.set("price", &key("usd"), false).unwrap();
    let mut found = save_and_find(&model, &mut product);
    assert!(found.is_present("price", &key("usd")).unwrap());
    assert_eq!(found.get("price", &key("usd")).unwrap(), Some(Value::Bool(false)));
}
