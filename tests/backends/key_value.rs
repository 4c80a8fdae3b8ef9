//! Key-Value strategy: shared polymorphic side tables.

use crate::common::*;

fn post_model(db: &std::sync::Arc<Database>) -> Model {
    ModelBuilder::new("Post", "posts")
        .attribute("title", BackendOptions::key_value(ValueType::Text))
        .attribute("views", BackendOptions::key_value(ValueType::Integer))
        .build(db.clone())
        .unwrap()
}

#[test]
fn value_type_selects_the_shared_table() {
    let db = db();
    let model = post_model(&db);
    let mut post = model.new_record().unwrap();
    post.set("title", &key("usd"), "Hello").unwrap();
    post.set("views", &key("usd"), "42").unwrap();
    post.save().unwrap();

    assert_eq!(db.count("valuta_text_prices").unwrap(), 1);
    assert_eq!(db.count("valuta_integer_prices").unwrap(), 1);
    let mut found = model.find(post.id().unwrap()).unwrap().unwrap();
    assert_eq!(found.get("views", &key("usd")).unwrap(), Some(Value::Int(42)));
}

#[test]
fn uncoercible_value_is_a_type_mismatch() {
    let db = db();
    let model = post_model(&db);
    let mut post = model.new_record().unwrap();
    let err = post.set("views", &key("usd"), "lots").unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { expected: "integer", .. }));
}

#[test]
fn float_outside_integer_range_is_a_type_mismatch() {
    let db = db();
    let model = post_model(&db);
    let mut post = model.new_record().unwrap();
    for x in [1e20, -1e20] {
        let err = post.set("views", &key("usd"), x).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { expected: "integer", .. }));
    }
    assert_eq!(post.get("views", &key("usd")).unwrap(), None);
}

#[test]
fn attributes_sharing_a_table_stay_separate() {
    let db = db();
    let model = ModelBuilder::new("Post", "posts")
        .attribute("title", BackendOptions::key_value(ValueType::Text))
        .attribute("content", BackendOptions::key_value(ValueType::Text))
        .build(db.clone())
        .unwrap();
    let mut post = model.new_record().unwrap();
    post.set("title", &key("usd"), "Title").unwrap();
    post.set("content", &key("eur"), "Inhalt").unwrap();

    let mut found = save_and_find(&model, &mut post);
    assert_eq!(found.keys("title").unwrap(), vec![key("usd")]);
    assert_eq!(found.keys("content").unwrap(), vec![key("eur")]);
    assert_eq!(found.get("title", &key("eur")).unwrap(), None);
}

#[test]
fn owners_of_different_types_do_not_collide() {
    let db = db();
    let posts = post_model(&db);
    let pages = ModelBuilder::new("Page", "pages")
        .attribute("title", BackendOptions::key_value(ValueType::Text))
        .build(db.clone())
        .unwrap();

    let mut post = posts.new_record().unwrap();
    post.set("title", &key("usd"), "Post title").unwrap();
    post.save().unwrap();
    let mut page = pages.new_record().unwrap();
    page.set("title", &key("usd"), "Page title").unwrap();
    page.save().unwrap();
    assert_eq!(post.id(), page.id());

    let mut found_page = pages.find(page.id().unwrap()).unwrap().unwrap();
    assert_eq!(
        found_page.get("title", &key("usd")).unwrap(),
        Some(Value::from("Page title"))
    );

    post.destroy().unwrap();
    assert_eq!(db.count("valuta_text_prices").unwrap(), 1);
    let mut found_page = pages.find(page.id().unwrap()).unwrap().unwrap();
    assert!(found_page.is_present("title", &key("usd")).unwrap());
}

#[test]
fn read_of_new_owner_issues_no_query() {
    let db = db();
    let model = post_model(&db);
    let mut post = model.new_record().unwrap();
    let before = db.stats();
    assert_eq!(post.get("title", &key("usd")).unwrap(), None);
    assert_eq!(db.stats().selects, before.selects);
}

#[test]
fn missing_value_type_and_table_is_misconfigured() {
    let db = db();
    let err = ModelBuilder::new("Post", "posts")
        .attribute("title", BackendOptions::strategy(valuta::Strategy::KeyValue))
        .build(db)
        .unwrap_err();
    assert!(matches!(err, Error::BackendMisconfigured { .. }));
}
