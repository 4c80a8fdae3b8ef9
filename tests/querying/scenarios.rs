//! Query results against stored owners.

use crate::common::*;

#[test]
fn key_value_find_by_respects_the_key() {
    let (_db, model) = post_model();
    let first = create(&model, &[("title", "usd", Value::from("foo"))]);
    create(&model, &[]);

    let found = model.find_by(&[("title", Value::from("foo"))], &key("usd")).unwrap();
    assert_eq!(ids(&found), vec![first]);

    let found = model.find_by(&[("title", Value::from("foo"))], &key("jpy")).unwrap();
    assert!(found.is_empty());
}

#[test]
fn key_value_null_matches_owners_without_a_value() {
    let (_db, model) = post_model();
    create(&model, &[("title", "usd", Value::from("foo"))]);
    let second = create(&model, &[]);
    let third = create(&model, &[("title", "jpy", Value::from("bar"))]);

    let found = model.find_by(&[("title", Value::Null)], &key("usd")).unwrap();
    assert_eq!(ids(&found), vec![second, third]);
}

#[test]
fn table_value_with_absent_sibling() {
    let (_db, model) = post_model();
    let matching = create(&model, &[("amount", "usd", Value::from(100))]);
    create(&model, &[("amount", "usd", Value::from(100)), ("tax", "usd", Value::from(8))]);
    create(&model, &[("amount", "usd", Value::from(90))]);
    create(&model, &[]);

    let query = model
        .filter(eq(&model, "amount", "usd", 100).and(eq(&model, "tax", "usd", Value::Null)))
        .unwrap();
    assert!(query.joins().iter().all(|j| j.kind == JoinType::Inner));
    assert_eq!(ids(&model.load(&query).unwrap()), vec![matching]);
}

#[test]
fn or_across_attributes_keeps_owners_without_records() {
    let (_db, model) = post_model();
    let with_title = create(&model, &[("title", "usd", Value::from("x"))]);
    let bare = create(&model, &[]);
    let with_content = create(&model, &[("content", "usd", Value::from("c"))]);

    let query = model
        .filter(eq(&model, "title", "usd", "x").or(eq(&model, "content", "usd", Value::Null)))
        .unwrap();
    let found = ids(&model.load(&query).unwrap());
    assert_eq!(found, vec![with_title, bare]);
    assert!(!found.contains(&with_content));
}

#[test]
fn contradictory_and_matches_nothing() {
    let (_db, model) = post_model();
    create(&model, &[("title", "usd", Value::from("x"))]);
    create(&model, &[]);

    let query = model
        .filter(eq(&model, "title", "usd", "x").and(eq(&model, "title", "usd", Value::Null)))
        .unwrap();
    assert!(model.load(&query).unwrap().is_empty());
}

#[test]
fn one_price_table_or_matches_either_column() {
    let (_db, model) = post_model();
    let by_amount = create(&model, &[("amount", "usd", Value::from(100))]);
    let by_tax = create(&model, &[("amount", "usd", Value::from(1)), ("tax", "usd", Value::from(5))]);
    create(&model, &[("amount", "eur", Value::from(100))]);

    let query = model
        .filter(eq(&model, "amount", "usd", 100).or(eq(&model, "tax", "usd", 5)))
        .unwrap();
    assert_eq!(ids(&model.load(&query).unwrap()), vec![by_amount, by_tax]);
}

#[test]
fn mixed_keys_in_one_predicate() {
    let (_db, model) = post_model();
    let only_usd = create(&model, &[("title", "usd", Value::from("Hello"))]);
    create(
        &model,
        &[("title", "usd", Value::from("Hello")), ("title", "jpy", Value::from("Konnichiwa"))],
    );

    let query = model
        .filter(eq(&model, "title", "usd", "Hello").and(eq(&model, "title", "jpy", Value::Null)))
        .unwrap();
    assert_eq!(ids(&model.load(&query).unwrap()), vec![only_usd]);
}

#[test]
fn negation_excludes_owners_without_a_value() {
    let (_db, model) = post_model();
    create(&model, &[("title", "usd", Value::from("x"))]);
    let other = create(&model, &[("title", "usd", Value::from("y"))]);
    create(&model, &[]);

    let query = model.filter(eq(&model, "title", "usd", "x").negate()).unwrap();
    assert_eq!(ids(&model.load(&query).unwrap()), vec![other]);
}

#[test]
fn owner_table_strategies_are_queryable() {
    let (_db, model) = post_model();
    let cheap = create(
        &model,
        &[("price", "usd", Value::from(10)), ("notes", "usd", Value::from("sale"))],
    );
    create(&model, &[("price", "usd", Value::from(20))]);

    let found = model.find_by(&[("price", Value::from(10))], &key("usd")).unwrap();
    assert_eq!(ids(&found), vec![cheap]);

    let found = model.find_by(&[("notes", Value::from("sale"))], &key("usd")).unwrap();
    assert_eq!(ids(&found), vec![cheap]);
}

#[test]
fn composed_filters_are_anded() {
    let (_db, model) = post_model();
    let both = create(
        &model,
        &[("title", "usd", Value::from("x")), ("amount", "usd", Value::from(3))],
    );
    create(&model, &[("title", "usd", Value::from("x"))]);

    let query = model
        .filter(eq(&model, "title", "usd", "x"))
        .unwrap()
        .filter(eq(&model, "amount", "usd", 3))
        .unwrap();
    assert_eq!(ids(&model.load(&query).unwrap()), vec![both]);
}

#[test]
fn hydrated_records_read_their_values() {
    let (_db, model) = post_model();
    create(
        &model,
        &[("title", "usd", Value::from("x")), ("amount", "usd", Value::from(3))],
    );

    let mut found = model.find_by(&[("title", Value::from("x"))], &key("usd")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("amount", &key("usd")).unwrap(), Some(Value::Int(3)));
}
