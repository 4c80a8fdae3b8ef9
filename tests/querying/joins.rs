//! Joins chosen for predicates: INNER / OUTER tie-breaks, the shared
//! Table join, reuse and upgrade.

use crate::common::*;

const TITLE_USD: &str = "post.title.usd.text_prices";
const CONTENT_USD: &str = "post.content.usd.text_prices";
const PRICES_USD: &str = "post_prices.usd";
const NET_USD: &str = "post_net_prices.usd";

fn kind(query: &valuta::QueryBuilder, alias: &str) -> JoinType {
    query
        .join(alias)
        .unwrap_or_else(|| panic!("no join {}", alias))
        .kind
}

#[test]
fn and_on_one_attribute_is_inner() {
    let (_db, model) = post_model();
    let node = eq(&model, "title", "usd", "x").and(eq(&model, "title", "usd", Value::Null));
    let query = model.filter(node).unwrap();
    assert_eq!(query.joins().len(), 1);
    assert_eq!(kind(&query, TITLE_USD), JoinType::Inner);
}

#[test]
fn or_across_attributes_is_outer_for_both() {
    let (_db, model) = post_model();
    let node = eq(&model, "title", "usd", "x").or(eq(&model, "content", "usd", Value::Null));
    let query = model.filter(node).unwrap();
    assert_eq!(kind(&query, TITLE_USD), JoinType::Outer);
    assert_eq!(kind(&query, CONTENT_USD), JoinType::Outer);
}

#[test]
fn or_on_one_price_table_keeps_a_single_inner_join() {
    let (_db, model) = post_model();
    let node = eq(&model, "amount", "usd", 100).or(eq(&model, "tax", "usd", 5));
    let query = model.filter(node).unwrap();
    assert_eq!(query.joins().len(), 1);
    assert_eq!(kind(&query, PRICES_USD), JoinType::Inner);
}

#[test]
fn or_across_price_tables_is_outer_for_both() {
    let (_db, model) = post_model();
    let node = eq(&model, "amount", "usd", 100).or(eq(&model, "net", "usd", 5));
    let query = model.filter(node).unwrap();
    assert_eq!(query.joins().len(), 2);
    assert_eq!(kind(&query, PRICES_USD), JoinType::Outer);
    assert_eq!(kind(&query, NET_USD), JoinType::Outer);
}

#[test]
fn table_value_with_absent_sibling_is_inner() {
    let (_db, model) = post_model();
    let node = eq(&model, "amount", "usd", 100).and(eq(&model, "tax", "usd", Value::Null));
    let query = model.filter(node).unwrap();
    assert_eq!(query.joins().len(), 1);
    assert_eq!(kind(&query, PRICES_USD), JoinType::Inner);
}

#[test]
fn each_key_gets_its_own_join() {
    let (_db, model) = post_model();
    let node = eq(&model, "title", "usd", "x").and(eq(&model, "title", "jpy", Value::Null));
    let query = model.filter(node).unwrap();
    assert_eq!(kind(&query, TITLE_USD), JoinType::Inner);
    assert_eq!(kind(&query, "post.title.jpy.text_prices"), JoinType::Outer);
}

#[test]
fn owner_table_attributes_need_no_join() {
    let (_db, model) = post_model();
    let node = eq(&model, "price", "usd", 10).or(eq(&model, "notes", "eur", "n"));
    let query = model.filter(node).unwrap();
    assert!(query.joins().is_empty());
}

#[test]
fn applying_the_same_predicate_twice_is_idempotent() {
    let (_db, model) = post_model();
    let node = eq(&model, "title", "usd", "x").or(eq(&model, "amount", "usd", 1));
    let once = model.filter(node.clone()).unwrap();
    let twice = model.filter(node.clone()).unwrap().filter(node).unwrap();
    assert_eq!(once.joins(), twice.joins());
}

#[test]
fn outer_join_is_upgraded_never_downgraded() {
    let (_db, model) = post_model();
    let query = model
        .filter(eq(&model, "title", "usd", Value::Null))
        .unwrap();
    assert_eq!(kind(&query, TITLE_USD), JoinType::Outer);

    let query = query.filter(eq(&model, "title", "usd", "x")).unwrap();
    assert_eq!(query.joins().len(), 1);
    assert_eq!(kind(&query, TITLE_USD), JoinType::Inner);

    let query = query
        .filter(eq(&model, "title", "usd", Value::Null))
        .unwrap();
    assert_eq!(kind(&query, TITLE_USD), JoinType::Inner);
}

#[test]
fn negation_keeps_the_join_requirement() {
    let (_db, model) = post_model();
    let query = model
        .filter(eq(&model, "title", "usd", "x").negate())
        .unwrap();
    assert_eq!(kind(&query, TITLE_USD), JoinType::Inner);
}

#[test]
fn leaf_in_boolean_position_is_unsupported() {
    let (_db, model) = post_model();
    let title = model.attr("title", &key("usd")).unwrap();
    let node = Node::Attribute(title).and(eq(&model, "content", "usd", "x"));
    assert!(matches!(
        model.filter(node),
        Err(Error::UnsupportedPredicate(_))
    ));
}
