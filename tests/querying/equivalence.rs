//! Inferred joins return the same owners as joining everything OUTER.
//!
//! For predicates without negation an INNER join is only chosen when no
//! NULL-extended row could satisfy the filter, so tightening joins never
//! changes the result set.

use proptest::prelude::*;

use crate::common::*;

/// Keyed attributes reachable through a join, with their value kind.
const ATTRIBUTES: &[(&str, bool)] = &[
    ("title", true),
    ("content", true),
    ("amount", false),
    ("tax", false),
    ("net", false),
];
const KEYS: &[&str] = &["usd", "eur"];

fn literal(text: bool, n: u8) -> Value {
    if text {
        Value::from(format!("v{}", n))
    } else {
        Value::from(i64::from(n))
    }
}

/// Predicate shape, materialized against a model per case.
#[derive(Debug, Clone)]
enum Shape {
    Eq {
        attribute: usize,
        key: usize,
        value: Option<u8>,
    },
    And(Box<Shape>, Box<Shape>),
    Or(Box<Shape>, Box<Shape>),
}

impl Shape {
    fn to_node(&self, model: &Model) -> Node {
        match self {
            Shape::Eq {
                attribute,
                key: k,
                value,
            } => {
                let (name, text) = ATTRIBUTES[*attribute];
                let value = value.map_or(Value::Null, |n| literal(text, n));
                Node::equals(model.attr(name, &key(KEYS[*k])).unwrap(), value)
            }
            Shape::And(l, r) => l.to_node(model).and(r.to_node(model)),
            Shape::Or(l, r) => l.to_node(model).or(r.to_node(model)),
        }
    }
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = (0..ATTRIBUTES.len(), 0..KEYS.len(), proptest::option::of(0u8..2)).prop_map(
        |(attribute, key, value)| Shape::Eq {
            attribute,
            key,
            value,
        },
    );
    leaf.prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Shape::And(Box::new(l), Box::new(r))),
            (inner.clone(), inner).prop_map(|(l, r)| Shape::Or(Box::new(l), Box::new(r))),
        ]
    })
}

/// Per owner: one optional value per (attribute, key).
fn arb_owners() -> impl Strategy<Value = Vec<Vec<Option<u8>>>> {
    proptest::collection::vec(
        proptest::collection::vec(proptest::option::of(0u8..2), ATTRIBUTES.len() * KEYS.len()),
        1..5,
    )
}

fn populate(model: &Model, owners: &[Vec<Option<u8>>]) {
    for cells in owners {
        let mut post = model.new_record().unwrap();
        for (i, cell) in cells.iter().enumerate() {
            let (name, text) = ATTRIBUTES[i / KEYS.len()];
            if let Some(n) = cell {
                post.set(name, &key(KEYS[i % KEYS.len()]), literal(text, *n))
                    .unwrap();
            }
        }
        post.save().unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn inferred_joins_match_all_outer(owners in arb_owners(), shape in arb_shape()) {
        let (_db, model) = post_model();
        populate(&model, &owners);

        let query = model.filter(shape.to_node(&model)).unwrap();
        let inferred = ids(&model.load(&query).unwrap());
        let reference = ids(&model.load(&query.clone().all_outer()).unwrap());
        prop_assert_eq!(inferred, reference);
    }

    #[test]
    fn repeated_filter_keeps_join_set(shape in arb_shape()) {
        let (_db, model) = post_model();
        let node = shape.to_node(&model);
        let once = model.filter(node.clone()).unwrap();
        let twice = once.clone().filter(node).unwrap();
        prop_assert_eq!(once.joins(), twice.joins());
    }
}
