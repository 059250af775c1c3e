//! Frozen views: every mutator fails, nested containers stay frozen, and
//! mutable copies are independent.

use node_attrs::{path, AttributeError, FrozenMap, FrozenSeq, FrozenValue, NodeAttributes, TraceMode};
use serde_json::{json, Value};
use std::collections::BTreeSet;

fn merged() -> FrozenValue {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs
        .default_mut()
        .write(path!["root"], json!({"map": {"k": "v"}, "list": [3, 1, 2]}));
    attrs.get("root").unwrap()
}

fn operation(result: Result<(), AttributeError>) -> &'static str {
    match result {
        Err(AttributeError::ImmutableAttributeModification { operation }) => operation,
        other => panic!("expected ImmutableAttributeModification, got {:?}", other),
    }
}

fn map_mutations(map: &FrozenMap) -> Vec<&'static str> {
    vec![
        operation(map.insert("k", 1)),
        operation(map.remove("k").map(drop)),
        operation(map.clear()),
        operation(map.retain(|_, _| true)),
        operation(map.extend(json!({"x": 1}))),
        operation(map.replace(json!({}))),
        operation(map.shift().map(drop)),
        operation(map.map_values_in_place(|_, _| Value::Null)),
        operation(map.entry_or_insert("k", 1).map(drop)),
    ]
}

fn seq_mutations(seq: &FrozenSeq) -> Vec<&'static str> {
    vec![
        operation(seq.push(1)),
        operation(seq.pop().map(drop)),
        operation(seq.insert(0, 1)),
        operation(seq.remove(0).map(drop)),
        operation(seq.set(0, 1)),
        operation(seq.clear()),
        operation(seq.sort()),
        operation(seq.sort_by_key_in_place(|item| item.as_i64())),
        operation(seq.reverse()),
        operation(seq.retain(|_| true)),
        operation(seq.dedup()),
        operation(seq.truncate(0)),
        operation(seq.extend(vec![json!(1)])),
        operation(seq.fill(0)),
        operation(seq.shift().map(drop)),
        operation(seq.unshift(0)),
        operation(seq.compact()),
        operation(seq.flatten()),
        operation(seq.map_in_place(|_| Value::Null)),
        operation(seq.replace(vec![])),
    ]
}

#[test]
fn test_every_map_mutator_is_refused() {
    let root = merged();
    let map = root.as_map().unwrap();
    let refused: BTreeSet<_> = map_mutations(map).into_iter().collect();
    let published: BTreeSet<_> = FrozenMap::MUTATORS.iter().copied().collect();
    assert_eq!(refused, published);
}

#[test]
fn test_every_seq_mutator_is_refused() {
    let root = merged();
    let seq = root.get_path(path!["list"]).and_then(FrozenValue::as_seq).unwrap();
    let refused: BTreeSet<_> = seq_mutations(seq).into_iter().collect();
    let published: BTreeSet<_> = FrozenSeq::MUTATORS.iter().copied().collect();
    assert_eq!(refused, published);
}

#[test]
fn test_nested_containers_are_frozen_too() {
    let root = merged();
    let nested = root.get_path(path!["map"]).and_then(FrozenValue::as_map).unwrap();
    assert!(nested.insert("other", 1).is_err());
    assert_eq!(nested.get("k").unwrap(), &json!("v"));
}

#[test]
fn test_mutable_copy_is_independent() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs.default_mut().write(path!["root", "list"], json!([1]));

    let frozen = attrs.get("root").unwrap();
    let mut copy = frozen.to_mutable_copy();
    copy["list"].as_array_mut().unwrap().push(json!(2));
    copy["added"] = json!(true);

    assert_eq!(frozen, json!({"list": [1]}));
    assert_eq!(attrs.get("root").unwrap(), json!({"list": [1]}));
}

#[test]
fn test_transforms_return_new_frozen_values() {
    let root = merged();
    let seq = root.get_path(path!["list"]).and_then(FrozenValue::as_seq).unwrap();
    let sorted = seq.sorted_by_key(|item| item.as_i64());
    assert_eq!(FrozenValue::Seq(sorted), json!([1, 2, 3]));
    assert_eq!(FrozenValue::Seq(seq.clone()), json!([3, 1, 2]));

    let map = root.as_map().unwrap();
    assert_eq!(FrozenValue::Map(map.except(&["list"])), json!({"map": {"k": "v"}}));
}

#[test]
fn test_unscoped_write_on_root_is_refused() {
    let attrs = NodeAttributes::new(TraceMode::None);
    assert!(matches!(
        attrs.insert(path!["a"], 1),
        Err(AttributeError::ImmutableAttributeModification { operation: "insert" })
    ));
}
