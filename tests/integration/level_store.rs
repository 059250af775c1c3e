//! Level store primitives through the rank writers.

use node_attrs::{path, AttributeError, LevelStore, NodeAttributes, NodeKind, Rank, TraceMode};
use serde_json::{json, Value};

#[test]
fn test_permissive_read_never_fails() {
    let mut store = LevelStore::new(Rank::Normal);
    store.write(path!["a"], "scalar");
    assert!(store.read(path!["missing", "deeper"]).is_none());
    assert!(store.read(path!["a", "through_scalar"]).is_none());
}

#[test]
fn test_strict_read_reports_missing_path() {
    let store = LevelStore::new(Rank::Normal);
    assert_eq!(
        store.read_strict(path!["x", "y"]).unwrap_err(),
        AttributeError::NoSuchAttribute {
            path: "/x/y".to_string()
        }
    );
}

#[test]
fn test_exists_for_null_value() {
    let mut store = LevelStore::new(Rank::Default);
    store.write(path!["nothing"], Value::Null);
    assert!(store.exists(path!["nothing"]));
    assert!(!store.exists(path!["other"]));
}

#[test]
fn test_permissive_write_replaces_incompatible_intermediate() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs.normal_mut().write(path!["a"], 1);
    attrs.normal_mut().write(path!["a", "b"], 2);
    assert_eq!(attrs.level(Rank::Normal).to_json(), json!({"a": {"b": 2}}));
}

#[test]
fn test_strict_write_raises_and_leaves_tree_unchanged() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs.normal_mut().write(path!["a"], json!(["x"]));
    let before = attrs.level(Rank::Normal).to_json();

    let err = attrs
        .normal_mut()
        .write_strict(path!["a", "b", "c"], 1)
        .unwrap_err();
    assert!(matches!(err, AttributeError::AttributeTypeMismatch { .. }));
    assert_eq!(attrs.level(Rank::Normal).to_json(), before);
}

#[test]
fn test_strict_write_vivifies_when_compatible() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    assert!(attrs.default_mut().write_strict(path!["a", "b"], 1).unwrap());
    assert_eq!(attrs.level(Rank::Default).to_json(), json!({"a": {"b": 1}}));
}

#[test]
fn test_unlink_and_unlink_strict() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs.default_mut().write(path!["a", "b"], 1);

    assert_eq!(attrs.default_mut().unlink(path!["a", "b"]), Some(json!(1)));
    assert_eq!(attrs.default_mut().unlink(path!["a", "b"]), None);
    assert!(matches!(
        attrs.default_mut().unlink_strict(path!["a", "b"]),
        Err(AttributeError::NoSuchAttribute { .. })
    ));
}

#[test]
fn test_slice_read_and_splice() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs.normal_mut().write(path!["list"], json!([1, 2, 3, 4]));

    assert_eq!(
        attrs.normal_mut().read_slice(path!["list"], 1, 2),
        Some(vec![json!(2), json!(3)])
    );
    attrs
        .normal_mut()
        .splice(path!["list"], 1, 2, vec![json!("a"), json!("b"), json!("c")]);
    assert_eq!(
        attrs.level(Rank::Normal).to_json(),
        json!({"list": [1, "a", "b", "c", 4]})
    );
    assert_eq!(attrs.get("list").unwrap(), json!([1, "a", "b", "c", 4]));
}

#[test]
fn test_assigned_containers_become_managed_nodes() {
    let mut store = LevelStore::new(Rank::Override);
    store.write(path!["cfg"], json!({"inner": {"list": [{"leaf": true}]}}));

    let leaf = store.read(path!["cfg", "inner", "list", 0, "leaf"]).unwrap();
    assert_eq!(leaf.path(), "/cfg/inner/list/0/leaf");
    assert_eq!(store.find_path_to_entry(leaf.id()).unwrap(), "/cfg/inner/list/0/leaf");

    let list = store.read(path!["cfg", "inner", "list"]).unwrap();
    assert_eq!(list.kind(), NodeKind::Seq);
    assert_eq!(leaf.parent().unwrap().parent().unwrap().id(), list.id());
}

#[test]
fn test_replace_requires_mapping() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    assert!(matches!(
        attrs.default_mut().replace(json!([1])),
        Err(AttributeError::AttributeTypeMismatch { .. })
    ));
}
