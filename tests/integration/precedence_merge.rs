//! Merged reads across ranks: scalar override, mapping deep-merge, and
//! family-scoped sequence merging.

use node_attrs::{path, NodeAttributes, Rank, TraceMode};
use serde_json::{json, Value};

fn attrs() -> NodeAttributes {
    NodeAttributes::new(TraceMode::None)
}

#[test]
fn test_default_then_override_scalar() {
    let mut attrs = attrs();
    attrs.default_mut().replace(json!({"a": 1})).unwrap();
    attrs.override_mut().replace(json!({"a": 2})).unwrap();
    assert_eq!(attrs.get("a").unwrap(), json!(2));
}

#[test]
fn test_every_rank_pair_respects_order_and_reverts_on_removal() {
    for (low_index, low) in Rank::ALL.iter().enumerate() {
        for high in &Rank::ALL[low_index + 1..] {
            let mut attrs = attrs();
            attrs.writer(*low).write(path!["k"], low.as_str());
            attrs.writer(*high).write(path!["k"], high.as_str());
            assert_eq!(attrs.get("k").unwrap(), json!(high.as_str()), "{} vs {}", low, high);

            attrs.writer(*high).unlink(path!["k"]);
            assert_eq!(attrs.get("k").unwrap(), json!(low.as_str()), "{} after removing {}", low, high);
        }
    }
}

#[test]
fn test_disjoint_nested_keys_all_appear() {
    let mut attrs = attrs();
    attrs.env_default_mut().write(path!["a", "b"], "d");
    attrs.normal_mut().write(path!["a", "c"], "n");
    attrs.automatic_mut().write(path!["a", "deep", "x"], 1);
    attrs.default_mut().write(path!["a", "deep", "y"], 2);

    assert_eq!(
        attrs.get("a").unwrap(),
        json!({"b": "d", "c": "n", "deep": {"x": 1, "y": 2}})
    );
}

#[test]
fn test_env_default_and_normal_mappings_merge() {
    let mut attrs = attrs();
    attrs.env_default_mut().replace(json!({"a": {"b": "d"}})).unwrap();
    attrs.normal_mut().replace(json!({"a": {"c": "n"}})).unwrap();
    assert_eq!(attrs.get("a").unwrap(), json!({"b": "d", "c": "n"}));
}

#[test]
fn test_default_family_sequences_concatenate_in_rank_order() {
    let mut attrs = attrs();
    attrs.force_default_mut().write(path!["list"], json!(["fd"]));
    attrs.role_default_mut().write(path!["list"], json!(["rd"]));
    attrs.env_default_mut().write(path!["list"], json!(["ed"]));
    attrs.default_mut().write(path!["list"], json!(["d"]));
    assert_eq!(attrs.get("list").unwrap(), json!(["d", "ed", "rd", "fd"]));
}

#[test]
fn test_override_family_sequences_concatenate_in_rank_order() {
    let mut attrs = attrs();
    attrs.force_override_mut().write(path!["list"], json!(["fo"]));
    attrs.override_mut().write(path!["list"], json!(["o"]));
    attrs.env_override_mut().write(path!["list"], json!(["eo"]));
    attrs.role_override_mut().write(path!["list"], json!(["ro"]));
    assert_eq!(attrs.get("list").unwrap(), json!(["o", "ro", "eo", "fo"]));
}

#[test]
fn test_role_default_and_env_default_sequences() {
    let mut attrs = attrs();
    attrs.role_default_mut().replace(json!({"list": ["x"]})).unwrap();
    attrs.env_default_mut().replace(json!({"list": ["y"]})).unwrap();
    assert_eq!(attrs.get("list").unwrap(), json!(["y", "x"]));
}

#[test]
fn test_override_family_replaces_normal_sequence() {
    let mut attrs = attrs();
    attrs.normal_mut().replace(json!({"list": ["n"]})).unwrap();
    attrs.role_override_mut().replace(json!({"list": ["r"]})).unwrap();
    assert_eq!(attrs.get("list").unwrap(), json!(["r"]));
}

#[test]
fn test_automatic_sequence_replaces_everything_below() {
    let mut attrs = attrs();
    attrs.default_mut().write(path!["list"], json!(["d"]));
    attrs.override_mut().write(path!["list"], json!(["o"]));
    attrs.automatic_mut().write(path!["list"], json!(["a"]));
    assert_eq!(attrs.get("list").unwrap(), json!(["a"]));
}

#[test]
fn test_sequences_are_not_deduplicated() {
    let mut attrs = attrs();
    attrs.default_mut().write(path!["list"], json!(["same"]));
    attrs.role_default_mut().write(path!["list"], json!(["same"]));
    assert_eq!(attrs.get("list").unwrap(), json!(["same", "same"]));
}

#[test]
fn test_scalar_at_highest_rank_hides_lower_mapping() {
    let mut attrs = attrs();
    attrs.default_mut().write(path!["a"], json!({"nested": true}));
    attrs.force_override_mut().write(path!["a"], false);
    assert_eq!(attrs.get("a").unwrap(), json!(false));
    assert!(attrs.read(path!["a", "nested"]).is_none());
}

#[test]
fn test_mapping_at_highest_rank_ignores_lower_scalar() {
    let mut attrs = attrs();
    attrs.default_mut().write(path!["a"], "flat");
    attrs.normal_mut().write(path!["a", "b"], 1);
    assert_eq!(attrs.get("a").unwrap(), json!({"b": 1}));
}

#[test]
fn test_combined_family_views() {
    let mut attrs = attrs();
    attrs.default_mut().write(path!["svc"], json!({"port": 80, "list": ["d"]}));
    attrs.role_default_mut().write(path!["svc", "list"], json!(["rd"]));
    attrs.normal_mut().write(path!["svc", "port"], 81);
    attrs.override_mut().write(path!["svc", "port"], 82);
    attrs.env_override_mut().write(path!["svc", "user"], "www");

    assert_eq!(
        attrs.combined_default(path!["svc"]).unwrap(),
        json!({"port": 80, "list": ["d", "rd"]})
    );
    assert_eq!(
        attrs.combined_override(path!["svc"]).unwrap(),
        json!({"port": 82, "user": "www"})
    );
    assert_eq!(
        attrs.get("svc").unwrap(),
        json!({"port": 82, "list": ["d", "rd"], "user": "www"})
    );
}

#[test]
fn test_sequence_elements_read_through_merged_path() {
    let mut attrs = attrs();
    attrs.default_mut().write(path!["servers"], json!([{"host": "a"}]));
    attrs.env_default_mut().write(path!["servers"], json!([{"host": "b"}]));
    assert_eq!(attrs.read(path!["servers", 1, "host"]).unwrap(), json!("b"));
    assert_eq!(attrs.read(path!["servers", -2, "host"]).unwrap(), json!("a"));
    assert!(attrs.read(path!["servers", 5]).is_none());
}

#[test]
fn test_iteration_and_membership() {
    let mut attrs = attrs();
    attrs.default_mut().write(path!["b"], 2);
    attrs.automatic_mut().write(path!["a"], 1);
    attrs.normal_mut().write(path!["c"], Value::Null);

    let pairs: Vec<(String, Value)> = attrs
        .iter()
        .map(|(key, value)| (key, value.to_mutable_copy()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
            ("c".to_string(), Value::Null),
        ]
    );
    assert!(attrs.contains_key("c"));
    assert!(!attrs.contains_key("d"));
    assert_eq!(attrs.len(), 3);
}
