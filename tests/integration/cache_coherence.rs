//! Cached merged reads always agree with a fresh merge, across every kind
//! of level mutation.

use node_attrs::{path, NodeAttributes, Rank, TraceMode};
use serde_json::json;

fn warmed() -> NodeAttributes {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs.default_mut().write(path!["svc", "port"], 80);
    attrs.default_mut().write(path!["other"], "kept");
    assert_eq!(attrs.get("svc").unwrap(), json!({"port": 80}));
    assert_eq!(attrs.get("other").unwrap(), json!("kept"));
    attrs
}

#[test]
fn test_nested_write_invalidates_top_level_entry() {
    let mut attrs = warmed();
    attrs.override_mut().write(path!["svc", "port"], 8080);
    assert_eq!(attrs.get("svc").unwrap(), json!({"port": 8080}));
}

#[test]
fn test_write_leaves_unrelated_keys_cached() {
    let mut attrs = warmed();
    attrs.normal_mut().write(path!["svc", "user"], "www");
    let before = attrs.cache_stats();

    assert_eq!(attrs.get("other").unwrap(), json!("kept"));
    let after = attrs.cache_stats();
    assert_eq!(after.hits, before.hits + 1);
}

#[test]
fn test_unlink_invalidates() {
    let mut attrs = warmed();
    attrs.default_mut().unlink(path!["svc", "port"]);
    assert_eq!(attrs.get("svc").unwrap(), json!({}));
}

#[test]
fn test_splice_invalidates() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    attrs.normal_mut().write(path!["list"], json!([1, 2]));
    assert_eq!(attrs.get("list").unwrap(), json!([1, 2]));

    attrs.normal_mut().splice(path!["list"], 0, 1, vec![json!(9)]);
    assert_eq!(attrs.get("list").unwrap(), json!([9, 2]));
}

#[test]
fn test_clear_and_replace_invalidate_everything() {
    let mut attrs = warmed();
    attrs.default_mut().clear();
    assert!(attrs.get("svc").is_none());
    assert!(attrs.get("other").is_none());

    attrs.default_mut().replace(json!({"svc": {"port": 1}})).unwrap();
    assert_eq!(attrs.get("svc").unwrap(), json!({"port": 1}));
}

#[test]
fn test_merge_in_invalidates() {
    let mut attrs = warmed();
    attrs.role_default_mut().merge_in(json!({"svc": {"tls": true}})).unwrap();
    assert_eq!(attrs.get("svc").unwrap(), json!({"port": 80, "tls": true}));
}

#[test]
fn test_rm_clears_every_rank_and_cache() {
    let mut attrs = warmed();
    for rank in Rank::ALL {
        attrs.writer(rank).write(path!["svc", "port"], rank.as_str());
    }
    assert_eq!(attrs.read(path!["svc", "port"]).unwrap(), json!("automatic"));

    attrs.rm(path!["svc", "port"]);
    assert!(attrs.read(path!["svc", "port"]).is_none());
    assert_eq!(attrs.get("svc").unwrap(), json!({}));
}

#[test]
fn test_cached_read_matches_fresh_merge_after_mixed_mutations() {
    let mut attrs = warmed();
    attrs.normal_mut().write(path!["svc", "list"], json!(["a"]));
    attrs.get("svc");
    attrs.force_default_mut().write(path!["svc", "list"], json!(["fd"]));
    attrs.get("svc");
    attrs.override_mut().write(path!["svc", "list"], json!(["o"]));

    let cached = attrs.get("svc").unwrap();
    let fresh = node_attrs::merge::resolve(
        &std::array::from_fn(|index| {
            let mut store = node_attrs::LevelStore::new(Rank::ALL[index]);
            store.write(path![], attrs.level(Rank::ALL[index]).to_json());
            store
        }),
        node_attrs::RankMask::ALL,
        path!["svc"],
    )
    .unwrap();
    assert_eq!(cached, fresh);
    assert_eq!(cached, json!({"port": 80, "list": ["o"]}));
}
