//! A full hydration pass: facts and payload, stored record, roles,
//! environment, then cookbook attribute files.

use node_attrs::hydrate::{
    apply_cookbook_attributes, apply_environment, apply_role, apply_stored_record,
    consume_external_attrs, AttributeWrite, CommandLinePayload, CookbookAttributeFile,
    EnvironmentAttributes, RoleAttributes, StoredNodeRecord,
};
use node_attrs::{path, Mechanism, NodeAttributes, Rank, TraceMode};
use serde_json::json;

fn hydrated() -> (NodeAttributes, Option<Vec<String>>) {
    let mut attrs = NodeAttributes::new(TraceMode::All);

    let payload = CommandLinePayload {
        path: Some("/etc/node-attrs/first-boot.json".to_string()),
        attributes: json!({"recipes": "nginx::default", "nginx": {"workers": 2}}),
    };
    let run_list = consume_external_attrs(
        &mut attrs,
        json!({"platform": "ubuntu", "nginx": {"version": "1.24"}}),
        Some(&payload),
    )
    .unwrap();

    let record: StoredNodeRecord = serde_json::from_value(json!({
        "name": "web01",
        "server_url": "https://config.example.net",
        "normal": {"nginx": {"workers": 4}, "tags": ["prod"]},
        "override": {"nginx": {"user": "www-data"}}
    }))
    .unwrap();
    apply_stored_record(&mut attrs, &record).unwrap();

    for role in [
        RoleAttributes {
            name: "base".to_string(),
            default_attributes: Some(json!({"nginx": {"ports": [80]}, "ntp": {"server": "pool"}})),
            override_attributes: None,
        },
        RoleAttributes {
            name: "web".to_string(),
            default_attributes: Some(json!({"nginx": {"ports": [443]}})),
            override_attributes: Some(json!({"nginx": {"gzip": true}})),
        },
    ] {
        apply_role(&mut attrs, &role).unwrap();
    }

    apply_environment(
        &mut attrs,
        &EnvironmentAttributes {
            name: "production".to_string(),
            default_attributes: Some(json!({"ntp": {"server": "prod-ntp"}})),
            override_attributes: Some(json!({"nginx": {"gzip": false}})),
        },
    )
    .unwrap();

    apply_cookbook_attributes(
        &mut attrs,
        &CookbookAttributeFile {
            cookbook: "nginx".to_string(),
            version: Some("3.1.0".to_string()),
            file: "attributes/default.rb".to_string(),
            writes: vec![
                AttributeWrite {
                    line: 1,
                    rank: Rank::Default,
                    path: "/nginx/ports".to_string(),
                    value: json!([8080]),
                    strict: false,
                },
                AttributeWrite {
                    line: 2,
                    rank: Rank::Default,
                    path: "/nginx/workers".to_string(),
                    value: json!(1),
                    strict: true,
                },
            ],
        },
    )
    .unwrap();

    (attrs, run_list)
}

#[test]
fn test_run_list_taken_from_recipes_key() {
    let (attrs, run_list) = hydrated();
    assert_eq!(run_list, Some(vec!["nginx::default".to_string()]));
    assert!(attrs.get("recipes").is_none());
}

#[test]
fn test_payload_normal_survives_stored_record() {
    let (attrs, _) = hydrated();
    assert_eq!(
        attrs.level(Rank::Normal).to_json(),
        json!({"nginx": {"workers": 2}, "tags": ["prod"]})
    );
}

#[test]
fn test_payload_keys_absent_from_record_are_kept() {
    let mut attrs = NodeAttributes::new(TraceMode::None);
    let payload = CommandLinePayload {
        path: None,
        attributes: json!({"app": {"debug": true}}),
    };
    consume_external_attrs(&mut attrs, json!({}), Some(&payload)).unwrap();

    let record = StoredNodeRecord {
        name: "web02".to_string(),
        normal: Some(json!({"tags": ["x"]})),
        ..Default::default()
    };
    apply_stored_record(&mut attrs, &record).unwrap();

    assert_eq!(attrs.read(path!["app", "debug"]).unwrap(), json!(true));
    assert_eq!(attrs.get("tags").unwrap(), json!(["x"]));
}

#[test]
fn test_merged_view_after_every_phase() {
    let (attrs, _) = hydrated();
    assert_eq!(
        attrs.get("nginx").unwrap(),
        json!({
            "version": "1.24",
            "workers": 2,
            "user": "www-data",
            "gzip": false,
            "ports": [8080, 443]
        })
    );
    assert_eq!(attrs.read(path!["ntp", "server"]).unwrap(), json!("prod-ntp"));
    assert_eq!(attrs.get("platform").unwrap(), json!("ubuntu"));
}

#[test]
fn test_each_phase_is_attributed() {
    let (attrs, _) = hydrated();

    let mechanisms = |path: &str| -> Vec<Mechanism> {
        attrs
            .trace_entries(path)
            .into_iter()
            .map(|entry| entry.mechanism)
            .collect()
    };
    assert_eq!(mechanisms("/platform"), vec![Mechanism::ExternalFacts]);
    assert_eq!(
        mechanisms("/nginx/workers"),
        vec![
            Mechanism::CommandLinePayload,
            Mechanism::StoredNodeRecord,
            Mechanism::InternalMerge,
            Mechanism::CookbookAttributeFile,
        ]
    );
    assert_eq!(
        mechanisms("/nginx/gzip"),
        vec![Mechanism::Role, Mechanism::Environment]
    );

    let record_entry = &attrs.trace_entries("/nginx/user")[0];
    assert_eq!(record_entry.source.node_name.as_deref(), Some("web01"));
    assert_eq!(
        record_entry.source.server_url.as_deref(),
        Some("https://config.example.net")
    );
}

#[test]
fn test_debug_value_shows_every_rank() {
    let (attrs, _) = hydrated();
    let debug = attrs.debug_value(path!["nginx", "gzip"]);
    assert_eq!(debug.levels.len(), Rank::COUNT);

    let set: Vec<(Rank, serde_json::Value)> = debug
        .levels
        .into_iter()
        .filter_map(|(rank, value)| value.map(|value| (rank, value)))
        .collect();
    assert_eq!(
        set,
        vec![
            (Rank::RoleOverride, json!(true)),
            (Rank::EnvOverride, json!(false)),
        ]
    );
}
