//! Hydration
//!
//! Feeds already-parsed collaborator data into the ranks it belongs to, each
//! step under its own trace origin. A run calls these in phase order:
//! external facts and command-line payload, stored record, roles and
//! environment, then cookbook attribute files.

use crate::attributes::NodeAttributes;
use crate::error::AttributeError;
use crate::trace::{Mechanism, Origin};
use crate::types::{parse_path, Rank};
use crate::views::{CowMap, CowSeq};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Attributes passed on the command line, with the file they came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandLinePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub attributes: Value,
}

/// Node record previously saved on the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredNodeRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub normal: Option<Value>,
    #[serde(default, rename = "override")]
    pub override_attrs: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleAttributes {
    pub name: String,
    #[serde(default)]
    pub default_attributes: Option<Value>,
    #[serde(default)]
    pub override_attributes: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentAttributes {
    pub name: String,
    #[serde(default)]
    pub default_attributes: Option<Value>,
    #[serde(default)]
    pub override_attributes: Option<Value>,
}

/// One assignment made by an attribute file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeWrite {
    pub line: u32,
    #[serde(default = "default_rank")]
    pub rank: Rank,
    /// Canonical path, e.g. `/nginx/ports/0`.
    pub path: String,
    pub value: Value,
    /// Use the strict writer; a shape conflict fails the file.
    #[serde(default)]
    pub strict: bool,
}

fn default_rank() -> Rank {
    Rank::Default
}

/// The evaluated writes of one cookbook attribute file, in source order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookbookAttributeFile {
    pub cookbook: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub file: String,
    pub writes: Vec<AttributeWrite>,
}

const RUN_LIST_KEYS: [&str; 2] = ["run_list", "recipes"];

/// Load facts into `automatic` and the command-line payload into `normal`.
///
/// The payload's `run_list` (or legacy `recipes`) entry is not an attribute;
/// it is removed and returned. Supplying both keys is `AmbiguousRunList`.
#[instrument(skip_all)]
pub fn consume_external_attrs(
    attrs: &mut NodeAttributes,
    facts: Value,
    payload: Option<&CommandLinePayload>,
) -> Result<Option<Vec<String>>, AttributeError> {
    attrs.with_origin(Origin::external_facts(), |attrs| {
        attrs.automatic_mut().replace(facts)
    })?;

    let Some(payload) = payload else {
        return Ok(None);
    };
    let Some(view) = CowMap::of(&payload.attributes) else {
        return Err(AttributeError::AttributeTypeMismatch {
            path: "/".to_string(),
            expected: "mapping",
            found: if payload.attributes.is_array() {
                "sequence"
            } else {
                "scalar"
            },
        });
    };

    let run_list = match (view.get(RUN_LIST_KEYS[0]), view.get(RUN_LIST_KEYS[1])) {
        (Some(_), Some(_)) => return Err(AttributeError::AmbiguousRunList),
        (Some(items), None) | (None, Some(items)) => Some(run_list_entries(items)),
        (None, None) => None,
    };

    let normal = Value::Object(view.except(&RUN_LIST_KEYS));
    attrs.with_origin(Origin::command_line(payload.path.as_deref()), |attrs| {
        attrs.normal_mut().merge_in(normal)
    })?;

    info!(
        payload = payload.path.as_deref().unwrap_or("-"),
        run_list = run_list.as_ref().map_or(0, Vec::len),
        "Consumed external attributes"
    );
    Ok(run_list)
}

fn run_list_entries(value: &Value) -> Vec<String> {
    match value {
        Value::String(entry) => vec![entry.clone()],
        Value::Array(_) => CowSeq::of(value)
            .map(|items| {
                items
                    .compact()
                    .into_iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Replace `default`, `normal` and `override` with a stored record's
/// subtrees. Ranks the record leaves out are untouched.
///
/// Whatever `normal` held before (the command-line payload) is deep-merged
/// back over the stored subtree, so payload keys survive and win.
#[instrument(skip_all, fields(node = %record.name))]
pub fn apply_stored_record(
    attrs: &mut NodeAttributes,
    record: &StoredNodeRecord,
) -> Result<(), AttributeError> {
    let pending = match attrs.level(Rank::Normal).to_json() {
        Value::Object(map) if !map.is_empty() && record.normal.is_some() => Some(Value::Object(map)),
        _ => None,
    };

    let origin = Origin::stored_record(record.server_url.as_deref(), &record.name);
    attrs.with_origin(origin, |attrs| -> Result<(), AttributeError> {
        for (rank, subtree) in [
            (Rank::Default, &record.default),
            (Rank::Normal, &record.normal),
            (Rank::Override, &record.override_attrs),
        ] {
            if let Some(subtree) = subtree {
                attrs.writer(rank).replace(subtree.clone())?;
            }
        }
        Ok(())
    })?;

    if let Some(pending) = pending {
        debug!("Layering earlier normal attributes over the stored record");
        attrs.with_origin(Origin::new(Mechanism::InternalMerge), |attrs| {
            attrs.normal_mut().merge_in(pending)
        })?;
    }
    Ok(())
}

/// Deep-merge a role's attribute blocks; later roles win on conflicts.
#[instrument(skip_all, fields(role = %role.name))]
pub fn apply_role(attrs: &mut NodeAttributes, role: &RoleAttributes) -> Result<(), AttributeError> {
    attrs.with_origin(Origin::role(&role.name), |attrs| {
        merge_blocks(
            attrs,
            (Rank::RoleDefault, role.default_attributes.as_ref()),
            (Rank::RoleOverride, role.override_attributes.as_ref()),
        )
    })
}

#[instrument(skip_all, fields(environment = %environment.name))]
pub fn apply_environment(
    attrs: &mut NodeAttributes,
    environment: &EnvironmentAttributes,
) -> Result<(), AttributeError> {
    attrs.with_origin(Origin::environment(&environment.name), |attrs| {
        merge_blocks(
            attrs,
            (Rank::EnvDefault, environment.default_attributes.as_ref()),
            (Rank::EnvOverride, environment.override_attributes.as_ref()),
        )
    })
}

fn merge_blocks(
    attrs: &mut NodeAttributes,
    default: (Rank, Option<&Value>),
    overrides: (Rank, Option<&Value>),
) -> Result<(), AttributeError> {
    for (rank, block) in [default, overrides] {
        if let Some(block) = block {
            attrs.writer(rank).merge_in(block.clone())?;
        }
    }
    Ok(())
}

/// Apply an attribute file's writes in order.
pub fn apply_cookbook_attributes(
    attrs: &mut NodeAttributes,
    file: &CookbookAttributeFile,
) -> Result<(), AttributeError> {
    run_attribute_file(attrs, file, Mechanism::CookbookAttributeFile)
}

/// Re-apply an attribute file, traced as a reload.
pub fn reload_cookbook_attributes(
    attrs: &mut NodeAttributes,
    file: &CookbookAttributeFile,
) -> Result<(), AttributeError> {
    run_attribute_file(attrs, file, Mechanism::AttributeFileReload)
}

#[instrument(skip_all, fields(cookbook = %file.cookbook, file = %file.file, ?mechanism))]
fn run_attribute_file(
    attrs: &mut NodeAttributes,
    file: &CookbookAttributeFile,
    mechanism: Mechanism,
) -> Result<(), AttributeError> {
    let base = Origin::cookbook_file(&file.cookbook, file.version.as_deref(), &file.file)
        .with_mechanism(mechanism);
    let previous = attrs.set_origin(base.clone());

    let result = file.writes.iter().try_for_each(|write| {
        attrs.set_origin(base.clone().at_line(write.line));
        let path = parse_path(&write.path);
        let mut writer = attrs.writer(write.rank);
        if write.strict {
            writer.write_strict(&path, write.value.clone()).map(|_| ())
        } else {
            writer.write(&path, write.value.clone());
            Ok(())
        }
    });

    attrs.set_origin(previous);
    debug!(writes = file.writes.len(), ok = result.is_ok(), "Attribute file applied");
    result
}
