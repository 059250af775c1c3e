//! Error types for the attribute resolution engine.

use thiserror::Error;

/// Errors raised by strict reads and writes, frozen views and collaborators
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttributeError {
    #[error("No such attribute: {path}")]
    NoSuchAttribute { path: String },

    #[error("Attribute type mismatch at {path}: expected {expected}, found {found}")]
    AttributeTypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error(
        "Node attributes are read-only when you do not specify which precedence level to set \
         (attempted `{operation}`). To set an attribute write through a rank, e.g. \
         `attrs.default_mut().write(path![\"key\"], \"value\")`"
    )]
    ImmutableAttributeModification { operation: &'static str },

    #[error("Key not found: {key}")]
    IndexError { key: String },

    #[error("Both 'run_list' and 'recipes' are present; set the run list using 'run_list' only")]
    AmbiguousRunList,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AttributeError {
    pub(crate) fn immutable(operation: &'static str) -> Self {
        AttributeError::ImmutableAttributeModification { operation }
    }

    pub(crate) fn no_such(path: &[crate::Segment]) -> Self {
        AttributeError::NoSuchAttribute {
            path: crate::types::display_path(path),
        }
    }
}

impl From<config::ConfigError> for AttributeError {
    fn from(err: config::ConfigError) -> Self {
        AttributeError::Config(err.to_string())
    }
}
