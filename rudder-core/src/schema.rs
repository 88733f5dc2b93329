//! Declared object schemas and the structural checks run against them.
//!
//! A [`SchemaSpec`] is the user-authored shape of an object: a recursive tree
//! of typed nodes. [`validate_structural`] walks a declared schema and
//! collects the violations that make it unusable for serving, anchored to the
//! field path where they occur. The checks here are deliberately small; the
//! point is the path-carrying [`ErrorList`] that condition controllers
//! aggregate into status messages.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Types a schema node may declare.
pub const KNOWN_TYPES: &[&str] = &["object", "array", "string", "integer", "number", "boolean"];

/// A declared (user-authored) object schema.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSpec {
    /// One of [`KNOWN_TYPES`]. Required on nodes that declare fields.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Named fields, for `object` nodes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaSpec>,
    /// Element schema, for `array` nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaSpec>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

/// A single structural violation, anchored to a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// An ordered list of structural violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(pub Vec<StructuralError>);

impl ErrorList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(StructuralError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.0.extend(other.0);
    }
}

/// Aggregates violations in declaration order, suitable for a condition
/// message.
impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Run the structural checks against `schema`, anchoring violations at `path`.
pub fn validate_structural(schema: &SchemaSpec, path: &str) -> ErrorList {
    let mut errs = ErrorList::default();
    walk(schema, path, &mut errs);
    errs
}

fn walk(schema: &SchemaSpec, path: &str, errs: &mut ErrorList) {
    match schema.type_.as_deref() {
        None => {
            if !schema.properties.is_empty() || schema.items.is_some() {
                errs.push(
                    format!("{path}.type"),
                    "must not be empty on nodes that declare fields",
                );
            }
        }
        Some(t) if !KNOWN_TYPES.contains(&t) => {
            errs.push(format!("{path}.type"), format!("unsupported type {t:?}"));
        }
        Some(t) => {
            if schema.items.is_some() && t != "array" {
                errs.push(
                    format!("{path}.items"),
                    "only allowed on nodes of type \"array\"",
                );
            }
            if !schema.properties.is_empty() && t != "object" {
                errs.push(
                    format!("{path}.properties"),
                    "only allowed on nodes of type \"object\"",
                );
            }
        }
    }

    for (name, child) in &schema.properties {
        walk(child, &format!("{path}.properties[{name}]"), errs);
    }
    if let Some(items) = &schema.items {
        walk(items, &format!("{path}.items"), errs);
    }
}
