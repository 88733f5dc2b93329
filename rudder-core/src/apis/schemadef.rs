//! The `SchemaDefinition` resource: a named, versioned declared schema.
use crate::conditions::Condition;
use crate::metadata::ObjectMeta;
use crate::resource::Resource;
use crate::schema::SchemaSpec;
use serde::{Deserialize, Serialize};

/// A cluster-scoped definition of a named object schema.
///
/// The spec (user-authored) declares the schema served for each version; the
/// status (system-authored) carries conditions maintained by controllers.
/// Controllers never touch the spec.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: SchemaDefinitionSpec,
    #[serde(default)]
    pub status: SchemaDefinitionStatus,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinitionSpec {
    /// Schema applied to every served version unless overridden per version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<SchemaVersion>,
}

/// One served version of the definition.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVersion {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSpec>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinitionStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Resource for SchemaDefinition {
    fn kind() -> &'static str {
        "SchemaDefinition"
    }

    fn meta(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
