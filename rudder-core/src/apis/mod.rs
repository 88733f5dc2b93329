//! Concrete API object types served by this system.
mod daemonset;
mod schemadef;

pub use daemonset::{
    is_pod_available, Container, DaemonSet, DaemonSetSpec, DaemonSetStatus, Node, NodeSpec, Pod,
    PodPhase, PodSpec, PodStatus, PodTemplateSpec, RollingUpdateStrategy, UpdateStrategy,
    POD_READY,
};
pub use schemadef::{SchemaDefinition, SchemaDefinitionSpec, SchemaDefinitionStatus, SchemaVersion};
