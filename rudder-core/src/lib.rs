//! Core types shared by the rudder controller runtime.
//!
//! This crate defines the object model consumed by [`rudder-runtime`]: object
//! metadata and the [`Resource`] accessor trait, typed status [`conditions`],
//! int-or-percentage values, declared schemas with their structural checks,
//! and the concrete API types ([`apis::SchemaDefinition`], [`apis::DaemonSet`]
//! and friends).
//!
//! Nothing in here talks to a backing store; these are plain data structures
//! with the behavior that belongs to the data (availability predicates,
//! condition bookkeeping, budget resolution).

pub mod apis;
pub mod conditions;
pub mod error;
pub mod intstr;
pub mod metadata;
pub mod resource;
pub mod schema;

pub use conditions::{Condition, ConditionStatus};
pub use error::ErrorResponse;
pub use intstr::IntOrString;
pub use metadata::ObjectMeta;
pub use resource::Resource;
