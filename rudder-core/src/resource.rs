//! Accessor trait implemented by all API object types.
use crate::metadata::ObjectMeta;

/// An accessor trait for a persisted API object.
///
/// Implementors embed [`ObjectMeta`] and SHOULD have `.metadata.name`
/// populated once stored. The provided accessors avoid the unwrap mechanics
/// around the optional metadata fields.
pub trait Resource {
    /// The kind of this object, e.g. `"DaemonSet"`.
    fn kind() -> &'static str;

    /// Metadata that all persisted resources must have.
    fn meta(&self) -> &ObjectMeta;

    /// Mutable access to the metadata.
    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// The object's name, or an empty string if unset.
    fn name_any(&self) -> String {
        self.meta().name.clone().unwrap_or_default()
    }

    /// The namespace the object lives in, if the kind is namespaced.
    fn namespace(&self) -> Option<String> {
        self.meta().namespace.clone()
    }

    /// The version of the object as last seen by the backing store.
    fn resource_version(&self) -> Option<String> {
        self.meta().resource_version.clone()
    }
}
