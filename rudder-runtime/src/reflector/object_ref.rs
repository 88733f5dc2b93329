use rudder_core::Resource;
use std::fmt;

/// A namespaced (where relevant) reference to an object.
///
/// This is the key type flowing through the work queue: informer callbacks
/// reduce events to `ObjectRef`s, and reconcilers re-fetch authoritative
/// state from the cache or store at sync time rather than trusting the event
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// The name of the object.
    pub name: String,
    /// `None` for cluster-scoped objects.
    pub namespace: Option<String>,
}

impl ObjectRef {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    #[must_use]
    pub fn within(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Creates an `ObjectRef` from a resource's metadata.
    #[must_use]
    pub fn from_obj<K: Resource>(obj: &K) -> Self {
        Self {
            name: obj.name_any(),
            namespace: obj.namespace(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}/{}", namespace, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
