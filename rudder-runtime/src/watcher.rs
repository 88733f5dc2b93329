//! The watch event model fed to reflectors.
//!
//! The watch connection itself (list + watch against the backing store, with
//! resource-version resume) is an external collaborator; the runtime consumes
//! it as a plain `Stream` of [`Event`]s. Tests drive controllers by handing
//! them literal event streams.

/// Watch events delivered by an object feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<K> {
    /// An object was added or modified.
    Applied(K),
    /// An object was deleted.
    ///
    /// Deletes may be missed across stream restarts; anything relying on them
    /// for correctness must also handle disappearance via [`Event::Restarted`].
    Deleted(K),
    /// The feed was (re)started and this is the full current object set.
    ///
    /// Consumers should replace their state atomically; objects previously
    /// applied but absent here have been deleted.
    Restarted(Vec<K>),
}

impl<K> Event<K> {
    /// Flattens out all objects that were added or modified in the event.
    ///
    /// `Deleted` objects are ignored; objects in a `Restarted` event are
    /// emitted individually.
    pub fn into_iter_applied(self) -> impl Iterator<Item = K> {
        match self {
            Event::Applied(obj) => vec![obj],
            Event::Deleted(_) => vec![],
            Event::Restarted(objs) => objs,
        }
        .into_iter()
    }

    /// Flattens out all objects that were added, modified, or deleted.
    pub fn into_iter_touched(self) -> impl Iterator<Item = K> {
        match self {
            Event::Applied(obj) | Event::Deleted(obj) => vec![obj],
            Event::Restarted(objs) => objs,
        }
        .into_iter()
    }
}
