//! Caches objects in memory and passes watch events through.
mod object_ref;
pub mod store;

pub use object_ref::ObjectRef;
pub use store::{store, Store, Writer};

use crate::watcher;
use async_stream::stream;
use futures::{Stream, StreamExt};
use rudder_core::Resource;

/// Cache objects from an event stream into a local [`Store`].
///
/// Applies each [`watcher::Event`] to the store and yields it onward
/// unmodified, so that consumers (such as a controller's enqueue pump) see
/// events only after the cache reflects them. The store is not updated unless
/// the returned stream is polled.
pub fn reflector<K, W>(mut writer: Writer<K>, stream: W) -> impl Stream<Item = watcher::Event<K>>
where
    K: Resource + Clone,
    W: Stream<Item = watcher::Event<K>>,
{
    stream! {
        futures::pin_mut!(stream);
        while let Some(event) = stream.next().await {
            writer.apply_watcher_event(&event);
            yield event;
        }
    }
}
