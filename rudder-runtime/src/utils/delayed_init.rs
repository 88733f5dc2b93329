//! A write-once value whose readers wait for initialization.
use futures::channel::oneshot;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt::Debug;
use std::task::Poll;
use thiserror::Error;

/// The sending counterpart to a [`DelayedInit`].
pub struct Initializer<T>(oneshot::Sender<T>);

impl<T> Initializer<T> {
    /// Sends `value` to the linked [`DelayedInit`].
    pub fn init(self, value: T) {
        // failure means no reader remains, which is not worth signalling
        let _ = self.0.send(value);
    }
}

impl<T> Debug for Initializer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("delayed_init::Initializer").finish_non_exhaustive()
    }
}

/// A value that must be initialized by an external writer.
///
/// Equivalent to a oneshot channel, except that the value produced is
/// retained and handed to any number of subsequent [`get`](DelayedInit::get)
/// calls.
#[derive(Debug)]
pub struct DelayedInit<T> {
    state: Mutex<ReceiverState<T>>,
}

#[derive(Debug)]
enum ReceiverState<T> {
    Waiting(oneshot::Receiver<T>),
    Ready(Result<T, InitDropped>),
}

impl<T> DelayedInit<T> {
    /// Returns an empty `DelayedInit` along with its linked [`Initializer`].
    #[must_use]
    pub fn new() -> (Initializer<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (
            Initializer(tx),
            DelayedInit {
                state: Mutex::new(ReceiverState::Waiting(rx)),
            },
        )
    }
}

impl<T: Clone> DelayedInit<T> {
    /// Wait for the value to be available, then return a clone of it.
    ///
    /// # Errors
    ///
    /// Fails if the [`Initializer`] was dropped before calling
    /// [`Initializer::init`].
    pub async fn get(&self) -> Result<T, InitDropped> {
        // The lock is only held inside single polls, so an unpolled reader
        // cannot stall the others.
        std::future::poll_fn(|cx| {
            let mut state = self.state.lock();
            match &mut *state {
                ReceiverState::Waiting(rx) => match rx.poll_unpin(cx) {
                    Poll::Ready(value) => {
                        let value = value.map_err(|_| InitDropped);
                        *state = ReceiverState::Ready(value.clone());
                        Poll::Ready(value)
                    }
                    Poll::Pending => Poll::Pending,
                },
                ReceiverState::Ready(value) => Poll::Ready(value.clone()),
            }
        })
        .await
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("initializer was dropped before the value was set")]
pub struct InitDropped;
