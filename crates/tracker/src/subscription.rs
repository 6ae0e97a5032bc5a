//! This module contains the core [`Subscription`] type that consumers of the tracker use to
//! observe state snapshots produced by a background tracking task.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::mpsc;

/// Receiving end of a background tracking task. Use it via its [`futures::Stream`] API.
///
/// The stream ends once the task finishes, whether because the operation reached a terminal state,
/// tracking gave up, or it was cancelled.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Returns the number of messages in the backlog for this subscription.
    pub fn backlog(&self) -> usize {
        self.receiver.len()
    }

    /// Intentionally left private so as not to leak implementation details to consuming APIs.
    pub(crate) const fn from_receiver(receiver: mpsc::UnboundedReceiver<T>) -> Subscription<T> {
        Subscription { receiver }
    }
}

impl<T> futures::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
