//! Channel publishing/subscription abstraction (mechanics only).
//!
//! The bus is intentionally **lightweight**:
//!
//! - **Transport-agnostic**: an in-memory fan-out, a websocket pusher client,
//!   Redis pub/sub, ...
//! - **Named channels**: subscribers only see messages published to the
//!   channel they joined (`common-data`, a private user channel, ...)
//! - **Scoped subscriptions**: a [`Subscription`] leaves its channel when it
//!   is dropped, so a screen that owns one cannot leak a handler across
//!   remounts, whichever way it exits.

use std::sync::mpsc::Receiver;
use std::time::Duration;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Publish failed due to internal lock poisoning.
    #[error("event bus lock poisoned")]
    Poisoned,
}

type Teardown = Box<dyn FnOnce() + Send>;

/// A subscription to one channel.
///
/// ## Usage Pattern
///
/// ```ignore
/// let subscription = bus.subscribe(COMMON_DATA_CHANNEL);
///
/// // on every turn of the UI loop
/// while let Ok(message) = subscription.try_recv() {
///     handle(message);
/// }
///
/// // leaving the screen drops `subscription`, which unsubscribes
/// ```
///
/// Subscriptions are designed for single-threaded consumption.
pub struct Subscription<M> {
    channel: String,
    receiver: Receiver<M>,
    teardown: Option<Teardown>,
}

impl<M> Subscription<M> {
    /// Wrap a receiver; `teardown` runs exactly once when the subscription
    /// is dropped or explicitly [`unsubscribe`](Self::unsubscribe)d.
    pub fn new(
        channel: impl Into<String>,
        receiver: Receiver<M>,
        teardown: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            channel: channel.into(),
            receiver,
            teardown: Some(Box::new(teardown)),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything already delivered, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }

    /// Leave the channel now instead of at drop.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl<M> Drop for Subscription<M> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

/// Channel-based pub/sub abstraction.
///
/// Each subscriber of a channel gets a copy of every message published to
/// that channel after it subscribed (broadcast semantics). Delivery is
/// at-least-once at best; consumers must be idempotent.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Publish to `channel`, returning how many subscribers received it.
    fn publish(&self, channel: &str, message: M) -> Result<usize, Self::Error>;

    fn subscribe(&self, channel: &str) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, channel: &str, message: M) -> Result<usize, Self::Error> {
        (**self).publish(channel, message)
    }

    fn subscribe(&self, channel: &str) -> Subscription<M> {
        (**self).subscribe(channel)
    }
}
