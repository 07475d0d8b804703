//! Realtime channel plumbing.
//!
//! The server announces changes over named pub/sub channels. This crate
//! holds the transport-agnostic bus contract, an in-memory bus for tests and
//! local fan-out, and the typed events the client reacts to.

pub mod bus;
pub mod in_memory_bus;
pub mod realtime;

pub use bus::{BusError, EventBus, Subscription};
pub use in_memory_bus::InMemoryEventBus;
pub use realtime::{
    COMMON_DATA_CHANNEL, COMMON_DATA_CHANGED, CommonDataChanged, RealtimeMessage, UserEvent,
    user_channel,
};
