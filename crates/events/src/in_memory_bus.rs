//! In-memory channel bus for tests/dev and local fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak, mpsc};

use crate::bus::{BusError, EventBus, Subscription};

#[derive(Debug)]
struct Channels<M> {
    next_id: u64,
    subscribers: HashMap<String, Vec<(u64, mpsc::Sender<M>)>>,
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Best-effort fan-out per channel
/// - Dropped subscriptions remove themselves
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    channels: Arc<Mutex<Channels<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscribers on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .map(|c| c.subscribers.get(channel).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            channels: Arc::new(Mutex::new(Channels {
                next_id: 0,
                subscribers: HashMap::new(),
            })),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = BusError;

    fn publish(&self, channel: &str, message: M) -> Result<usize, Self::Error> {
        let mut channels = self.channels.lock().map_err(|_| BusError::Poisoned)?;

        let Some(subs) = channels.subscribers.get_mut(channel) else {
            return Ok(0);
        };

        // Drop any dead subscribers while publishing.
        subs.retain(|(_, tx)| tx.send(message.clone()).is_ok());

        Ok(subs.len())
    }

    fn subscribe(&self, channel: &str) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned we still hand out a subscription;
        // it just never receives anything.
        let id = match self.channels.lock() {
            Ok(mut channels) => {
                let id = channels.next_id;
                channels.next_id += 1;
                channels
                    .subscribers
                    .entry(channel.to_string())
                    .or_default()
                    .push((id, tx));
                Some(id)
            }
            Err(_) => None,
        };

        let weak: Weak<Mutex<Channels<M>>> = Arc::downgrade(&self.channels);
        let name = channel.to_string();
        Subscription::new(channel, rx, move || {
            let (Some(id), Some(inner)) = (id, weak.upgrade()) else {
                return;
            };
            if let Ok(mut channels) = inner.lock() {
                if let Some(subs) = channels.subscribers.get_mut(&name) {
                    subs.retain(|(sid, _)| *sid != id);
                    if subs.is_empty() {
                        channels.subscribers.remove(&name);
                    }
                }
            }
            tracing::debug!(channel = %name, "unsubscribed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_only_to_matching_channel() {
        let bus = InMemoryEventBus::<u32>::new();
        let a = bus.subscribe("a");
        let b = bus.subscribe("b");

        assert_eq!(bus.publish("a", 1).unwrap(), 1);

        assert_eq!(a.try_recv().unwrap(), 1);
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn drop_unsubscribes() {
        let bus = InMemoryEventBus::<u32>::new();
        let sub = bus.subscribe("common-data");
        let other = bus.subscribe("common-data");
        assert_eq!(bus.subscriber_count("common-data"), 2);

        drop(sub);
        assert_eq!(bus.subscriber_count("common-data"), 1);

        other.unsubscribe();
        assert_eq!(bus.subscriber_count("common-data"), 0);
        assert_eq!(bus.publish("common-data", 5).unwrap(), 0);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let bus = InMemoryEventBus::<u32>::new();
        let sub = bus.subscribe("x");
        drop(bus);
        assert!(sub.try_recv().is_err());
        drop(sub);
    }

    #[test]
    fn drain_collects_pending_messages_in_order() {
        let bus = InMemoryEventBus::<u32>::new();
        let sub = bus.subscribe("x");
        for n in 0..3 {
            bus.publish("x", n).unwrap();
        }
        assert_eq!(sub.drain(), vec![0, 1, 2]);
        assert!(sub.drain().is_empty());
    }
}
