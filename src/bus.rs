// nexus-fabric-core/src/bus.rs - Fan-out event bus with per-subscriber bounded queues

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

use crate::events;
use crate::fabric_proto::fabric::FabricEvent;

struct SubscriberQueue {
    queue: VecDeque<FabricEvent>,
    /// Events dropped since the subscriber last observed a lag marker.
    dropped: u64,
    notify: Arc<Notify>,
}

struct BusInner {
    capacity: usize,
    next_id: u64,
    closed: bool,
    subscribers: HashMap<u64, SubscriberQueue>,
}

/// Single canonical publish sequence, fanned out to N independent bounded
/// queues. Publishing never blocks: a full subscriber queue sheds its oldest
/// event and the gap is announced in-band with a STREAM_LAGGED marker before
/// the surviving events.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner {
                capacity: capacity.max(1),
                next_id: 0,
                closed: false,
                subscribers: HashMap::new(),
            })),
        }
    }

    /// Non-blocking; enqueues onto every live subscriber in publish order.
    pub fn publish(&self, event: FabricEvent) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        let capacity = inner.capacity;
        for sub in inner.subscribers.values_mut() {
            if sub.queue.len() >= capacity {
                sub.queue.pop_front();
                sub.dropped += 1;
            }
            sub.queue.push_back(event.clone());
            sub.notify.notify_one();
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let notify = Arc::new(Notify::new());
        inner.subscribers.insert(
            id,
            SubscriberQueue {
                queue: VecDeque::new(),
                dropped: 0,
                notify: Arc::clone(&notify),
            },
        );
        debug!(subscription = id, "event stream subscriber attached");
        Subscription {
            id,
            inner: Arc::clone(&self.inner),
            notify,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Wakes every pending reader with end-of-stream.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        for sub in inner.subscribers.values() {
            sub.notify.notify_one();
        }
    }
}

/// Pull handle for one subscriber. Dropping it releases the subscription and
/// discards anything still buffered, so scoped use guarantees cleanup on
/// every exit path of a stream handler.
pub struct Subscription {
    id: u64,
    inner: Arc<Mutex<BusInner>>,
    notify: Arc<Notify>,
}

impl Subscription {
    /// Next event in publish order, or None once the bus is closed and the
    /// queue is drained. A pending lag marker is delivered first.
    pub async fn next(&mut self) -> Option<FabricEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock();
                let closed = inner.closed;
                match inner.subscribers.get_mut(&self.id) {
                    Some(sub) => {
                        if sub.dropped > 0 {
                            let dropped = sub.dropped;
                            sub.dropped = 0;
                            return Some(events::stream_lagged(dropped));
                        }
                        if let Some(event) = sub.queue.pop_front() {
                            return Some(event);
                        }
                        if closed {
                            return None;
                        }
                    }
                    None => return None,
                }
            }
            notified.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        inner.subscribers.remove(&self.id);
        debug!(subscription = self.id, "event stream subscriber detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InternalEvent;
    use crate::fabric_proto::fabric::EventKind;
    use std::collections::HashMap;
    use tokio::time::{timeout, Duration};

    fn command_event(n: u64) -> FabricEvent {
        InternalEvent::CommandCompleted {
            command_id: format!("cmd-{n}"),
            details: HashMap::new(),
        }
        .into_wire(events::SOURCE_DISPATCHER)
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        for n in 0..5 {
            bus.publish(command_event(n));
        }
        for n in 0..5 {
            let event = sub.next().await.unwrap();
            assert_eq!(event.attributes["command_id"], format!("cmd-{n}"));
        }
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_flags_lag() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe();
        for n in 0..10 {
            bus.publish(command_event(n));
        }
        // Marker first, announcing the six shed events, then the survivors.
        let marker = sub.next().await.unwrap();
        assert_eq!(marker.kind(), EventKind::StreamLagged);
        assert_eq!(marker.attributes["dropped"], "6");
        for n in 6..10 {
            let event = sub.next().await.unwrap();
            assert_eq!(event.attributes["command_id"], format!("cmd-{n}"));
        }
    }

    #[tokio::test]
    async fn exactly_full_queue_then_one_more_drops_one() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe();
        for n in 0..4 {
            bus.publish(command_event(n));
        }
        bus.publish(command_event(4));
        let marker = sub.next().await.unwrap();
        assert_eq!(marker.kind(), EventKind::StreamLagged);
        assert_eq!(marker.attributes["dropped"], "1");
        let event = sub.next().await.unwrap();
        assert_eq!(event.attributes["command_id"], "cmd-1");
    }

    #[tokio::test]
    async fn slow_subscriber_does_not_stall_others() {
        let bus = EventBus::new(2);
        let mut fast = bus.subscribe();
        let _slow = bus.subscribe();
        for n in 0..6 {
            bus.publish(command_event(n));
            // Fast consumer keeps pace and never observes a gap.
            let event = fast.next().await.unwrap();
            assert_eq!(event.kind(), EventKind::CommandCompleted);
        }
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let bus = EventBus::new(4);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn close_terminates_pending_readers() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe();
        let waiter = tokio::spawn(async move { sub.next().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.close();
        let got = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn next_wakes_on_late_publish() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe();
        let publisher = {
            let bus = bus.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                bus.publish(command_event(7));
            })
        };
        let event = timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.attributes["command_id"], "cmd-7");
        publisher.await.unwrap();
    }
}
