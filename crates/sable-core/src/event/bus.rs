// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::{AtomicU64, Ordering};

/// A generic, bounded event channel with a drop-on-full policy.
///
/// The bus is generic over the event type `T` so that `sable-core` stays
/// decoupled from the concrete event enums defined in higher-level crates.
/// Publishing never blocks: when the buffer is full the event is discarded
/// and counted, so a slow or absent consumer can never stall the producer's
/// hot path.
#[derive(Debug)]
pub struct EventBus<T> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
    dropped: AtomicU64,
}

impl<T> EventBus<T> {
    /// Creates a bus with a bounded buffer of `capacity` events.
    ///
    /// ## Arguments
    /// * `capacity` - Maximum number of events held before publishes are dropped.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        log::debug!("EventBus initialized (capacity={capacity}).");
        Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
        }
    }

    /// Publishes an event without blocking.
    ///
    /// If the buffer is full or the receiver is gone, the event is dropped
    /// and the drop counter is incremented.
    pub fn publish(&self, event: T) {
        if self.sender.try_send(event).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            log::trace!("EventBus buffer full, event dropped (total dropped: {dropped}).");
        }
    }

    /// Returns a clone of the receiver end of the channel.
    ///
    /// Intended for consumers that want to drain published events with
    /// `try_recv`/`try_iter` at their own pace.
    pub fn receiver(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }

    /// Number of events discarded because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of events currently buffered.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no events are buffered.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Spawned(u64),
        Finished(u64),
    }

    #[test]
    fn publish_and_drain() {
        let bus = EventBus::bounded(8);
        bus.publish(TestEvent::Spawned(1));
        bus.publish(TestEvent::Finished(1));

        let rx = bus.receiver();
        let drained: Vec<_> = rx.try_iter().collect();
        assert_eq!(drained, vec![TestEvent::Spawned(1), TestEvent::Finished(1)]);
        assert!(bus.is_empty());
    }

    #[test]
    fn full_buffer_drops_instead_of_blocking() {
        let bus = EventBus::bounded(2);
        bus.publish(TestEvent::Spawned(1));
        bus.publish(TestEvent::Spawned(2));
        bus.publish(TestEvent::Spawned(3));

        assert_eq!(bus.len(), 2);
        assert_eq!(bus.dropped_count(), 1);

        let rx = bus.receiver();
        assert_eq!(rx.try_recv().unwrap(), TestEvent::Spawned(1));
    }

    #[test]
    fn drained_buffer_accepts_events_again() {
        let bus = EventBus::bounded(1);
        bus.publish(TestEvent::Spawned(1));
        bus.publish(TestEvent::Spawned(2));
        assert_eq!(bus.dropped_count(), 1);

        let rx = bus.receiver();
        assert_eq!(rx.try_recv().unwrap(), TestEvent::Spawned(1));

        bus.publish(TestEvent::Finished(1));
        assert_eq!(rx.try_recv().unwrap(), TestEvent::Finished(1));
        assert_eq!(bus.dropped_count(), 1);
    }
}
