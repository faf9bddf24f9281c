//! Event queue for decoupled UI → application communication.
//!
//! Widgets cannot mutate the stores while the stores are being read for
//! painting, so they emit typed events through a `dispatch(BoxedEvent)`
//! closure instead. The application drains the queue once per frame with
//! [`EventBus::poll`] and applies each mutation - which is what makes store
//! updates atomic per event from every caller's perspective.
//!
//! Events are plain structs; [`downcast_event`] recovers the concrete type
//! on the draining side.

use log::warn;
use std::any::Any;
use std::sync::{Arc, Mutex};

/// Maximum events in queue before oldest are evicted.
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events. Events must be Send + Sync + 'static.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

// Blanket impl for all qualifying types
impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Boxed event for queue storage
pub type BoxedEvent = Box<dyn Event>;

/// FIFO event queue drained by the main loop.
#[derive(Clone, Default)]
pub struct EventBus {
    queue: Arc<Mutex<Vec<BoxedEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a typed event.
    pub fn emit<E: Event>(&self, event: E) {
        self.emit_boxed(Box::new(event));
    }

    /// Queue a boxed event (for dynamic dispatch).
    pub fn emit_boxed(&self, event: BoxedEvent) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict = queue.len() / 2;
            warn!("event queue full ({} events), evicting oldest {}", queue.len(), evict);
            queue.drain(0..evict);
        }
        queue.push(event);
    }

    /// Drain all queued events for batch processing in the main loop.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Helper: downcast BoxedEvent to concrete type.
///
/// Must explicitly deref to `dyn Event` before calling `as_any()` -
/// otherwise the blanket impl `Event for Box<dyn Event>` intercepts the
/// call and the downcast always fails.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct TestEvent {
        value: i32,
    }

    #[derive(Clone, Debug)]
    struct OtherEvent;

    #[test]
    fn emit_queues_for_poll() {
        let bus = EventBus::new();
        bus.emit(TestEvent { value: 1 });
        bus.emit(TestEvent { value: 2 });
        bus.emit(OtherEvent);

        let events = bus.poll();
        assert_eq!(events.len(), 3);
        // Queue is empty after poll.
        assert_eq!(bus.poll().len(), 0);
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let bus = EventBus::new();
        bus.emit(TestEvent { value: 42 });
        bus.emit(OtherEvent);

        let events = bus.poll();
        assert_eq!(downcast_event::<TestEvent>(&events[0]).unwrap().value, 42);
        assert!(downcast_event::<TestEvent>(&events[1]).is_none());
        assert!(downcast_event::<OtherEvent>(&events[1]).is_some());
    }

    #[test]
    fn clones_share_the_queue() {
        let bus = EventBus::new();
        let handle = bus.clone();
        handle.emit(TestEvent { value: 7 });
        assert_eq!(bus.queue_len(), 1);
        assert_eq!(bus.poll().len(), 1);
    }
}
