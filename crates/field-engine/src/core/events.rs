//! Single-threaded broadcast queues with explicit subscription handles.
//!
//! The host emits notifications (surface resized, overview transition, zoom
//! committed, quality tier changed); each subscriber owns a private queue it
//! drains once per frame. Handles release themselves on `release()` or drop,
//! so a destroyed toy never leaves a listener behind.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

struct Listener<E> {
    id: u64,
    pending: Vec<E>,
}

struct BusInner<E> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

/// Broadcast queue. Cloning shares the same listener set.
pub struct EventBus<E: Clone> {
    inner: Rc<RefCell<BusInner<E>>>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                next_id: 1,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a new listener. Events emitted before this call are not seen.
    pub fn subscribe(&self) -> Subscription<E> {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            pending: Vec::with_capacity(4),
        });
        Subscription {
            id,
            bus: Rc::downgrade(&self.inner),
            released: false,
        }
    }

    /// Append an event to every live listener's queue.
    pub fn emit(&self, event: E) {
        let mut inner = self.inner.borrow_mut();
        for listener in &mut inner.listeners {
            listener.pending.push(event.clone());
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl<E: Clone> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one listener on an `EventBus`.
pub struct Subscription<E> {
    id: u64,
    bus: Weak<RefCell<BusInner<E>>>,
    released: bool,
}

impl<E> Subscription<E> {
    /// Take all pending events. Empty once released or if the bus is gone.
    pub fn drain(&self) -> Vec<E> {
        if self.released {
            return Vec::new();
        }
        let Some(bus) = self.bus.upgrade() else {
            return Vec::new();
        };
        let mut inner = bus.borrow_mut();
        let events = inner
            .listeners
            .iter_mut()
            .find(|l| l.id == self.id)
            .map(|l| std::mem::take(&mut l.pending))
            .unwrap_or_default();
        events
    }

    /// Detach from the bus. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(bus) = self.bus.upgrade() {
            bus.borrow_mut().listeners.retain(|l| l.id != self.id);
        }
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.release();
    }
}
