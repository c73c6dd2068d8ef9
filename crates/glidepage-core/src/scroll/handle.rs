//! Shared engine handle with scroll subscriptions
//!
//! The engine lives behind `Rc<RefCell<..>>` because the page, the proxy and
//! the host all reach it on one thread. Subscribers are stored outside the
//! engine cell and called after the engine borrow is released, so a
//! subscriber may read or seek the engine while handling a notification.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::engine::{InputKind, ScrollEvent, VirtualScrollEngine, VirtualScrollState};
use crate::geometry::Viewport;

/// Identifier returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ScrollListener = Box<dyn FnMut(&ScrollEvent)>;

#[derive(Default)]
struct ScrollListeners {
    next_id: u64,
    entries: Vec<(SubscriptionId, ScrollListener)>,
    delivering: bool,
    removed_while_delivering: Vec<SubscriptionId>,
    cleared_while_delivering: bool,
}

#[derive(Clone)]
pub struct EngineHandle {
    engine: Rc<RefCell<VirtualScrollEngine>>,
    listeners: Rc<RefCell<ScrollListeners>>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EngineHandle {
    pub fn new(engine: VirtualScrollEngine) -> Self {
        Self {
            engine: Rc::new(RefCell::new(engine)),
            listeners: Rc::new(RefCell::new(ScrollListeners::default())),
        }
    }

    /// Read access to the engine
    pub fn engine(&self) -> Ref<'_, VirtualScrollEngine> {
        self.engine.borrow()
    }

    pub fn offset(&self) -> f64 {
        self.engine.borrow().offset()
    }

    pub fn state(&self) -> VirtualScrollState {
        self.engine.borrow().state()
    }

    pub fn snapshot(&self) -> ScrollEvent {
        self.engine.borrow().snapshot()
    }

    pub fn is_animating(&self) -> bool {
        self.engine.borrow().is_animating()
    }

    pub fn viewport(&self) -> Viewport {
        self.engine.borrow().viewport()
    }

    pub fn feed(&self, raw_delta: f64, kind: InputKind) -> bool {
        self.engine.borrow_mut().feed(raw_delta, kind)
    }

    /// Seek and deliver the resulting notification when it lands immediately
    pub fn seek_to(&self, offset: f64, immediate: bool) {
        let event = self.engine.borrow_mut().seek_to(offset, immediate);
        if let Some(event) = event {
            self.emit(&event);
        }
    }

    pub fn set_dimensions(&self, viewport: Viewport, content_height: f64) {
        self.engine.borrow_mut().set_dimensions(viewport, content_height);
    }

    pub fn lock(&self) {
        self.engine.borrow_mut().lock();
    }

    pub fn unlock(&self) {
        self.engine.borrow_mut().unlock();
    }

    pub fn resync_clock(&self) {
        self.engine.borrow_mut().resync_clock();
    }

    /// Advance the engine one frame and deliver its notification
    ///
    /// The notification is fully delivered before this returns.
    pub fn tick(&self, frame_time: f64) -> Option<ScrollEvent> {
        let event = self.engine.borrow_mut().tick(frame_time);
        if let Some(ref event) = event {
            self.emit(event);
        }
        event
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ScrollEvent) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut listeners = self.listeners.borrow_mut();
        if listeners.delivering {
            listeners.removed_while_delivering.push(id);
        }
        listeners.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn clear_subscriptions(&self) {
        let mut listeners = self.listeners.borrow_mut();
        if listeners.delivering {
            listeners.cleared_while_delivering = true;
        }
        listeners.entries.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    fn emit(&self, event: &ScrollEvent) {
        let mut taken = {
            let mut listeners = self.listeners.borrow_mut();
            if listeners.delivering {
                // Nested seek from inside a subscriber; the outer delivery
                // already carries the current frame
                trace!(offset = event.offset, "Skipping nested scroll notification");
                return;
            }
            listeners.delivering = true;
            std::mem::take(&mut listeners.entries)
        };

        for (id, listener) in taken.iter_mut() {
            let removed = self.listeners.borrow().removed_while_delivering.contains(id);
            if !removed {
                listener(event);
            }
        }

        let mut listeners = self.listeners.borrow_mut();
        let added = std::mem::take(&mut listeners.entries);
        let removed = std::mem::take(&mut listeners.removed_while_delivering);
        if std::mem::take(&mut listeners.cleared_while_delivering) {
            taken.clear();
        }
        taken.retain(|(id, _)| !removed.contains(id));
        taken.extend(added);
        listeners.entries = taken;
        listeners.delivering = false;
    }

    pub fn downgrade(&self) -> WeakEngineHandle {
        WeakEngineHandle {
            engine: Rc::downgrade(&self.engine),
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    pub fn ptr_eq(&self, other: &EngineHandle) -> bool {
        Rc::ptr_eq(&self.engine, &other.engine)
    }
}

/// Non-owning handle; upgrades only while the page keeps the engine alive
#[derive(Debug, Clone)]
pub struct WeakEngineHandle {
    engine: Weak<RefCell<VirtualScrollEngine>>,
    listeners: Weak<RefCell<ScrollListeners>>,
}

impl WeakEngineHandle {
    pub fn upgrade(&self) -> Option<EngineHandle> {
        Some(EngineHandle {
            engine: self.engine.upgrade()?,
            listeners: self.listeners.upgrade()?,
        })
    }

    pub fn points_to(&self, handle: &EngineHandle) -> bool {
        Weak::ptr_eq(&self.engine, &Rc::downgrade(&handle.engine))
    }

    pub fn ptr_eq(&self, other: &WeakEngineHandle) -> bool {
        Weak::ptr_eq(&self.engine, &other.engine)
    }
}
