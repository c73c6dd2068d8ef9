//! Native-scroll facade over the virtual scroll engine
//!
//! The pin/trigger subsystem measures and scrolls as if the document
//! scrolled natively. [`ScrollProxy`] answers those calls from the engine and
//! tells the subsystem to pin with transforms.

use std::cell::RefCell;

use tracing::{debug, warn};

use crate::geometry::Rect;
use crate::scroll::{EngineHandle, WeakEngineHandle};

/// How the pin/trigger subsystem keeps pinned elements in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinStrategy {
    /// Offset pinned elements with a translate; the document never moves
    Transform,
    /// Leave pinned elements to the host's native positioning
    #[default]
    Fixed,
}

/// What a pin/trigger subsystem may ask of a scroller
pub trait NativeScrollLike {
    /// Current scroll position
    fn read_position(&self) -> f64;

    /// Jump to `value` without smoothing
    fn write_position(&self, value: f64);

    /// Rectangle of the scrolling viewport in client coordinates
    fn bounding_box(&self) -> Rect;

    fn pin_strategy(&self) -> PinStrategy;
}

/// Engine-backed scroller; holds the engine weakly
#[derive(Debug, Clone)]
pub struct ScrollProxy {
    engine: WeakEngineHandle,
}

impl ScrollProxy {
    pub fn new(engine: &EngineHandle) -> Self {
        Self {
            engine: engine.downgrade(),
        }
    }

    /// Proxy for whatever engine currently sits in the lookup slot
    pub fn from_slot() -> Option<Self> {
        ENGINE_SLOT.with(|slot| {
            slot.borrow()
                .as_ref()
                .map(|engine| Self { engine: engine.clone() })
        })
    }

    /// Whether the engine behind the proxy is still alive
    pub fn is_attached(&self) -> bool {
        self.engine.upgrade().is_some()
    }
}

impl NativeScrollLike for ScrollProxy {
    fn read_position(&self) -> f64 {
        self.engine.upgrade().map(|e| e.offset()).unwrap_or(0.0)
    }

    fn write_position(&self, value: f64) {
        match self.engine.upgrade() {
            Some(engine) => engine.seek_to(value, true),
            None => debug!(value, "Proxy write after engine teardown"),
        }
    }

    fn bounding_box(&self) -> Rect {
        self.engine
            .upgrade()
            .map(|e| e.viewport().rect())
            .unwrap_or_default()
    }

    fn pin_strategy(&self) -> PinStrategy {
        PinStrategy::Transform
    }
}

thread_local! {
    static ENGINE_SLOT: RefCell<Option<WeakEngineHandle>> = const { RefCell::new(None) };
}

/// Publish `engine` in the lookup slot until the guard drops
pub fn install(engine: &EngineHandle) -> SlotGuard {
    let weak = engine.downgrade();
    ENGINE_SLOT.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.as_ref().and_then(WeakEngineHandle::upgrade).is_some() {
            warn!("Replacing a live engine in the lookup slot");
        }
        *slot = Some(weak.clone());
    });
    SlotGuard { engine: weak }
}

/// Engine currently published in the lookup slot
pub fn lookup() -> Option<EngineHandle> {
    ENGINE_SLOT.with(|slot| slot.borrow().as_ref().and_then(WeakEngineHandle::upgrade))
}

/// Clears the lookup slot on drop, if it still holds this guard's engine
#[derive(Debug)]
pub struct SlotGuard {
    engine: WeakEngineHandle,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        ENGINE_SLOT.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&self.engine)) {
                *slot = None;
                debug!("Engine lookup slot cleared");
            }
        });
    }
}
