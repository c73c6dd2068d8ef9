//! Pin/trigger subsystem
//!
//! Triggers map a scroll range, derived from an element's layout box and the
//! scroller's viewport, to a progress value. Pinned triggers hold their
//! element still across the range. All scroll reads and writes go through a
//! [`NativeScrollLike`] scroller.

use serde::Serialize;
use tracing::debug;

use crate::geometry::{ElementRef, WeakElementRef};
use crate::proxy::{NativeScrollLike, PinStrategy};
use crate::scroll::map_range;

/// Interface the page drives; [`TriggerSet`] is the built-in implementation
pub trait PinTriggerSubsystem {
    fn set_pin_strategy(&mut self, strategy: PinStrategy);

    /// Recompute progress from the scroller's current position
    fn update(&mut self, scroller: &dyn NativeScrollLike);

    /// Re-measure every trigger from current geometry
    fn refresh(&mut self, scroller: &dyn NativeScrollLike);

    fn kill_all(&mut self);
}

/// Point where an element edge meets a viewport edge
///
/// Both values are fractions: 0 is the top, 1 the bottom. `Anchor::new(0.0,
/// 1.0)` fires when the element's top reaches the viewport's bottom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
    pub element: f64,
    pub viewport: f64,
}

impl Anchor {
    pub const TOP_TOP: Anchor = Anchor::new(0.0, 0.0);
    pub const TOP_BOTTOM: Anchor = Anchor::new(0.0, 1.0);
    pub const BOTTOM_TOP: Anchor = Anchor::new(1.0, 0.0);
    pub const BOTTOM_BOTTOM: Anchor = Anchor::new(1.0, 1.0);

    pub const fn new(element: f64, viewport: f64) -> Self {
        Self { element, viewport }
    }

    fn resolve(&self, top: f64, height: f64, viewport_height: f64) -> f64 {
        top + self.element * height - self.viewport * viewport_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriggerSpec {
    pub start: Anchor,
    pub end: Anchor,
    pub pin: bool,
}

impl TriggerSpec {
    /// Whole pass of the element through the viewport
    pub fn pass_through() -> Self {
        Self {
            start: Anchor::TOP_BOTTOM,
            end: Anchor::BOTTOM_TOP,
            pin: false,
        }
    }

    /// Pin from top-at-top for the element's height minus one viewport
    pub fn pinned() -> Self {
        Self {
            start: Anchor::TOP_TOP,
            end: Anchor::BOTTOM_BOTTOM,
            pin: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TriggerId(u64);

#[derive(Debug)]
struct Trigger {
    id: TriggerId,
    element: WeakElementRef,
    spec: TriggerSpec,
    start: f64,
    end: f64,
    progress: f64,
    active: bool,
}

impl Trigger {
    fn measure(&mut self, viewport_height: f64) -> bool {
        let Some(element) = self.element.upgrade() else {
            return false;
        };
        let mut el = element.borrow_mut();
        el.translate_y = 0.0;
        self.start = self.spec.start.resolve(el.top, el.height, viewport_height);
        self.end = self
            .spec
            .end
            .resolve(el.top, el.height, viewport_height)
            .max(self.start);
        true
    }
}

#[derive(Debug, Default)]
pub struct TriggerSet {
    strategy: PinStrategy,
    triggers: Vec<Trigger>,
    next_id: u64,
    refreshes: u64,
}

impl TriggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin_strategy(&self) -> PinStrategy {
        self.strategy
    }

    /// Add a trigger; edges are measured on the next refresh
    pub fn add(&mut self, element: &ElementRef, spec: TriggerSpec) -> TriggerId {
        let id = TriggerId(self.next_id);
        self.next_id += 1;
        self.triggers.push(Trigger {
            id,
            element: std::rc::Rc::downgrade(element),
            spec,
            start: 0.0,
            end: 0.0,
            progress: 0.0,
            active: false,
        });
        id
    }

    pub fn remove(&mut self, id: TriggerId) -> bool {
        let Some(index) = self.triggers.iter().position(|t| t.id == id) else {
            return false;
        };
        let trigger = self.triggers.remove(index);
        if let Some(element) = trigger.element.upgrade() {
            element.borrow_mut().translate_y = 0.0;
        }
        true
    }

    pub fn progress(&self, id: TriggerId) -> Option<f64> {
        self.triggers.iter().find(|t| t.id == id).map(|t| t.progress)
    }

    pub fn is_active(&self, id: TriggerId) -> bool {
        self.triggers.iter().any(|t| t.id == id && t.active)
    }

    /// Measured scroll range of a trigger
    pub fn range(&self, id: TriggerId) -> Option<(f64, f64)> {
        self.triggers
            .iter()
            .find(|t| t.id == id)
            .map(|t| (t.start, t.end))
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Completed refresh passes
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }
}

impl PinTriggerSubsystem for TriggerSet {
    fn set_pin_strategy(&mut self, strategy: PinStrategy) {
        self.strategy = strategy;
    }

    fn update(&mut self, scroller: &dyn NativeScrollLike) {
        let position = scroller.read_position();
        let transform = self.strategy == PinStrategy::Transform;

        for trigger in &mut self.triggers {
            trigger.progress = map_range(position, (trigger.start, trigger.end), (0.0, 1.0));
            let active = position >= trigger.start && position <= trigger.end;
            if active != trigger.active {
                debug!(trigger = trigger.id.0, active, "Trigger toggled");
                trigger.active = active;
            }
            if trigger.spec.pin && transform {
                if let Some(element) = trigger.element.upgrade() {
                    element.borrow_mut().translate_y =
                        (position - trigger.start).clamp(0.0, trigger.end - trigger.start);
                }
            }
        }
    }

    fn refresh(&mut self, scroller: &dyn NativeScrollLike) {
        let viewport_height = scroller.bounding_box().height;

        let before = self.triggers.len();
        self.triggers.retain_mut(|t| t.measure(viewport_height));
        if self.triggers.len() != before {
            debug!(dropped = before - self.triggers.len(), "Dropped triggers with no element");
        }

        // Transform pins never move the document; nothing to restore
        let position = scroller.read_position();
        self.update(scroller);
        self.refreshes += 1;
        debug!(triggers = self.triggers.len(), position, "Triggers refreshed");
    }

    fn kill_all(&mut self) {
        for trigger in self.triggers.drain(..) {
            if let Some(element) = trigger.element.upgrade() {
                element.borrow_mut().translate_y = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{element, Rect};
    use std::cell::Cell;

    /// Scroller with a plain position and a write counter
    struct FakeScroller {
        position: Cell<f64>,
        writes: Cell<u32>,
        height: f64,
    }

    impl FakeScroller {
        fn at(position: f64) -> Self {
            Self {
                position: Cell::new(position),
                writes: Cell::new(0),
                height: 800.0,
            }
        }
    }

    impl NativeScrollLike for FakeScroller {
        fn read_position(&self) -> f64 {
            self.position.get()
        }

        fn write_position(&self, value: f64) {
            self.writes.set(self.writes.get() + 1);
            self.position.set(value);
        }

        fn bounding_box(&self) -> Rect {
            Rect::new(0.0, 0.0, 1280.0, self.height)
        }

        fn pin_strategy(&self) -> PinStrategy {
            PinStrategy::Transform
        }
    }

    #[test]
    fn test_refresh_measures_edges_without_scrolling() {
        let main = element(800.0, 1600.0);
        let mut set = TriggerSet::new();
        let id = set.add(&main, TriggerSpec::pass_through());

        let scroller = FakeScroller::at(800.0);
        set.refresh(&scroller);

        assert_eq!(set.range(id), Some((0.0, 2400.0)));
        assert_eq!(scroller.writes.get(), 0);
        assert_eq!(scroller.read_position(), 800.0);
        assert!((set.progress(id).unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert!(set.is_active(id));
        assert_eq!(set.refreshes(), 1);
    }

    #[test]
    fn test_transform_pin_holds_element() {
        let spark = element(1000.0, 2400.0);
        let mut set = TriggerSet::new();
        set.set_pin_strategy(PinStrategy::Transform);
        let id = set.add(&spark, TriggerSpec::pinned());

        let scroller = FakeScroller::at(0.0);
        set.refresh(&scroller);
        assert_eq!(set.range(id), Some((1000.0, 2600.0)));

        scroller.position.set(1500.0);
        set.update(&scroller);
        assert_eq!(spark.borrow().translate_y, 500.0);

        // past the end the element scrolls away with the document
        scroller.position.set(4000.0);
        set.update(&scroller);
        assert_eq!(spark.borrow().translate_y, 1600.0);
        assert_eq!(set.progress(id), Some(1.0));
        assert!(!set.is_active(id));
    }

    #[test]
    fn test_fixed_strategy_leaves_translate_alone() {
        let spark = element(0.0, 2000.0);
        let mut set = TriggerSet::new();
        set.add(&spark, TriggerSpec::pinned());
        let scroller = FakeScroller::at(300.0);
        set.refresh(&scroller);
        assert_eq!(spark.borrow().translate_y, 0.0);
    }

    #[test]
    fn test_refresh_drops_dead_elements() {
        let mut set = TriggerSet::new();
        {
            let gone = element(0.0, 100.0);
            set.add(&gone, TriggerSpec::pass_through());
        }
        let kept = element(0.0, 100.0);
        set.add(&kept, TriggerSpec::pass_through());
        set.refresh(&FakeScroller::at(0.0));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_kill_all_resets_pins() {
        let spark = element(0.0, 2000.0);
        let mut set = TriggerSet::new();
        set.set_pin_strategy(PinStrategy::Transform);
        set.add(&spark, TriggerSpec::pinned());
        set.refresh(&FakeScroller::at(400.0));
        assert_eq!(spark.borrow().translate_y, 400.0);

        set.kill_all();
        assert!(set.is_empty());
        assert_eq!(spark.borrow().translate_y, 0.0);
    }
}
