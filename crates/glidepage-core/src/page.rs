//! Page-lifetime wiring of the scroll subsystems
//!
//! [`ScrollPage`] owns one engine, its render loop, the proxy and trigger
//! set, the section tracker, one gate per configured section, and the frame
//! clock timers. Everything it acquires is released by [`ScrollPage::teardown`],
//! which also runs on drop.
//!
//! Per frame: the engine ticks and its scroll notification updates the
//! triggers, then due timers fire, then section and gate visibility is
//! observed against the settled geometry.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::gate::{AnimationGateSequencer, GateEffect, GatePhase, StagePhase};
use crate::geometry::{element, ElementRef, Viewport};
use crate::header::HeaderState;
use crate::observer::{RootMargin, ViewObserver};
use crate::proxy::{self, NativeScrollLike, ScrollProxy, SlotGuard};
use crate::scroll::{
    EngineHandle, InputKind, RenderLoop, ScrollEvent, SubscriptionId, VirtualScrollEngine,
};
use crate::sections::{ActiveListenerId, SectionId, SectionTracker, VisibilityEvent};
use crate::timers::{TimerKind, TimerQueue};
use crate::trigger::{PinTriggerSubsystem, TriggerId, TriggerSet, TriggerSpec};

/// What the host can offer the page
#[derive(Debug, Clone, Copy, Default)]
pub struct Environment {
    viewport: Option<Viewport>,
}

impl Environment {
    /// No viewport, e.g. before the first render
    pub fn headless() -> Self {
        Self { viewport: None }
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        Self {
            viewport: Some(viewport),
        }
    }

    pub fn require_viewport(&self) -> crate::Result<Viewport> {
        match self.viewport {
            Some(viewport) if viewport.is_usable() => Ok(viewport),
            Some(viewport) => Err(crate::Error::Environment(format!(
                "viewport {}x{} has no usable area",
                viewport.width, viewport.height
            ))),
            None => Err(crate::Error::Environment("no viewport attached".to_string())),
        }
    }
}

/// Sections stacked top to bottom in document order
#[derive(Debug, Clone)]
pub struct SectionLayout {
    pub sections: Vec<(SectionId, ElementRef)>,
    pub content_height: f64,
}

impl SectionLayout {
    /// Stack every section, each `factors[i]` viewports tall
    ///
    /// Missing or invalid factors count as one viewport.
    pub fn stacked(viewport_height: f64, factors: &[f64]) -> Self {
        let mut top = 0.0;
        let sections = SectionId::ALL
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let factor = factors
                    .get(i)
                    .copied()
                    .filter(|f| f.is_finite() && *f > 0.0)
                    .unwrap_or(1.0);
                let height = (viewport_height * factor).round();
                let el = element(top, height);
                top += height;
                (*id, el)
            })
            .collect();
        Self {
            sections,
            content_height: top,
        }
    }

    /// Re-flow the existing elements for a new viewport height
    ///
    /// Elements keep their identity so registrations and triggers stay valid.
    pub fn restack(&mut self, viewport_height: f64, factors: &[f64]) {
        let fresh = Self::stacked(viewport_height, factors);
        for ((_, el), (_, measured)) in self.sections.iter().zip(&fresh.sections) {
            let measured = *measured.borrow();
            let mut el = el.borrow_mut();
            el.top = measured.top;
            el.height = measured.height;
        }
        self.content_height = fresh.content_height;
    }

    pub fn get(&self, id: SectionId) -> Option<&ElementRef> {
        self.sections.iter().find(|(s, _)| *s == id).map(|(_, el)| el)
    }
}

#[derive(Debug)]
struct GateSlot {
    observer: ViewObserver,
    sequencer: AnimationGateSequencer,
}

/// Serializable view of the page at one instant
#[derive(Debug, Clone, Serialize)]
pub struct PageSnapshot {
    pub time: f64,
    pub offset: f64,
    pub target: f64,
    pub velocity: f64,
    pub progress: f64,
    pub is_animating: bool,
    pub is_locked: bool,
    pub active_section: SectionId,
    pub gates: Vec<GateSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GateSnapshot {
    pub section: SectionId,
    pub in_view: bool,
    pub phase: GatePhase,
    pub stages: Vec<StagePhase>,
}

#[derive(Debug)]
pub struct ScrollPage {
    engine: EngineHandle,
    slot: Option<SlotGuard>,
    render_loop: RenderLoop,
    proxy: ScrollProxy,
    triggers: Rc<RefCell<TriggerSet>>,
    scroll_subscription: Option<SubscriptionId>,
    tracker: SectionTracker,
    gates: Vec<GateSlot>,
    timers: TimerQueue,
    now: f64,
    mounted: bool,
}

impl ScrollPage {
    /// Set up scrolling for a page of `content_height`
    ///
    /// Returns `None` when the environment has no usable viewport; nothing
    /// is acquired in that case.
    pub fn mount(config: &AppConfig, env: &Environment, content_height: f64, now: f64) -> Option<Self> {
        let viewport = match env.require_viewport() {
            Ok(viewport) => viewport,
            Err(e) => {
                info!(error = %e, "Skipping scroll setup");
                return None;
            }
        };

        let engine = EngineHandle::new(VirtualScrollEngine::new(
            config.scroll.clone(),
            viewport,
            content_height,
        ));
        let slot = proxy::install(&engine);
        let proxy = ScrollProxy::from_slot().unwrap_or_else(|| ScrollProxy::new(&engine));

        let triggers = Rc::new(RefCell::new(TriggerSet::new()));
        triggers.borrow_mut().set_pin_strategy(proxy.pin_strategy());

        let scroll_subscription = {
            let triggers = Rc::clone(&triggers);
            let proxy = proxy.clone();
            engine.subscribe(move |_event| {
                // Skipped while someone holds the set; the next tick catches up
                if let Ok(mut set) = triggers.try_borrow_mut() {
                    set.update(&proxy);
                }
            })
        };

        let mut timers = TimerQueue::new();
        timers.schedule(
            now + config.proxy.refresh_delay_ms as f64,
            TimerKind::RefreshTriggers,
        );

        let mut render_loop = RenderLoop::new();
        render_loop.start(&engine);

        let gates = config
            .gates
            .iter()
            .map(|gate| GateSlot {
                observer: ViewObserver::new(RootMargin::uniform(gate.margin_px), gate.threshold),
                sequencer: AnimationGateSequencer::new(gate),
            })
            .collect();

        info!(
            width = viewport.width,
            height = viewport.height,
            content_height,
            "Scroll page mounted"
        );

        Some(Self {
            engine,
            slot: Some(slot),
            render_loop,
            proxy,
            triggers,
            scroll_subscription: Some(scroll_subscription),
            tracker: SectionTracker::new(&config.header),
            gates,
            timers,
            now,
            mounted: true,
        })
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Time of the last frame
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Run one frame at `now` (milliseconds)
    pub fn frame(&mut self, now: f64) -> Option<ScrollEvent> {
        if !self.mounted {
            return None;
        }
        if now.is_finite() {
            self.now = now;
        }

        let event = self.render_loop.frame(now, &self.engine);

        for timer in self.timers.drain_due(self.now) {
            match timer {
                TimerKind::RefreshTriggers => self.refresh_triggers(),
                TimerKind::StageTimeout {
                    section,
                    stage,
                    epoch,
                } => self.complete_stage(section, stage, epoch),
            }
        }

        self.observe();
        event
    }

    /// Observe sections and gates against the current geometry
    fn observe(&mut self) -> Vec<VisibilityEvent> {
        let offset = self.engine.offset();
        let viewport = self.engine.viewport();
        let events = self.tracker.observe(offset, &viewport);

        let now = self.now;
        let mut effects = Vec::new();
        for slot in &mut self.gates {
            let section = slot.sequencer.section();
            let Some(el) = self.tracker.element(section) else {
                continue;
            };
            let rect = el.borrow().client_rect(offset, &viewport);
            if let Some(in_view) = slot.observer.observe(&rect, &viewport) {
                debug!(section = %section, in_view, "Gate visibility changed");
                effects.push((section, slot.sequencer.on_visibility_change(in_view, now)));
            }
        }
        for (section, batch) in effects {
            self.apply_effects(section, batch);
        }
        events
    }

    fn apply_effects(&mut self, section: SectionId, effects: Vec<GateEffect>) {
        for effect in effects {
            match effect {
                GateEffect::StageStarted {
                    stage,
                    epoch,
                    completes_at: Some(due_at),
                } => {
                    self.timers.schedule(
                        due_at,
                        TimerKind::StageTimeout {
                            section,
                            stage,
                            epoch,
                        },
                    );
                }
                GateEffect::StageStarted { .. } => {}
                GateEffect::Reset { .. } => {
                    self.timers.cancel_section(section);
                }
                GateEffect::AllComplete => {
                    debug!(section = %section, "Reveal finished");
                }
            }
        }
    }

    fn gate_slot_mut(&mut self, section: SectionId) -> Option<&mut GateSlot> {
        self.gates
            .iter_mut()
            .find(|slot| slot.sequencer.section() == section)
    }

    fn complete_stage(&mut self, section: SectionId, stage: usize, epoch: u64) {
        let now = self.now;
        let Some(slot) = self.gate_slot_mut(section) else {
            return;
        };
        let effects = slot.sequencer.on_stage_complete(stage, epoch, now);
        self.apply_effects(section, effects);
    }

    /// Report that a notified stage's animation finished
    ///
    /// Returns whether the signal advanced the sequence.
    pub fn notify_stage_finished(&mut self, section: SectionId, stage: usize, epoch: u64) -> bool {
        let now = self.now;
        let Some(slot) = self.gate_slot_mut(section) else {
            return false;
        };
        let effects = slot.sequencer.on_stage_complete(stage, epoch, now);
        let advanced = !effects.is_empty();
        self.apply_effects(section, effects);
        advanced
    }

    /// Recalculate triggers through the proxy
    pub fn refresh_triggers(&mut self) {
        if !self.mounted {
            return;
        }
        self.triggers.borrow_mut().refresh(&self.proxy);
    }

    pub fn feed(&mut self, raw_delta: f64, kind: InputKind) -> bool {
        self.mounted && self.engine.feed(raw_delta, kind)
    }

    pub fn seek_to(&mut self, offset: f64, immediate: bool) {
        if self.mounted {
            self.engine.seek_to(offset, immediate);
        }
    }

    /// Scroll so the section's top meets the viewport top
    pub fn scroll_to_section(&mut self, id: SectionId, immediate: bool) -> bool {
        if !self.mounted {
            return false;
        }
        match self.tracker.element_top(id) {
            Some(top) => {
                debug!(section = %id, top, immediate, "Scrolling to section");
                self.engine.seek_to(top, immediate);
                true
            }
            None => false,
        }
    }

    /// Jump to a trigger's start through the proxy
    pub fn scroll_to_trigger(&mut self, id: TriggerId) -> bool {
        if !self.mounted {
            return false;
        }
        let Some((start, _)) = self.triggers.borrow().range(id) else {
            return false;
        };
        self.proxy.write_position(start);
        true
    }

    pub fn register_section(&mut self, id: SectionId, element: &ElementRef) {
        if !self.mounted {
            return;
        }
        self.tracker.register(id, element, self.now);
        // A new element starts unseen; a running reveal replays once it shows
        let now = self.now;
        if let Some(slot) = self.gate_slot_mut(id) {
            slot.observer.reset();
            let effects = slot.sequencer.on_visibility_change(false, now);
            self.apply_effects(id, effects);
        }
    }

    /// Unmount a section; its gate goes back to idle
    pub fn unregister_section(&mut self, id: SectionId) -> bool {
        let removed = self.tracker.unregister(id);
        let now = self.now;
        if let Some(slot) = self.gate_slot_mut(id) {
            slot.observer.reset();
            let effects = slot.sequencer.on_visibility_change(false, now);
            self.apply_effects(id, effects);
        }
        removed
    }

    pub fn resize(&mut self, viewport: Viewport, content_height: f64) {
        if !self.mounted {
            return;
        }
        self.engine.set_dimensions(viewport, content_height);
        self.refresh_triggers();
    }

    pub fn lock(&mut self) {
        self.engine.lock();
    }

    pub fn unlock(&mut self) {
        self.engine.unlock();
    }

    pub fn is_locked(&self) -> bool {
        self.engine.engine().is_locked()
    }

    pub fn active_section(&self) -> SectionId {
        self.tracker.active()
    }

    pub fn header(&self) -> HeaderState {
        HeaderState::for_section(self.tracker.active())
    }

    pub fn subscribe_active<F>(&mut self, listener: F) -> ActiveListenerId
    where
        F: FnMut(SectionId) + 'static,
    {
        self.tracker.subscribe(listener)
    }

    pub fn unsubscribe_active(&mut self, id: ActiveListenerId) {
        self.tracker.unsubscribe(id);
    }

    pub fn tracker(&self) -> &SectionTracker {
        &self.tracker
    }

    pub fn gate(&self, section: SectionId) -> Option<&AnimationGateSequencer> {
        self.gates
            .iter()
            .map(|slot| &slot.sequencer)
            .find(|sequencer| sequencer.section() == section)
    }

    pub fn gates(&self) -> impl Iterator<Item = &AnimationGateSequencer> {
        self.gates.iter().map(|slot| &slot.sequencer)
    }

    pub fn add_trigger(&mut self, element: &ElementRef, spec: TriggerSpec) -> TriggerId {
        self.triggers.borrow_mut().add(element, spec)
    }

    pub fn trigger_progress(&self, id: TriggerId) -> Option<f64> {
        self.triggers.borrow().progress(id)
    }

    pub fn triggers(&self) -> Ref<'_, TriggerSet> {
        self.triggers.borrow()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn frames(&self) -> u64 {
        self.render_loop.frames()
    }

    pub fn snapshot(&self) -> PageSnapshot {
        let event = self.engine.snapshot();
        PageSnapshot {
            time: self.now,
            offset: event.offset,
            target: event.target,
            velocity: event.velocity,
            progress: event.progress,
            is_animating: event.is_animating,
            is_locked: self.is_locked(),
            active_section: self.tracker.active(),
            gates: self
                .gates
                .iter()
                .map(|slot| GateSnapshot {
                    section: slot.sequencer.section(),
                    in_view: slot.sequencer.is_in_view(),
                    phase: slot.sequencer.phase(),
                    stages: slot.sequencer.phases().to_vec(),
                })
                .collect(),
        }
    }

    /// Release everything the page acquired; safe to call more than once
    pub fn teardown(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.render_loop.stop();
        self.timers.clear();
        if let Some(id) = self.scroll_subscription.take() {
            self.engine.unsubscribe(id);
        }
        self.triggers.borrow_mut().kill_all();
        self.tracker.clear();
        for slot in &mut self.gates {
            slot.observer.reset();
            slot.sequencer.reset();
        }
        if let Some(guard) = self.slot.take() {
            drop(guard);
        }
        info!(frames = self.render_loop.frames(), "Scroll page torn down");
    }
}

impl Drop for ScrollPage {
    fn drop(&mut self) {
        self.teardown();
    }
}
