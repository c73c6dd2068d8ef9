//! Virtual scroll engine
//!
//! Owns the smoothed scroll offset. Input nudges a target; each frame tick
//! moves the offset toward the target along the configured easing curve.

use serde::Serialize;
use tracing::{debug, warn};

use super::easing::{EasingType, EasingTypeExt};
use super::timing::{lerp, progress};
use crate::config::ScrollConfig;
use crate::geometry::Viewport;

/// Source of a raw scroll delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Wheel,
    Touch,
    Key,
}

/// Snapshot delivered to scroll subscribers once per animated tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScrollEvent {
    /// Reported offset (wrapped in infinite mode)
    pub offset: f64,
    pub target: f64,
    /// Offset change since the previous update
    pub velocity: f64,
    /// 1 scrolling down, -1 scrolling up, 0 at rest
    pub direction: i8,
    /// offset / limit, 0 when nothing can scroll
    pub progress: f64,
    pub is_animating: bool,
}

/// Public state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VirtualScrollState {
    pub offset: f64,
    pub velocity: f64,
    pub is_animating: bool,
}

#[derive(Debug, Clone)]
struct ActiveAnimation {
    from: f64,
    to: f64,
    elapsed_ms: f64,
    duration_ms: f64,
    easing: EasingType,
}

#[derive(Debug, Clone)]
pub struct VirtualScrollEngine {
    config: ScrollConfig,
    viewport: Viewport,
    content_height: f64,
    /// Unwrapped animated position
    animated: f64,
    target: f64,
    velocity: f64,
    direction: i8,
    animation: Option<ActiveAnimation>,
    last_frame: Option<f64>,
    locked: bool,
    /// A non-animated change is waiting to be reported on the next tick
    dirty: bool,
}

impl VirtualScrollEngine {
    pub fn new(config: ScrollConfig, viewport: Viewport, content_height: f64) -> Self {
        let mut engine = Self {
            config,
            viewport,
            content_height: 0.0,
            animated: 0.0,
            target: 0.0,
            velocity: 0.0,
            direction: 0,
            animation: None,
            last_frame: None,
            locked: false,
            dirty: false,
        };
        engine.set_dimensions(viewport, content_height);
        engine
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    /// Maximum reachable offset: content height minus viewport height
    pub fn limit(&self) -> f64 {
        (self.content_height - self.viewport.height).max(0.0)
    }

    /// Current reported offset
    pub fn offset(&self) -> f64 {
        let limit = self.limit();
        if self.config.infinite && limit > 0.0 {
            self.animated.rem_euclid(limit)
        } else {
            self.animated
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn direction(&self) -> i8 {
        self.direction
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn state(&self) -> VirtualScrollState {
        VirtualScrollState {
            offset: self.offset(),
            velocity: self.velocity,
            is_animating: self.is_animating(),
        }
    }

    pub fn snapshot(&self) -> ScrollEvent {
        let limit = self.limit();
        let offset = self.offset();
        ScrollEvent {
            offset,
            target: self.target,
            velocity: self.velocity,
            direction: self.direction,
            progress: if limit > 0.0 { (offset / limit).clamp(0.0, 1.0) } else { 0.0 },
            is_animating: self.is_animating(),
        }
    }

    /// Update viewport and content size, re-clamping positions
    pub fn set_dimensions(&mut self, viewport: Viewport, content_height: f64) {
        if !viewport.is_usable() || !content_height.is_finite() {
            warn!(
                width = viewport.width,
                height = viewport.height,
                content_height,
                "Ignoring unusable scroll dimensions"
            );
            return;
        }
        self.viewport = viewport;
        self.content_height = content_height.max(0.0);

        if !self.config.infinite {
            let limit = self.limit();
            let clamped_target = self.target.clamp(0.0, limit);
            let clamped_animated = self.animated.clamp(0.0, limit);
            if clamped_target != self.target || clamped_animated != self.animated {
                self.target = clamped_target;
                self.animated = clamped_animated;
                if let Some(anim) = self.animation.as_mut() {
                    anim.from = anim.from.clamp(0.0, limit);
                    anim.to = clamped_target;
                }
                self.dirty = true;
            }
        }
    }

    pub fn set_config(&mut self, config: ScrollConfig) {
        self.config = config;
        let viewport = self.viewport;
        let content_height = self.content_height;
        self.set_dimensions(viewport, content_height);
    }

    /// Ignore user input until `unlock` (an overlay owns the page)
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    fn multiplier(&self, kind: InputKind) -> f64 {
        match kind {
            InputKind::Wheel => self.config.wheel_multiplier,
            InputKind::Touch => self.config.touch_multiplier,
            InputKind::Key => self.config.key_multiplier,
        }
    }

    fn clamp_target(&self, value: f64) -> f64 {
        if self.config.infinite {
            value
        } else {
            value.clamp(0.0, self.limit())
        }
    }

    fn duration_ms(&self) -> f64 {
        self.config.duration_secs * 1000.0
    }

    /// Nudge the target by a raw input delta
    ///
    /// Returns `false` when the delta was dropped (non-finite, zero, or the
    /// engine is locked).
    pub fn feed(&mut self, raw_delta: f64, kind: InputKind) -> bool {
        if !raw_delta.is_finite() {
            warn!(delta = raw_delta, ?kind, "Dropping non-finite scroll delta");
            return false;
        }
        if self.locked {
            debug!(delta = raw_delta, ?kind, "Scroll locked, ignoring input");
            return false;
        }
        let delta = raw_delta * self.multiplier(kind);
        if delta == 0.0 {
            return false;
        }

        let target = self.clamp_target(self.target + delta);
        self.animate_to(target);
        true
    }

    /// Set the target directly
    ///
    /// With `immediate` the offset lands on the target at once and the
    /// resulting snapshot is returned for delivery. Programmatic seeks are
    /// honored while locked.
    pub fn seek_to(&mut self, offset: f64, immediate: bool) -> Option<ScrollEvent> {
        if !offset.is_finite() {
            warn!(offset, "Dropping non-finite seek");
            return None;
        }
        let target = self.clamp_target(offset);

        if immediate || !self.config.smooth_enabled {
            // An immediate jump lands settled and carries no momentum
            self.direction = sign(target - self.animated);
            self.velocity = 0.0;
            self.animated = target;
            self.target = target;
            self.animation = None;
            self.dirty = false;
            return Some(self.snapshot());
        }

        self.animate_to(target);
        None
    }

    fn animate_to(&mut self, target: f64) {
        self.target = target;

        if !self.config.smooth_enabled || self.duration_ms() <= 0.0 {
            self.velocity = target - self.animated;
            self.direction = sign(self.velocity);
            self.animated = target;
            self.animation = None;
            self.dirty = true;
            return;
        }

        if (target - self.animated).abs() < f64::EPSILON && self.animation.is_none() {
            return;
        }

        // Restart from the visible position so retargeting never jumps
        self.animation = Some(ActiveAnimation {
            from: self.animated,
            to: target,
            elapsed_ms: 0.0,
            duration_ms: self.duration_ms(),
            easing: self.config.easing,
        });
    }

    /// Forget the last frame time so the next tick starts a fresh clock
    pub fn resync_clock(&mut self) {
        self.last_frame = None;
    }

    /// Advance one frame
    ///
    /// Returns the snapshot to deliver to subscribers when the offset was
    /// updated this frame.
    pub fn tick(&mut self, frame_time: f64) -> Option<ScrollEvent> {
        if !frame_time.is_finite() {
            debug!(frame_time, "Skipping frame with invalid clock");
            return None;
        }
        let delta_ms = self
            .last_frame
            .map(|last| (frame_time - last).max(0.0))
            .unwrap_or(0.0);
        self.last_frame = Some(frame_time);

        let Some(anim) = self.animation.as_mut() else {
            if self.dirty {
                self.dirty = false;
                let event = self.snapshot();
                self.velocity = 0.0;
                self.direction = 0;
                return Some(event);
            }
            return None;
        };

        anim.elapsed_ms += delta_ms;
        let t = progress(anim.elapsed_ms, anim.duration_ms);
        let completed = t >= 1.0;
        let eased = if completed { 1.0 } else { anim.easing.apply(t) };
        // Bounds hold even if the curve overshoots
        let raw = lerp(anim.from, anim.to, eased);
        let value = self.clamp_target(raw);

        self.velocity = value - self.animated;
        self.direction = sign(self.velocity);
        self.animated = value;
        self.dirty = false;

        if completed {
            self.animation = None;
            self.velocity = 0.0;
            self.direction = 0;
        }

        Some(self.snapshot())
    }
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> VirtualScrollEngine {
        VirtualScrollEngine::new(ScrollConfig::default(), Viewport::new(1280.0, 800.0), 4800.0)
    }

    fn run_frames(engine: &mut VirtualScrollEngine, start: f64, frames: usize) -> f64 {
        let mut now = start;
        for _ in 0..frames {
            now += 16.0;
            engine.tick(now);
        }
        now
    }

    #[test]
    fn test_wheel_converges_without_overshoot() {
        let mut engine = engine();
        engine.tick(0.0);
        assert!(engine.feed(100.0, InputKind::Wheel));

        let mut now = 0.0;
        let mut prev = 0.0;
        for _ in 0..60 {
            now += 16.0;
            engine.tick(now);
            let offset = engine.offset();
            assert!(offset >= prev, "offset went backwards: {} < {}", offset, prev);
            assert!(offset <= 100.0, "overshoot: {}", offset);
            prev = offset;
        }
        assert!((engine.offset() - 100.0).abs() <= 1.0, "offset {}", engine.offset());
    }

    #[test]
    fn test_touch_multiplier_doubles_delta() {
        let mut engine = engine();
        engine.feed(50.0, InputKind::Touch);
        assert!((engine.target() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feed_clamps_to_limit() {
        let mut engine = engine();
        engine.feed(1_000_000.0, InputKind::Wheel);
        assert!((engine.target() - 4000.0).abs() < f64::EPSILON);
        engine.feed(-5_000_000.0, InputKind::Wheel);
        assert_eq!(engine.target(), 0.0);
    }

    #[test]
    fn test_non_finite_delta_is_dropped() {
        let mut engine = engine();
        engine.feed(40.0, InputKind::Wheel);
        assert!(!engine.feed(f64::NAN, InputKind::Wheel));
        assert!(!engine.feed(f64::INFINITY, InputKind::Touch));
        assert!((engine.target() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_immediate_seek_is_idempotent() {
        let mut engine = engine();
        engine.feed(300.0, InputKind::Wheel);
        engine.tick(0.0);
        engine.tick(16.0);

        engine.seek_to(250.0, true);
        engine.seek_to(250.0, true);
        assert_eq!(engine.offset(), 250.0);
        assert!(!engine.is_animating());
    }

    #[test]
    fn test_animated_seek_reaches_target() {
        let mut engine = engine();
        engine.tick(0.0);
        assert!(engine.seek_to(1200.0, false).is_none());
        assert!(engine.is_animating());
        run_frames(&mut engine, 0.0, 100);
        assert_eq!(engine.offset(), 1200.0);
        assert!(!engine.is_animating());
        assert_eq!(engine.velocity(), 0.0);
    }

    #[test]
    fn test_tick_emits_only_while_animating() {
        let mut engine = engine();
        assert!(engine.tick(0.0).is_none());
        engine.feed(80.0, InputKind::Wheel);
        let event = engine.tick(16.0).unwrap();
        assert_eq!(event.direction, 1);
        assert!(event.is_animating);
        let now = run_frames(&mut engine, 16.0, 100);
        assert!(engine.tick(now + 16.0).is_none());
    }

    #[test]
    fn test_locked_engine_ignores_input_but_accepts_seek() {
        let mut engine = engine();
        engine.lock();
        assert!(!engine.feed(100.0, InputKind::Wheel));
        assert!(engine.seek_to(300.0, true).is_some());
        assert_eq!(engine.offset(), 300.0);
        engine.unlock();
        assert!(engine.feed(100.0, InputKind::Wheel));
    }

    #[test]
    fn test_smooth_disabled_jumps() {
        let config = ScrollConfig {
            smooth_enabled: false,
            ..Default::default()
        };
        let mut engine = VirtualScrollEngine::new(config, Viewport::new(1280.0, 800.0), 4800.0);
        engine.feed(120.0, InputKind::Wheel);
        assert_eq!(engine.offset(), 120.0);
        assert!(!engine.is_animating());
        // the jump is still reported once
        assert!(engine.tick(0.0).is_some());
        assert!(engine.tick(16.0).is_none());
    }

    #[test]
    fn test_overshooting_curve_stays_in_bounds() {
        let config = ScrollConfig {
            easing: EasingType::CubicBezier([0.68, -0.55, 0.265, 1.55]),
            ..ScrollConfig::default()
        };
        let mut engine = VirtualScrollEngine::new(config, Viewport::new(1280.0, 800.0), 4800.0);
        let limit = engine.limit();

        let mut now = 0.0;
        engine.tick(now);
        engine.feed(1e6, InputKind::Wheel);
        let mut seen = Vec::new();
        for _ in 0..100 {
            now += 16.0;
            engine.tick(now);
            seen.push(engine.offset());
        }
        engine.seek_to(0.0, false);
        for _ in 0..100 {
            now += 16.0;
            engine.tick(now);
            seen.push(engine.offset());
        }

        assert!(
            seen.iter().all(|o| (0.0..=limit).contains(o)),
            "offset left [0, {}]: {:?}",
            limit,
            seen
        );
        assert_eq!(engine.offset(), 0.0);
    }

    #[test]
    fn test_infinite_mode_wraps() {
        let config = ScrollConfig {
            infinite: true,
            ..Default::default()
        };
        let mut engine = VirtualScrollEngine::new(config, Viewport::new(1280.0, 800.0), 1800.0);
        engine.seek_to(2500.0, true);
        assert!((engine.target() - 2500.0).abs() < f64::EPSILON);
        assert!((engine.offset() - 500.0).abs() < 1e-9);
        engine.seek_to(-200.0, true);
        assert!((engine.offset() - 800.0).abs() < 1e-9);
    }

    #[test]
    fn test_shrinking_content_reclamps() {
        let mut engine = engine();
        engine.seek_to(3500.0, true);
        engine.set_dimensions(Viewport::new(1280.0, 800.0), 2000.0);
        assert_eq!(engine.offset(), 1200.0);
        assert_eq!(engine.target(), 1200.0);
    }

    #[test]
    fn test_unusable_dimensions_are_ignored() {
        let mut engine = engine();
        engine.set_dimensions(Viewport::new(0.0, 0.0), f64::NAN);
        assert_eq!(engine.limit(), 4000.0);
    }

    #[test]
    fn test_retarget_mid_animation_continues_from_current() {
        let mut engine = engine();
        engine.tick(0.0);
        engine.feed(400.0, InputKind::Wheel);
        engine.tick(100.0);
        let mid = engine.offset();
        assert!(mid > 0.0 && mid < 400.0);

        engine.feed(-100.0, InputKind::Wheel);
        assert!((engine.target() - 300.0).abs() < f64::EPSILON);
        engine.tick(116.0);
        // eases toward the new target from where it was, no snap back to 0
        assert!(engine.offset() >= mid.min(300.0) - 1.0);
    }
}
