//! Edge-triggered viewport intersection observation
//!
//! Mirrors how an intersection observer behaves: a root rectangle (the
//! viewport shrunk by margins) is intersected with each target's client
//! rectangle, and a record is produced only when the target's state changes.

use crate::geometry::{Rect, Viewport};

/// Root rectangle definition relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootMargin {
    /// Pixels removed from the top of the viewport
    pub top_px: f64,
    /// Pixels removed from the bottom of the viewport
    pub bottom_px: f64,
    /// Fraction of the viewport height removed from the bottom
    pub bottom_fraction: f64,
}

impl RootMargin {
    /// Symmetric inset, as in a `-100px` margin
    pub fn uniform(px: f64) -> Self {
        Self {
            top_px: px,
            bottom_px: px,
            bottom_fraction: 0.0,
        }
    }

    /// Thin strip from `top_px` down to `fraction` of the viewport height
    pub fn band(top_px: f64, fraction: f64) -> Self {
        Self {
            top_px,
            bottom_px: 0.0,
            bottom_fraction: 1.0 - fraction.clamp(0.0, 1.0),
        }
    }

    pub fn root(&self, viewport: &Viewport) -> Rect {
        let bottom = self.bottom_px + viewport.height * self.bottom_fraction;
        viewport.rect().inset_vertical(self.top_px, bottom)
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// Result of intersecting one target with the root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub is_intersecting: bool,
    /// Visible share of the target, in [0, 1]
    pub ratio: f64,
    pub bounding_top: f64,
}

pub fn intersect(target: &Rect, root: &Rect) -> Intersection {
    let overlap = target.vertical_overlap(root);
    let ratio = if target.height > 0.0 {
        (overlap / target.height).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Intersection {
        is_intersecting: overlap > 0.0,
        ratio,
        bounding_top: target.top,
    }
}

/// Last reported state for one target
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObservedState {
    pub is_intersecting: bool,
    pub ratio: f64,
    /// Whether a record was ever produced for this target
    pub primed: bool,
}

impl ObservedState {
    /// Record `next` and report whether it differs from the previous state
    ///
    /// The first observation always reports, like an observer's initial
    /// callback.
    pub fn update(&mut self, next: &Intersection) -> bool {
        let changed = !self.primed
            || self.is_intersecting != next.is_intersecting
            || (self.ratio - next.ratio).abs() > f64::EPSILON;
        self.is_intersecting = next.is_intersecting;
        self.ratio = next.ratio;
        self.primed = true;
        changed
    }
}

/// Boolean in-view detection for a single element with a threshold
#[derive(Debug, Clone)]
pub struct ViewObserver {
    margin: RootMargin,
    threshold: f64,
    in_view: Option<bool>,
}

impl ViewObserver {
    pub fn new(margin: RootMargin, threshold: f64) -> Self {
        Self {
            margin,
            threshold: threshold.clamp(0.0, 1.0),
            in_view: None,
        }
    }

    pub fn in_view(&self) -> bool {
        self.in_view.unwrap_or(false)
    }

    /// Observe the target; returns the new in-view value when it flipped
    pub fn observe(&mut self, target: &Rect, viewport: &Viewport) -> Option<bool> {
        let hit = intersect(target, &self.margin.root(viewport));
        let now_in_view = if self.threshold > 0.0 {
            hit.is_intersecting && hit.ratio + f64::EPSILON >= self.threshold
        } else {
            hit.is_intersecting
        };
        match self.in_view {
            Some(prev) if prev == now_in_view => None,
            // Nothing to report for a target that starts out of view
            None if !now_in_view => {
                self.in_view = Some(false);
                None
            }
            _ => {
                self.in_view = Some(now_in_view);
                Some(now_in_view)
            }
        }
    }

    /// Forget the last state (target remounted)
    pub fn reset(&mut self) {
        self.in_view = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_root() {
        let viewport = Viewport::new(1000.0, 800.0);
        let root = RootMargin::band(1.0, 0.01).root(&viewport);
        assert!((root.top - 1.0).abs() < 1e-9);
        assert!((root.bottom() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersect_ratio() {
        let root = Rect::new(0.0, 0.0, 100.0, 100.0);
        let target = Rect::new(50.0, 0.0, 100.0, 200.0);
        let hit = intersect(&target, &root);
        assert!(hit.is_intersecting);
        assert!((hit.ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_observed_state_edges() {
        let mut state = ObservedState::default();
        let out = Intersection {
            is_intersecting: false,
            ratio: 0.0,
            bounding_top: 900.0,
        };
        assert!(state.update(&out));
        assert!(!state.update(&out));
        let hit = Intersection {
            is_intersecting: true,
            ratio: 0.1,
            bounding_top: 5.0,
        };
        assert!(state.update(&hit));
    }

    #[test]
    fn test_view_observer_threshold() {
        let viewport = Viewport::new(1000.0, 800.0);
        let mut observer = ViewObserver::new(RootMargin::default(), 0.3);

        // 20% visible
        let target = Rect::new(640.0, 0.0, 1000.0, 800.0);
        assert_eq!(observer.observe(&target, &viewport), None);
        assert!(!observer.in_view());

        // 40% visible
        let target = Rect::new(480.0, 0.0, 1000.0, 800.0);
        assert_eq!(observer.observe(&target, &viewport), Some(true));
        assert_eq!(observer.observe(&target, &viewport), None);

        let target = Rect::new(900.0, 0.0, 1000.0, 800.0);
        assert_eq!(observer.observe(&target, &viewport), Some(false));
    }

    #[test]
    fn test_view_observer_margin() {
        let viewport = Viewport::new(1000.0, 800.0);
        let mut observer = ViewObserver::new(RootMargin::uniform(100.0), 0.0);
        // top edge 50px into the viewport bottom, inside the margin
        let target = Rect::new(750.0, 0.0, 1000.0, 300.0);
        assert_eq!(observer.observe(&target, &viewport), None);
        let target = Rect::new(650.0, 0.0, 1000.0, 300.0);
        assert_eq!(observer.observe(&target, &viewport), Some(true));
    }
}
