//! Section registry and active-section resolution
//!
//! Sections register an element box when they mount. Each frame the tracker
//! intersects every registered box with a thin activation band just below
//! the viewport top and turns state changes into [`VisibilityEvent`]s. The
//! active section only moves when an event reports a section entering the
//! band; the first such section in registration order wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::HeaderConfig;
use crate::geometry::{ElementRef, Viewport, WeakElementRef};
use crate::observer::{intersect, ObservedState, RootMargin};

/// The closed set of page sections, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Hero,
    Main,
    Spark,
    Building,
    Footer,
}

impl SectionId {
    pub const ALL: [SectionId; 5] = [
        SectionId::Hero,
        SectionId::Main,
        SectionId::Spark,
        SectionId::Building,
        SectionId::Footer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionId::Hero => "hero",
            SectionId::Main => "main",
            SectionId::Spark => "spark",
            SectionId::Building => "building",
            SectionId::Footer => "footer",
        }
    }

    /// Human-readable title
    pub fn label(&self) -> &'static str {
        match self {
            SectionId::Hero => "Meet through moments",
            SectionId::Main => "The tiny things",
            SectionId::Spark => "The spark",
            SectionId::Building => "Building connection",
            SectionId::Footer => "Something new",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl Default for SectionId {
    fn default() -> Self {
        SectionId::ALL[0]
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::UnknownSection(s.to_string()))
    }
}

/// A mounted section
#[derive(Debug, Clone)]
pub struct SectionDescriptor {
    pub id: SectionId,
    pub element: WeakElementRef,
    /// Frame time of (re)registration
    pub registered_at: f64,
}

/// One observed change in a section's band intersection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisibilityEvent {
    pub section_id: SectionId,
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
    pub bounding_top: f64,
}

#[derive(Debug)]
struct TrackedSection {
    descriptor: SectionDescriptor,
    state: ObservedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveListenerId(u64);

type ActiveListener = Box<dyn FnMut(SectionId)>;

pub struct SectionTracker {
    margin: RootMargin,
    sections: Vec<TrackedSection>,
    active: SectionId,
    next_listener: u64,
    listeners: Vec<(ActiveListenerId, ActiveListener)>,
}

impl fmt::Debug for SectionTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionTracker")
            .field("margin", &self.margin)
            .field("sections", &self.sections)
            .field("active", &self.active)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl SectionTracker {
    pub fn new(config: &HeaderConfig) -> Self {
        Self {
            margin: RootMargin::band(config.band_top_px, config.band_fraction),
            sections: Vec::new(),
            active: SectionId::default(),
            next_listener: 0,
            listeners: Vec::new(),
        }
    }

    /// Currently active section
    #[inline]
    pub fn active(&self) -> SectionId {
        self.active
    }

    /// Registered sections in tie-break order
    pub fn registered(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.sections.iter().map(|s| s.descriptor.id)
    }

    pub fn is_registered(&self, id: SectionId) -> bool {
        self.sections.iter().any(|s| s.descriptor.id == id)
    }

    /// Opt a section into tracking
    ///
    /// Re-registering a mounted id swaps in the new element but keeps the
    /// section's place in the tie-break order.
    pub fn register(&mut self, id: SectionId, element: &ElementRef, now: f64) {
        let descriptor = SectionDescriptor {
            id,
            element: std::rc::Rc::downgrade(element),
            registered_at: now,
        };
        if let Some(existing) = self.sections.iter_mut().find(|s| s.descriptor.id == id) {
            debug!(section = %id, "Section re-registered");
            existing.descriptor = descriptor;
            existing.state = ObservedState::default();
        } else {
            debug!(section = %id, "Section registered");
            self.sections.push(TrackedSection {
                descriptor,
                state: ObservedState::default(),
            });
        }
    }

    /// Stop observing a section; the active id is left untouched
    pub fn unregister(&mut self, id: SectionId) -> bool {
        let before = self.sections.len();
        self.sections.retain(|s| s.descriptor.id != id);
        before != self.sections.len()
    }

    /// Element of a registered section, if it is still alive
    pub fn element(&self, id: SectionId) -> Option<ElementRef> {
        self.sections
            .iter()
            .find(|s| s.descriptor.id == id)
            .and_then(|s| s.descriptor.element.upgrade())
    }

    /// Document-space top of a registered section's element
    pub fn element_top(&self, id: SectionId) -> Option<f64> {
        self.element(id).map(|el| el.borrow().top)
    }

    /// Intersect every registered section with the activation band
    ///
    /// Emits events only for sections whose intersection changed, applies
    /// them, and returns them. Sections whose element is gone are dropped.
    pub fn observe(&mut self, offset: f64, viewport: &Viewport) -> Vec<VisibilityEvent> {
        let root = self.margin.root(viewport);
        let mut events = Vec::new();
        let mut orphaned = Vec::new();

        for tracked in &mut self.sections {
            let Some(element) = tracked.descriptor.element.upgrade() else {
                orphaned.push(tracked.descriptor.id);
                continue;
            };
            let rect = element.borrow().client_rect(offset, viewport);
            let hit = intersect(&rect, &root);
            if tracked.state.update(&hit) {
                events.push(VisibilityEvent {
                    section_id: tracked.descriptor.id,
                    is_intersecting: hit.is_intersecting,
                    intersection_ratio: hit.ratio,
                    bounding_top: hit.bounding_top,
                });
            }
        }

        for id in orphaned {
            warn!(section = %id, "Section element is gone, unregistering");
            self.unregister(id);
        }

        self.apply(&events);
        events
    }

    /// Resolve the active section from a batch of events
    ///
    /// Among intersecting events the section registered first wins. Events
    /// for sections that are not registered are ignored. Returns the new
    /// active section when it changed.
    pub fn apply(&mut self, events: &[VisibilityEvent]) -> Option<SectionId> {
        let winner = events
            .iter()
            .filter(|e| e.is_intersecting)
            .filter_map(|e| {
                self.sections
                    .iter()
                    .position(|s| s.descriptor.id == e.section_id)
                    .map(|rank| (rank, e.section_id))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, id)| id)?;

        if winner == self.active {
            return None;
        }

        debug!(from = %self.active, to = %winner, "Active section changed");
        self.active = winner;
        for (_, listener) in self.listeners.iter_mut() {
            listener(winner);
        }
        Some(winner)
    }

    /// Subscribe to active-section changes
    pub fn subscribe<F>(&mut self, listener: F) -> ActiveListenerId
    where
        F: FnMut(SectionId) + 'static,
    {
        let id = ActiveListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ActiveListenerId) {
        self.listeners.retain(|(entry, _)| *entry != id);
    }

    /// Drop every registration and subscription
    pub fn clear(&mut self) {
        self.sections.clear();
        self.listeners.clear();
    }
}
