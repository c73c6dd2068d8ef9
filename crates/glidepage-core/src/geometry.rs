//! Screen geometry shared by the engine, the observers and the trigger set.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;

/// Visible area of the document in virtual pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A viewport with no usable area cannot host the page
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Rectangle anchored at the viewport origin
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Axis-aligned rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Height of the vertical overlap with `other`, zero when disjoint
    pub fn vertical_overlap(&self, other: &Rect) -> f64 {
        let top = self.top.max(other.top);
        let bottom = self.bottom().min(other.bottom());
        (bottom - top).max(0.0)
    }

    /// Shrink the rectangle vertically by `top` and `bottom` insets
    pub fn inset_vertical(&self, top: f64, bottom: f64) -> Rect {
        let new_top = self.top + top;
        let height = (self.height - top - bottom).max(0.0);
        Rect::new(new_top, self.left, self.width, height)
    }
}

/// Layout box of a section element in document coordinates
///
/// `translate_y` is written by transform-based pinning; the document
/// position itself never moves.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementBox {
    pub top: f64,
    pub height: f64,
    pub translate_y: f64,
}

impl ElementBox {
    pub fn new(top: f64, height: f64) -> Self {
        Self {
            top,
            height,
            translate_y: 0.0,
        }
    }

    /// Client rectangle for a scroll offset
    pub fn client_rect(&self, offset: f64, viewport: &Viewport) -> Rect {
        Rect::new(
            self.top + self.translate_y - offset,
            0.0,
            viewport.width,
            self.height,
        )
    }
}

/// Shared handle to an element box; observers hold the weak side
pub type ElementRef = Rc<RefCell<ElementBox>>;
pub type WeakElementRef = Weak<RefCell<ElementBox>>;

pub fn element(top: f64, height: f64) -> ElementRef {
    Rc::new(RefCell::new(ElementBox::new(top, height)))
}
