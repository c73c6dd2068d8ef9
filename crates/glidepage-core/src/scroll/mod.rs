//! Smoothed virtual scrolling
//!
//! # Layers
//!
//! - `easing` - Pure easing functions
//! - `timing` - Frame-clock progress and interpolation helpers
//! - `engine` - The virtual scroll engine (offset, target, input handling)
//! - `handle` - Shared handle with scroll subscriptions
//! - `render_loop` - Owned per-frame driver
//!
//! # Usage
//!
//! ```ignore
//! use glidepage_core::scroll::{EngineHandle, InputKind, RenderLoop, VirtualScrollEngine};
//!
//! let engine = EngineHandle::new(VirtualScrollEngine::new(config, viewport, content_height));
//! let mut render_loop = RenderLoop::new();
//! render_loop.start(&engine);
//!
//! engine.feed(120.0, InputKind::Wheel);
//! // once per frame
//! render_loop.frame(now_ms, &engine);
//! ```

pub mod easing;
pub mod engine;
pub mod handle;
pub mod render_loop;
pub mod timing;

pub use easing::{EasingType, EasingTypeExt};
pub use engine::{InputKind, ScrollEvent, VirtualScrollEngine, VirtualScrollState};
pub use handle::{EngineHandle, SubscriptionId, WeakEngineHandle};
pub use render_loop::RenderLoop;
pub use timing::map_range;
