//! Scroll orchestration for single-page scroll experiences.
//!
//! Raw wheel/touch/key input is smoothed into a virtual scroll offset by the
//! [`scroll`] engine. The offset is exposed to a pin/trigger subsystem through
//! [`proxy::ScrollProxy`], drives the header's active section through
//! [`sections::SectionTracker`], and arms per-section reveal sequences in
//! [`gate::AnimationGateSequencer`]. [`page::ScrollPage`] wires all of it to a
//! single frame clock.

pub mod config;
pub mod error;
pub mod gate;
pub mod geometry;
pub mod header;
pub mod observer;
pub mod page;
pub mod proxy;
pub mod scroll;
pub mod sections;
pub mod timers;
pub mod trigger;

pub use config::{AppConfig, EasingType, GateConfig, ScrollConfig, StageConfig};
pub use error::{Error, Result};
pub use gate::{AnimationGateSequencer, GatePhase, StagePhase};
pub use geometry::{ElementBox, ElementRef, Rect, Viewport};
pub use header::{HeaderState, HeaderVariant};
pub use page::{Environment, PageSnapshot, ScrollPage, SectionLayout};
pub use proxy::{NativeScrollLike, PinStrategy, ScrollProxy};
pub use scroll::{EngineHandle, InputKind, RenderLoop, ScrollEvent, VirtualScrollEngine};
pub use sections::{SectionId, SectionTracker, VisibilityEvent};
pub use trigger::{Anchor, PinTriggerSubsystem, TriggerId, TriggerSet, TriggerSpec};
