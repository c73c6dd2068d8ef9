//! Render loop driver
//!
//! An owned per-frame driver with explicit `start`/`stop`. Each frame
//! advances the scroll engine and nothing else; everything downstream reacts
//! to the notification the engine emits.

use tracing::debug;

use super::engine::ScrollEvent;
use super::handle::EngineHandle;

#[derive(Debug, Default)]
pub struct RenderLoop {
    running: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin driving frames; the engine clock restarts so time spent stopped
    /// does not turn into one huge frame
    pub fn start(&mut self, engine: &EngineHandle) {
        if self.running {
            return;
        }
        engine.resync_clock();
        self.running = true;
        debug!("Render loop started");
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            debug!(frames = self.frames, "Render loop stopped");
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames driven since creation
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Drive one frame at `frame_time` (milliseconds)
    ///
    /// Does nothing once stopped.
    pub fn frame(&mut self, frame_time: f64, engine: &EngineHandle) -> Option<ScrollEvent> {
        if !self.running {
            return None;
        }
        self.frames += 1;
        engine.tick(frame_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrollConfig;
    use crate::geometry::Viewport;
    use crate::scroll::{InputKind, VirtualScrollEngine};

    fn handle() -> EngineHandle {
        EngineHandle::new(VirtualScrollEngine::new(
            ScrollConfig::default(),
            Viewport::new(1280.0, 800.0),
            4800.0,
        ))
    }

    #[test]
    fn test_stopped_loop_does_not_tick() {
        let engine = handle();
        let mut render_loop = RenderLoop::new();
        engine.feed(100.0, InputKind::Wheel);
        assert!(render_loop.frame(16.0, &engine).is_none());
        assert_eq!(engine.offset(), 0.0);

        render_loop.start(&engine);
        render_loop.frame(16.0, &engine);
        render_loop.frame(32.0, &engine);
        assert!(engine.offset() > 0.0);
        assert_eq!(render_loop.frames(), 2);

        render_loop.stop();
        let frozen = engine.offset();
        render_loop.frame(48.0, &engine);
        assert_eq!(engine.offset(), frozen);
    }

    #[test]
    fn test_restart_resyncs_clock() {
        let engine = handle();
        let mut render_loop = RenderLoop::new();
        render_loop.start(&engine);
        render_loop.frame(0.0, &engine);
        engine.feed(100.0, InputKind::Wheel);
        render_loop.frame(16.0, &engine);
        let before = engine.offset();

        render_loop.stop();
        render_loop.start(&engine);
        // ten seconds later: first frame after restart has zero delta
        render_loop.frame(10_000.0, &engine);
        assert!((engine.offset() - before).abs() < 1e-9);
        assert!(engine.is_animating());
    }
}
