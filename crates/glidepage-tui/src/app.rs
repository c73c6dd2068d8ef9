use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info};

use glidepage_core::{
    AppConfig, Environment, HeaderState, InputKind, ScrollPage, SectionLayout, TriggerId,
    TriggerSpec, Viewport,
};

use crate::theme::Theme;

/// Rows taken by the header bar
pub const HEADER_ROWS: u16 = 3;
/// Rows taken by the status bar
pub const STATUS_ROWS: u16 = 1;
/// Virtual pixels per wheel notch
const WHEEL_STEP_PX: f64 = 100.0;
/// Virtual pixels per terminal column
const COLUMN_WIDTH_PX: f64 = 10.0;

/// Application state
pub struct App {
    pub config: AppConfig,
    /// `None` until the terminal offers a usable page area
    pub page: Option<ScrollPage>,
    pub layout: SectionLayout,
    /// Kept current by the active-section subscription
    pub header: Rc<Cell<HeaderState>>,
    /// Scroll-linked trigger driving the main section's image scale
    pub main_scale: Option<TriggerId>,
    pub viewport: Viewport,
    pub theme: Theme,
    pub status_message: Option<String>,
    pub should_quit: bool,
    pub now: f64,
}

impl App {
    /// Build the page for a terminal of `width` x `height` cells
    pub fn new(config: AppConfig, width: u16, height: u16, now: f64) -> Self {
        let viewport = viewport_for(&config, width, height);
        let layout = SectionLayout::stacked(viewport.height, &config.ui.section_viewports);
        let mut app = Self {
            config,
            page: None,
            layout,
            header: Rc::new(Cell::new(HeaderState::default())),
            main_scale: None,
            viewport,
            theme: Theme::default(),
            status_message: None,
            should_quit: false,
            now,
        };
        app.ensure_mounted();
        app
    }

    fn ensure_mounted(&mut self) {
        if self.page.is_some() {
            return;
        }
        let env = Environment::with_viewport(self.viewport);
        let Some(mut page) =
            ScrollPage::mount(&self.config, &env, self.layout.content_height, self.now)
        else {
            return;
        };

        for (id, element) in &self.layout.sections {
            page.register_section(*id, element);
        }

        let header = Rc::clone(&self.header);
        page.subscribe_active(move |section| {
            header.set(HeaderState::for_section(section));
        });

        self.main_scale = self
            .layout
            .get(glidepage_core::SectionId::Main)
            .map(|main| page.add_trigger(main, TriggerSpec::pass_through()));

        info!(
            sections = self.layout.sections.len(),
            content_height = self.layout.content_height,
            "Page ready"
        );
        self.page = Some(page);
    }

    /// Advance one frame
    pub fn tick(&mut self, now: f64) {
        self.now = now;
        if let Some(page) = self.page.as_mut() {
            page.frame(now);
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn offset(&self) -> f64 {
        self.page.as_ref().map(|p| p.engine().offset()).unwrap_or(0.0)
    }

    /// Whether frames should be driven at full rate
    pub fn is_animating(&self) -> bool {
        self.page.as_ref().is_some_and(|page| {
            page.engine().is_animating() || page.gates().any(|gate| gate.playing().is_some())
        })
    }

    pub fn wheel(&mut self, notches: f64) {
        if let Some(page) = self.page.as_mut() {
            page.feed(notches * WHEEL_STEP_PX, InputKind::Wheel);
        }
    }

    pub fn handle_action(&mut self, action: crate::input::Action) {
        use crate::input::Action;

        let line = self.config.scroll.line_height_px;
        let page_step = self.viewport.height * self.config.scroll.page_fraction;
        let half_page = self.viewport.height * 0.5;

        match action {
            Action::Quit => self.should_quit = true,
            Action::ScrollDown => self.feed_key(line),
            Action::ScrollUp => self.feed_key(-line),
            Action::ScrollHalfPageDown => self.feed_key(half_page),
            Action::ScrollHalfPageUp => self.feed_key(-half_page),
            Action::ScrollPageDown => self.feed_key(page_step),
            Action::ScrollPageUp => self.feed_key(-page_step),
            Action::JumpToTop => {
                if let Some(page) = self.page.as_mut() {
                    page.seek_to(0.0, false);
                }
            }
            Action::JumpToBottom => {
                let bottom = self.layout.content_height - self.viewport.height;
                if let Some(page) = self.page.as_mut() {
                    page.seek_to(bottom, false);
                }
            }
            Action::JumpToSection(id) => {
                let moved = self
                    .page
                    .as_mut()
                    .is_some_and(|page| page.scroll_to_section(id, false));
                if moved {
                    self.set_status(format!("Scrolling to {}", id.label()));
                }
            }
            Action::ToggleLock => {
                let Some(page) = self.page.as_mut() else {
                    return;
                };
                if page.is_locked() {
                    page.unlock();
                    self.set_status("Scroll unlocked");
                } else {
                    page.lock();
                    self.set_status("Scroll locked");
                }
            }
            Action::None => {}
        }
    }

    fn feed_key(&mut self, delta: f64) {
        if let Some(page) = self.page.as_mut() {
            if !page.feed(delta, InputKind::Key) && page.is_locked() {
                self.status_message = Some("Scroll is locked (p to unlock)".to_string());
            }
        }
    }

    /// Terminal resized to `width` x `height` cells
    pub fn resize(&mut self, width: u16, height: u16) {
        self.viewport = viewport_for(&self.config, width, height);
        self.layout
            .restack(self.viewport.height, &self.config.ui.section_viewports);
        debug!(
            width = self.viewport.width,
            height = self.viewport.height,
            "Viewport resized"
        );
        match self.page.as_mut() {
            Some(page) => page.resize(self.viewport, self.layout.content_height),
            None => self.ensure_mounted(),
        }
    }

    /// Rows per virtual pixel conversion
    pub fn rows(&self, px: f64) -> f64 {
        px / self.config.ui.row_height_px
    }
}

/// Page area of the terminal in virtual pixels
fn viewport_for(config: &AppConfig, width: u16, height: u16) -> Viewport {
    let rows = height.saturating_sub(HEADER_ROWS + STATUS_ROWS);
    Viewport::new(
        width as f64 * COLUMN_WIDTH_PX,
        rows as f64 * config.ui.row_height_px,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Action;
    use glidepage_core::SectionId;

    fn app() -> App {
        App::new(AppConfig::default(), 120, 44, 0.0)
    }

    #[test]
    fn test_tiny_terminal_stays_static() {
        let mut app = App::new(AppConfig::default(), 80, 3, 0.0);
        assert!(app.page.is_none());
        app.handle_action(Action::ScrollDown);
        app.tick(16.0);
        assert_eq!(app.offset(), 0.0);

        app.resize(80, 30);
        assert!(app.page.is_some());
    }

    #[test]
    fn test_key_scroll_moves_page() {
        let mut app = app();
        app.tick(0.0);
        app.handle_action(Action::ScrollPageDown);
        for i in 1..=120 {
            app.tick(i as f64 * 16.0);
        }
        let expected = app.viewport.height * app.config.scroll.page_fraction;
        assert!((app.offset() - expected).abs() < 1.0);
    }

    #[test]
    fn test_header_follows_section_jump() {
        let mut app = app();
        app.tick(0.0);
        app.handle_action(Action::JumpToSection(SectionId::Building));
        for i in 1..=150 {
            app.tick(i as f64 * 16.0);
        }
        assert_eq!(app.header.get().section, SectionId::Building);
    }

    #[test]
    fn test_lock_blocks_keys() {
        let mut app = app();
        app.handle_action(Action::ToggleLock);
        app.handle_action(Action::ScrollDown);
        app.tick(16.0);
        app.tick(32.0);
        assert_eq!(app.offset(), 0.0);
        assert!(app.status_message.is_some());
    }

    #[test]
    fn test_resize_restacks_sections() {
        let mut app = app();
        let before = app.layout.content_height;
        app.resize(120, 24);
        assert!(app.layout.content_height < before);
        let engine_limit = app.page.as_ref().unwrap().engine().engine().limit();
        assert_eq!(engine_limit, app.layout.content_height - app.viewport.height);
    }
}
