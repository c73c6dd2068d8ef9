use std::io;
use std::time::Instant;

use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tracing::info;

use glidepage_core::AppConfig;
use glidepage_tui::{
    app::{App, HEADER_ROWS, STATUS_ROWS},
    event::{AppEvent, EventHandler},
    input::handle_key_event,
    widgets::{HeaderWidget, PageWidget, StatusBarWidget},
};

pub fn run(config: AppConfig) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, SetTitle("glidepage"))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, config);

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, config: AppConfig) -> Result<()> {
    let size = terminal.size()?;
    let event_handler = EventHandler::new(config.ui.tick_rate_ms);

    // Frame clock in milliseconds since start
    let clock = Instant::now();
    let now = || clock.elapsed().as_secs_f64() * 1000.0;

    let mut app = App::new(config, size.width, size.height, now());
    info!(width = size.width, height = size.height, "TUI started");

    loop {
        app.tick(now());

        terminal.draw(|frame| {
            let main_layout = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(HEADER_ROWS),
                    Constraint::Min(1),
                    Constraint::Length(STATUS_ROWS),
                ])
                .split(frame.area());

            HeaderWidget::render(frame, main_layout[0], &app);
            PageWidget::render(frame, main_layout[1], &app);
            StatusBarWidget::render(frame, main_layout[2], &app);
        })?;

        let event = if app.is_animating() {
            event_handler.next()?
        } else {
            event_handler.next_idle()?
        };
        if let Some(event) = event {
            match event {
                AppEvent::Key(key) => {
                    app.clear_status();
                    let action = handle_key_event(key);
                    app.handle_action(action);
                }
                AppEvent::Wheel(notches) => app.wheel(notches),
                AppEvent::Resize(width, height) => app.resize(width, height),
                AppEvent::Tick => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    if let Some(mut page) = app.page.take() {
        page.teardown();
    }
    info!("TUI stopped");
    Ok(())
}
