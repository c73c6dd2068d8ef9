use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;

pub struct StatusBarWidget;

impl StatusBarWidget {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = &app.theme;

        let status_text = if let Some(msg) = &app.status_message {
            format!(" {}", msg)
        } else if let Some(page) = app.page.as_ref() {
            let state = page.engine().snapshot();
            let mode = if page.is_locked() {
                "LOCKED"
            } else if state.is_animating {
                "SCROLLING"
            } else {
                "IDLE"
            };
            format!(
                " {} | {:>6.0}px | {:>3.0}% | v {:>+7.1}",
                mode,
                state.offset,
                state.progress * 100.0,
                state.velocity
            )
        } else {
            " WAITING | resize the terminal".to_string()
        };

        let help_hint = " q:quit j/k:scroll space:page 1-5:sections p:lock ";
        let padding_len = area
            .width
            .saturating_sub(status_text.len() as u16 + help_hint.len() as u16)
            as usize;

        let mode_style = if app.page.as_ref().is_some_and(|p| p.is_locked()) {
            Style::default().fg(theme.warning).bg(theme.bg2)
        } else {
            Style::default().fg(theme.fg0).bg(theme.bg2)
        };

        let line = Line::from(vec![
            Span::styled(status_text, mode_style),
            Span::styled(" ".repeat(padding_len), Style::default().bg(theme.bg2)),
            Span::styled(help_hint, Style::default().fg(theme.grey2).bg(theme.bg2)),
        ]);

        frame.render_widget(Paragraph::new(line), area);
    }
}
