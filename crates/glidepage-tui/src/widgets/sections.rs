use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use glidepage_core::scroll::timing::delayed_progress;
use glidepage_core::scroll::{map_range, EasingTypeExt};
use glidepage_core::{AnimationGateSequencer, HeaderState, ScrollPage, SectionId, StagePhase};

use crate::app::App;
use crate::theme::Theme;

/// Stagger between the spark section's text lines
const SPARK_LINE_STAGGER_MS: f64 = 150.0;

const SPARK_LINES: [&str; 3] = [
    "A glance across the room.",
    "A laugh at the same moment.",
    "The spark that starts it all.",
];

/// Renders the visible slice of the stacked sections
pub struct PageWidget;

impl PageWidget {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = &app.theme;
        let Some(page) = app.page.as_ref() else {
            let msg = Paragraph::new(Line::from(Span::styled(
                "Terminal too small",
                Style::default().fg(theme.grey2),
            )))
            .alignment(Alignment::Center)
            .block(Block::default().style(Style::default().bg(theme.bg0)));
            frame.render_widget(msg, area);
            return;
        };

        frame.render_widget(
            Block::default().style(Style::default().bg(theme.bg0)),
            area,
        );

        let offset = page.engine().offset();
        let row_height = app.config.ui.row_height_px;

        for (id, element) in &app.layout.sections {
            let rect = element.borrow().client_rect(offset, &app.viewport);
            let top = (rect.top / row_height).floor() as i64;
            let rows = (rect.height / row_height).ceil() as i64;
            let Some(section_area) = clip_rows(area, top, rows) else {
                continue;
            };

            let variant = HeaderState::for_section(*id).variant;
            frame.render_widget(
                Block::default().style(Style::default().bg(theme.section_bg(variant))),
                section_area,
            );

            // Content starts one row below the section's top edge
            let content_top = top + 1;
            let Some(content_area) = clip_rows(area, content_top, top + rows - content_top)
            else {
                continue;
            };
            let hidden = (-content_top).clamp(0, u16::MAX as i64) as u16;
            let lines = section_lines(*id, page, app, theme, content_area.width);
            let paragraph = Paragraph::new(lines).scroll((hidden, 0));
            frame.render_widget(paragraph, content_area);
        }
    }
}

/// Part of `area` covered by `rows` rows starting `top` rows below its top edge
fn clip_rows(area: Rect, top: i64, rows: i64) -> Option<Rect> {
    let start = top.max(0);
    let end = (top + rows).min(area.height as i64);
    if end <= start {
        return None;
    }
    Some(Rect {
        x: area.x,
        y: area.y + start as u16,
        width: area.width,
        height: (end - start) as u16,
    })
}

fn section_lines(
    id: SectionId,
    page: &ScrollPage,
    app: &App,
    theme: &Theme,
    width: u16,
) -> Vec<Line<'static>> {
    let now = page.now();
    let gate = page.gate(id);

    let title_reveal = gate.map(|g| g.stage_progress(0, now)).unwrap_or(1.0);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("  {}", reveal_text(id.label(), title_reveal)),
            theme.section_title(),
        )),
        Line::default(),
    ];

    match id {
        SectionId::Hero => {
            lines.push(Line::from(Span::styled(
                "  Scroll with the wheel, j/k or space. Press 1-5 to jump.",
                Style::default().fg(theme.fg0),
            )));
        }
        SectionId::Main => {
            let progress = app
                .main_scale
                .and_then(|trigger| page.trigger_progress(trigger))
                .unwrap_or(0.0);
            let scale = map_range(progress, (0.2, 0.5), (1.0, 0.6));
            let full = width.saturating_sub(4) as f64;
            let image = (full * scale).round() as usize;
            let pad = ((full - image as f64) / 2.0).max(0.0) as usize;
            for _ in 0..3 {
                lines.push(Line::from(vec![
                    Span::raw(" ".repeat(2 + pad)),
                    Span::styled("▒".repeat(image), Style::default().fg(theme.aqua)),
                ]));
            }
            lines.push(Line::from(Span::styled(
                format!("  scale {:.2}", scale),
                Style::default().fg(theme.grey2),
            )));
        }
        SectionId::Spark => {
            if let Some(gate) = gate {
                lines.extend(spark_lines(gate, now, theme));
            }
        }
        SectionId::Building | SectionId::Footer => {}
    }

    if let Some(gate) = gate {
        lines.push(Line::default());
        lines.extend(stage_lines(gate, now, theme, width));
    }
    lines
}

/// One progress bar per reveal stage
fn stage_lines(
    gate: &AnimationGateSequencer,
    now: f64,
    theme: &Theme,
    width: u16,
) -> Vec<Line<'static>> {
    let bar_width = (width as usize).saturating_sub(24).min(40);
    gate.stages()
        .iter()
        .enumerate()
        .map(|(i, stage)| {
            let progress = gate.stage_progress(i, now).clamp(0.0, 1.0);
            let filled = (bar_width as f64 * progress).round() as usize;
            let color = if gate.playing() == Some(i) {
                theme.accent
            } else if gate.stage_phase(i) == Some(StagePhase::Complete) {
                theme.green
            } else {
                theme.grey0
            };
            Line::from(vec![
                Span::styled(
                    format!("  {:<12} ", stage.name),
                    Style::default().fg(theme.grey2),
                ),
                Span::styled("━".repeat(filled), Style::default().fg(color)),
                Span::styled(
                    "─".repeat(bar_width - filled),
                    Style::default().fg(theme.bg2),
                ),
                Span::styled(
                    format!(" {:>3}%", (progress * 100.0).round() as u32),
                    Style::default().fg(theme.grey2),
                ),
            ])
        })
        .collect()
}

/// Spark copy, each line staggered behind the previous one
fn spark_lines(gate: &AnimationGateSequencer, now: f64, theme: &Theme) -> Vec<Line<'static>> {
    let text_stage = gate.stages().iter().position(|s| s.name == "text");
    let line_progress = |line: usize| -> f64 {
        let Some(stage) = text_stage else {
            return 1.0;
        };
        if gate.stage_progress(stage, now) >= 1.0 {
            return 1.0;
        }
        let Some(elapsed) = gate.stage_elapsed(stage, now) else {
            return 0.0;
        };
        let config = &gate.stages()[stage];
        let t = delayed_progress(
            elapsed,
            config.delay_ms as f64 + line as f64 * SPARK_LINE_STAGGER_MS,
            config.duration_ms as f64,
        );
        config.easing.apply(t)
    };

    SPARK_LINES
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let progress = line_progress(i);
            let style = if progress >= 1.0 {
                Style::default().fg(theme.fg1)
            } else {
                Style::default().fg(theme.grey0).add_modifier(Modifier::ITALIC)
            };
            Line::from(Span::styled(format!("  {}", reveal_text(text, progress)), style))
        })
        .collect()
}

/// Leading share of `text` visible at `progress`
fn reveal_text(text: &str, progress: f64) -> String {
    let count = text.chars().count();
    let visible = (count as f64 * progress.clamp(0.0, 1.0)).ceil() as usize;
    text.chars().take(visible).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glidepage_core::AppConfig;
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|frame| PageWidget::render(frame, frame.area(), app))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_hero_at_top() {
        let mut app = App::new(AppConfig::default(), 80, 24, 0.0);
        app.tick(0.0);
        let text = rendered(&app);
        assert!(text.contains("Meet through moments"), "{:?}", text);
    }

    #[test]
    fn test_small_terminal_message() {
        let app = App::new(AppConfig::default(), 80, 3, 0.0);
        assert!(rendered(&app).contains("Terminal too small"));
    }

    #[test]
    fn test_clip_rows() {
        let area = Rect::new(0, 3, 80, 20);
        assert_eq!(clip_rows(area, -5, 10), Some(Rect::new(0, 3, 80, 5)));
        assert_eq!(clip_rows(area, 15, 10), Some(Rect::new(0, 18, 80, 5)));
        assert_eq!(clip_rows(area, 20, 4), None);
        assert_eq!(clip_rows(area, -10, 4), None);
    }

    #[test]
    fn test_stage_bar_colors() {
        let config = AppConfig::default();
        let theme = Theme::default();
        let spark = config.gate_for(SectionId::Spark).unwrap();
        let mut gate = AnimationGateSequencer::new(spark);
        gate.on_visibility_change(true, 0.0);
        gate.on_stage_complete(0, gate.epoch(), 600.0);

        let bar_color = |lines: &[Line], i: usize| lines[i].spans[1].style.fg;
        let lines = stage_lines(&gate, 700.0, &theme, 80);
        assert_eq!(bar_color(&lines, 0), Some(theme.green));
        assert_eq!(bar_color(&lines, 1), Some(theme.accent));
        assert_eq!(bar_color(&lines, 2), Some(theme.grey0));
    }

    #[test]
    fn test_reveal_text() {
        assert_eq!(reveal_text("spark", 0.0), "");
        assert_eq!(reveal_text("spark", 0.5), "spa");
        assert_eq!(reveal_text("spark", 1.0), "spark");
    }
}
