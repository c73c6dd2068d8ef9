use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

use glidepage_core::SectionId;

use crate::app::App;

pub struct HeaderWidget;

impl HeaderWidget {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let header = app.header.get();
        let style = app.theme.header_style(header.variant);

        frame.render_widget(Block::default().style(style), area);

        // One marker per section, the active one highlighted
        let mut nav: Vec<Span> = Vec::with_capacity(SectionId::ALL.len() * 2);
        for (i, id) in SectionId::ALL.iter().enumerate() {
            let marker = format!(" {} ", i + 1);
            if *id == header.section {
                nav.push(Span::styled(
                    marker,
                    style.add_modifier(Modifier::REVERSED | Modifier::BOLD),
                ));
            } else {
                nav.push(Span::styled(marker, style));
            }
        }

        let title = Line::from(vec![
            Span::styled(" glidepage ", style.add_modifier(Modifier::BOLD)),
            Span::styled(format!("· {}", header.label), style),
        ]);

        if area.height == 0 {
            return;
        }
        let row = Rect {
            y: area.y + area.height / 2,
            height: 1,
            ..area
        };
        frame.render_widget(Paragraph::new(title), row);
        frame.render_widget(
            Paragraph::new(Line::from(nav)).alignment(Alignment::Right),
            row,
        );
    }
}
