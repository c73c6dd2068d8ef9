use ratatui::style::{Color, Modifier, Style};

use glidepage_core::HeaderVariant;

/// Runtime theme colors
#[derive(Debug, Clone)]
pub struct Theme {
    // Background colors
    pub bg0: Color,
    pub bg1: Color,
    pub bg2: Color,
    pub bg_dark: Color,

    // Foreground colors
    pub fg0: Color,
    pub fg1: Color,
    pub grey0: Color,
    pub grey2: Color,

    // Palette colors
    pub orange: Color,
    pub yellow: Color,
    pub green: Color,
    pub aqua: Color,

    // Semantic colors
    pub accent: Color,
    pub warning: Color,
}

impl Default for Theme {
    fn default() -> Self {
        // Gruvbox Dark
        Self {
            bg0: Color::Rgb(0x28, 0x28, 0x28),
            bg1: Color::Rgb(0x32, 0x30, 0x2f),
            bg2: Color::Rgb(0x45, 0x40, 0x3d),
            bg_dark: Color::Rgb(0x1d, 0x20, 0x21),
            fg0: Color::Rgb(0xd4, 0xbe, 0x98),
            fg1: Color::Rgb(0xdd, 0xc7, 0xa1),
            grey0: Color::Rgb(0x7c, 0x6f, 0x64),
            grey2: Color::Rgb(0xa8, 0x99, 0x84),
            orange: Color::Rgb(0xe7, 0x8a, 0x4e),
            yellow: Color::Rgb(0xd8, 0xa6, 0x57),
            green: Color::Rgb(0xa9, 0xb6, 0x65),
            aqua: Color::Rgb(0x89, 0xb4, 0x82),
            accent: Color::Rgb(0x89, 0xb4, 0x82),
            warning: Color::Rgb(0xe7, 0x8a, 0x4e),
        }
    }
}

impl Theme {
    /// Header bar style for the section underneath it
    pub fn header_style(&self, variant: HeaderVariant) -> Style {
        match variant {
            HeaderVariant::Transparent => Style::default().fg(self.fg1).bg(self.bg0),
            HeaderVariant::Light => Style::default().fg(self.bg0).bg(self.fg0),
            HeaderVariant::Dark => Style::default().fg(self.orange).bg(self.bg_dark),
        }
    }

    /// Background used to fill a section's rows
    pub fn section_bg(&self, variant: HeaderVariant) -> Color {
        match variant {
            HeaderVariant::Transparent => self.bg1,
            HeaderVariant::Light => self.bg0,
            HeaderVariant::Dark => self.bg_dark,
        }
    }

    pub fn section_title(&self) -> Style {
        Style::default()
            .fg(self.yellow)
            .add_modifier(Modifier::BOLD)
    }
}
