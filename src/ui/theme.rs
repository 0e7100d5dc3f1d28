//! Dark and light themes for cinemator
//!
//! Color palettes and style helpers for the TUI. The selected mode is the
//! only UI preference that is persisted (see `Config::theme_mode`).

use std::fmt;

use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

/// Theme mode, stored as `dark` / `light`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Dark,
    Light,
}

impl ThemeMode {
    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Dark => ThemeMode::Light,
            ThemeMode::Light => ThemeMode::Dark,
        }
    }

    /// Guess from the terminal's `COLORFGBG` (`fg;bg`), dark when unknown
    pub fn detect() -> Self {
        std::env::var("COLORFGBG")
            .ok()
            .map(|v| Self::from_colorfgbg(&v))
            .unwrap_or_default()
    }

    /// Background indices 7 and 15 are the light greys/whites of the ANSI palette
    pub fn from_colorfgbg(value: &str) -> Self {
        match value.rsplit(';').next().map(str::trim) {
            Some("7") | Some("15") => ThemeMode::Light,
            _ => ThemeMode::Dark,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeMode::Dark => write!(f, "dark"),
            ThemeMode::Light => write!(f, "light"),
        }
    }
}

/// Colors of one theme mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub background_light: Color,
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub text: Color,
    pub dim: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub border: Color,
}

impl Palette {
    // ═══════════════════════════════════════════════════════════════════════
    // DARK: neon on deep black-blue
    // ═══════════════════════════════════════════════════════════════════════
    pub const DARK: Palette = Palette {
        background: Color::Rgb(0x0a, 0x0a, 0x0f),
        background_light: Color::Rgb(0x14, 0x14, 0x1e),
        primary: Color::Rgb(0x00, 0xff, 0xf2),
        secondary: Color::Rgb(0xff, 0x00, 0xff),
        accent: Color::Rgb(0xff, 0xff, 0x00),
        text: Color::Rgb(0xe0, 0xe0, 0xe0),
        dim: Color::Rgb(0x70, 0x70, 0x80),
        success: Color::Rgb(0x00, 0xff, 0x00),
        warning: Color::Rgb(0xff, 0xaa, 0x00),
        error: Color::Rgb(0xff, 0x33, 0x5c),
        border: Color::Rgb(0x00, 0x80, 0x78),
    };

    // ═══════════════════════════════════════════════════════════════════════
    // LIGHT: ink on paper
    // ═══════════════════════════════════════════════════════════════════════
    pub const LIGHT: Palette = Palette {
        background: Color::Rgb(0xfa, 0xfa, 0xf7),
        background_light: Color::Rgb(0xec, 0xec, 0xe6),
        primary: Color::Rgb(0x00, 0x5f, 0x73),
        secondary: Color::Rgb(0x7a, 0x1f, 0x8a),
        accent: Color::Rgb(0x8a, 0x4b, 0x00),
        text: Color::Rgb(0x1c, 0x1c, 0x22),
        dim: Color::Rgb(0x5c, 0x5c, 0x66),
        success: Color::Rgb(0x1b, 0x6e, 0x20),
        warning: Color::Rgb(0x8f, 0x4a, 0x00),
        error: Color::Rgb(0xb0, 0x00, 0x20),
        border: Color::Rgb(0x6a, 0x9a, 0xa0),
    };
}

/// Style source for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub mode: ThemeMode,
    pub palette: Palette,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeMode::default())
    }
}

impl Theme {
    pub fn new(mode: ThemeMode) -> Self {
        let palette = match mode {
            ThemeMode::Dark => Palette::DARK,
            ThemeMode::Light => Palette::LIGHT,
        };
        Self { mode, palette }
    }

    /// Switch to the other mode
    pub fn toggle(&mut self) {
        *self = Self::new(self.mode.toggled());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STYLE HELPERS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn background(&self) -> Style {
        Style::default().bg(self.palette.background)
    }

    /// Default text style
    pub fn text(&self) -> Style {
        Style::default().fg(self.palette.text).bg(self.palette.background)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.palette.dim)
    }

    pub fn error(&self) -> Style {
        Style::default()
            .fg(self.palette.error)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.palette.success)
    }

    pub fn warning(&self) -> Style {
        Style::default()
            .fg(self.palette.warning)
            .add_modifier(Modifier::BOLD)
    }

    /// Title/header style
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.palette.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn secondary(&self) -> Style {
        Style::default().fg(self.palette.secondary)
    }

    pub fn accent(&self) -> Style {
        Style::default()
            .fg(self.palette.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.palette.border)
    }

    pub fn border_focused(&self) -> Style {
        Style::default()
            .fg(self.palette.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn list_item(&self) -> Style {
        Style::default().fg(self.palette.text)
    }

    pub fn list_item_selected(&self) -> Style {
        Style::default()
            .fg(self.palette.background)
            .bg(self.palette.primary)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for input fields
    pub fn input(&self) -> Style {
        Style::default()
            .fg(self.palette.text)
            .bg(self.palette.background_light)
    }

    /// Keybinding hint style
    pub fn keybind(&self) -> Style {
        Style::default().fg(self.palette.accent)
    }

    pub fn keybind_desc(&self) -> Style {
        Style::default().fg(self.palette.dim)
    }

    pub fn status_bar(&self) -> Style {
        Style::default()
            .fg(self.palette.text)
            .bg(self.palette.background_light)
    }

    /// Disabled control
    pub fn disabled(&self) -> Style {
        Style::default()
            .fg(self.palette.dim)
            .add_modifier(Modifier::CROSSED_OUT)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COLOR UTILITIES
// ═══════════════════════════════════════════════════════════════════════════

/// Calculate relative luminance for a color (used in contrast ratio)
/// Formula: https://www.w3.org/TR/WCAG20/#relativeluminancedef
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn channel_luminance(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    0.2126 * channel_luminance(r) + 0.7152 * channel_luminance(g) + 0.0722 * channel_luminance(b)
}

/// Calculate contrast ratio between two colors
/// Returns a value between 1 (same color) and 21 (black/white)
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let l1 = relative_luminance(fg.0, fg.1, fg.2);
    let l2 = relative_luminance(bg.0, bg.1, bg.2);

    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };

    (lighter + 0.05) / (darker + 0.05)
}

/// Check if a foreground/background pair meets WCAG AA for normal text
pub fn meets_wcag_aa(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 4.5
}

/// Check if a foreground/background pair meets WCAG AA for large text
pub fn meets_wcag_aa_large(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> bool {
    contrast_ratio(fg, bg) >= 3.0
}

/// Extract RGB tuple from ratatui Color (only works for Rgb variant)
pub fn color_to_rgb(color: Color) -> Option<(u8, u8, u8)> {
    match color {
        Color::Rgb(r, g, b) => Some((r, g, b)),
        _ => None,
    }
}
