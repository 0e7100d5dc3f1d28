//! "Preparing, please wait" overlay
//!
//! Shown while the server downloads and converts the file. There is a single
//! slot: showing it again replaces the existing notice.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use crate::ui::Theme;

/// Lines of the notice
pub const WARNING_LINES: [&str; 3] = [
    "Server is downloading and preparing the video.",
    "This may take several minutes for large torrents.",
    "Please stay on this screen until playback begins.",
];

/// Overlay slot
#[derive(Debug, Default)]
pub struct ProgressOverlay {
    notice: Option<Notice>,
    shown_count: u64,
}

/// One displayed notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Sequence number, bumped each time the notice is (re)inserted
    pub id: u64,
}

impl ProgressOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the notice, replacing any existing one
    pub fn show(&mut self) {
        self.shown_count += 1;
        self.notice = Some(Notice {
            id: self.shown_count,
        });
    }

    /// Remove the notice if present
    pub fn hide(&mut self) {
        self.notice = None;
    }

    pub fn is_visible(&self) -> bool {
        self.notice.is_some()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Render centered over `area`
    pub fn render(&self, theme: &Theme, frame: &mut Frame, area: Rect) {
        if self.notice.is_none() {
            return;
        }

        let width = area.width.min(58);
        let height = area.height.min(7);
        let popup = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        };

        let lines = vec![
            Line::from(Span::styled(WARNING_LINES[0], theme.text())),
            Line::from(Span::styled(WARNING_LINES[1], theme.text())),
            Line::from(Span::styled(WARNING_LINES[2], theme.warning())),
        ];

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme.warning())
            .title(Span::styled(" ⚠ PREPARING ", theme.warning()))
            .style(theme.background());

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Center)
                .block(block),
            popup,
        );
    }
}
