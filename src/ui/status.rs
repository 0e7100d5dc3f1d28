//! Status lines
//!
//! One transient message slot per screen region. Success messages clear
//! themselves after a short delay, errors stay until replaced, and a spinner
//! can be shown in front of the text while something is loading.

use std::time::{Duration, Instant};

use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::Theme;

/// How long a non-error message stays visible
pub const AUTO_CLEAR_DELAY: Duration = Duration::from_millis(2200);

const SPINNER_FRAMES: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

/// Screen regions that own a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Below the magnet input
    Magnet,
    /// Below the file list
    Files,
    /// Below the player panel
    Player,
}

impl Region {
    fn slot(self) -> usize {
        match self {
            Region::Magnet => 0,
            Region::Files => 1,
            Region::Player => 2,
        }
    }
}

/// Current content of one region's status line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub is_error: bool,
    pub loader: bool,
    clear_at: Option<Instant>,
}

impl StatusLine {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && !self.loader
    }

    /// Deadline of the pending auto-clear, if one is scheduled
    pub fn clear_at(&self) -> Option<Instant> {
        self.clear_at
    }
}

/// All status lines of the screen
#[derive(Debug, Default)]
pub struct StatusBoard {
    lines: [StatusLine; 3],
    spinner: usize,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a message in a region
    pub fn show(&mut self, region: Region, message: &str, is_error: bool, show_loader: bool) {
        self.show_at(region, message, is_error, show_loader, Instant::now());
    }

    /// Show a message with an explicit clock reading
    pub fn show_at(
        &mut self,
        region: Region,
        message: &str,
        is_error: bool,
        show_loader: bool,
        now: Instant,
    ) {
        let line = &mut self.lines[region.slot()];
        line.clear_at = None;
        line.text = message.to_string();
        line.is_error = is_error;
        line.loader = show_loader;
        if !message.is_empty() && !is_error {
            line.clear_at = Some(now + AUTO_CLEAR_DELAY);
        }
    }

    /// Empty a region's line
    pub fn clear(&mut self, region: Region) {
        self.show(region, "", false, false);
    }

    pub fn get(&self, region: Region) -> &StatusLine {
        &self.lines[region.slot()]
    }

    /// Run due auto-clears and advance the spinner
    pub fn tick(&mut self, now: Instant) {
        for line in self.lines.iter_mut() {
            if line.clear_at.is_some_and(|at| at <= now) {
                line.text.clear();
                line.loader = false;
                line.clear_at = None;
            }
        }
        self.spinner = (self.spinner + 1) % SPINNER_FRAMES.len();
    }

    pub fn spinner_frame(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner]
    }

    /// Render a region's line into `area`
    pub fn render(&self, region: Region, theme: &Theme, frame: &mut Frame, area: Rect) {
        let line = self.get(region);
        if line.is_empty() {
            return;
        }

        let style = if line.is_error {
            theme.error()
        } else {
            theme.success()
        };
        let mut spans = Vec::new();
        if line.loader {
            spans.push(Span::styled(format!("{} ", self.spinner_frame()), theme.accent()));
        }
        spans.push(Span::styled(line.text.clone(), style));
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
