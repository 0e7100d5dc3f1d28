//! App state and keyboard handling
//!
//! Owns the workflow plus the bits of state that only exist in the terminal:
//! the magnet input line, the input mode and the theme. Keys are mapped to
//! workflow operations here; everything else lives in `workflow`.

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, warn};

use crate::config::Config;
use crate::ui::Theme;
use crate::workflow::{Workflow, WorkflowState};

// =============================================================================
// Input Mode
// =============================================================================

/// Current input mode for keyboard handling
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (magnet box focused)
    Editing,
}

/// Which panel receives navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Magnet,
    Files,
    Audio,
}

// =============================================================================
// Selection State
// =============================================================================

/// Selection state for list views
#[derive(Debug, Clone, Default)]
pub struct ListState {
    /// Currently selected index
    pub selected: usize,
    /// Total number of items
    pub len: usize,
}

impl ListState {
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    /// Move selection up
    pub fn up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move selection down
    pub fn down(&mut self) {
        if self.len > 0 && self.selected < self.len - 1 {
            self.selected += 1;
        }
    }

    /// Move selection up by a page
    pub fn page_up(&mut self, page_size: usize) {
        self.selected = self.selected.saturating_sub(page_size);
    }

    /// Move selection down by a page
    pub fn page_down(&mut self, page_size: usize) {
        if self.len > 0 {
            self.selected = (self.selected + page_size).min(self.len - 1);
        }
    }

    /// Jump to first item
    pub fn first(&mut self) {
        self.selected = 0;
    }

    /// Jump to last item
    pub fn last(&mut self) {
        if self.len > 0 {
            self.selected = self.len - 1;
        }
    }

    /// Update length, clamping the selection
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}

// =============================================================================
// Magnet Input
// =============================================================================

/// Single-line text input. `cursor` is a byte offset on a char boundary.
#[derive(Debug, Clone, Default)]
pub struct MagnetInput {
    pub text: String,
    pub cursor: usize,
}

impl MagnetInput {
    /// Insert character at cursor
    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    /// Insert pasted text at cursor, dropping line breaks
    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars().filter(|c| *c != '\n' && *c != '\r') {
            self.insert(c);
        }
    }

    /// Delete character before cursor
    pub fn backspace(&mut self) {
        if let Some(c) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
            self.text.remove(self.cursor);
        }
    }

    /// Delete character at cursor
    pub fn delete(&mut self) {
        if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
        }
    }

    pub fn cursor_left(&mut self) {
        if let Some(c) = self.text[..self.cursor].chars().next_back() {
            self.cursor -= c.len_utf8();
        }
    }

    pub fn cursor_right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.text.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

// =============================================================================
// Main Application State
// =============================================================================

/// Main application state
pub struct App {
    pub workflow: Workflow,
    pub theme: Theme,
    pub config: Config,
    /// Where theme changes are saved; `None` means the default path
    config_path: Option<PathBuf>,
    /// Whether the app is running
    pub running: bool,
    pub input_mode: InputMode,
    pub magnet: MagnetInput,
}

impl App {
    pub fn new(workflow: Workflow, config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            workflow,
            theme: Theme::new(config.theme_mode()),
            config,
            config_path,
            running: true,
            // Nothing to navigate before a magnet is entered
            input_mode: InputMode::Editing,
            magnet: MagnetInput::default(),
        }
    }

    /// Panel that receives navigation keys
    pub fn focus(&self) -> Focus {
        if self.workflow.state() == WorkflowState::AwaitingAudioChoice {
            Focus::Audio
        } else if self.input_mode == InputMode::Editing {
            Focus::Magnet
        } else {
            Focus::Files
        }
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Switch theme and persist the choice
    pub fn toggle_theme(&mut self) {
        self.theme.toggle();
        self.config.theme_mode = Some(self.theme.mode);
        let saved = match &self.config_path {
            Some(path) => Config::save_theme_to(path, self.theme.mode),
            None => Config::save_theme(self.theme.mode),
        };
        if let Err(e) = saved {
            warn!(error = %e, "could not save theme preference");
        }
    }

    /// Text pasted into the terminal
    pub fn handle_paste(&mut self, text: &str) {
        if self.focus() == Focus::Audio {
            return;
        }
        self.input_mode = InputMode::Editing;
        self.magnet.insert_str(text);
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event, returns true if event was consumed
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Global quit shortcut
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return true;
        }

        match self.focus() {
            Focus::Audio => self.handle_audio_key(key),
            Focus::Magnet => self.handle_editing_key(key),
            Focus::Files => self.handle_normal_key(key),
        }
    }

    /// Handle keys in editing (text input) mode
    fn handle_editing_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                if !self.workflow.files().is_empty() {
                    self.input_mode = InputMode::Normal;
                }
                true
            }
            KeyCode::Enter => {
                if self.workflow.submit_magnet(&self.magnet.text) {
                    self.input_mode = InputMode::Normal;
                }
                true
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.magnet.clear();
                true
            }
            KeyCode::Char(c) => {
                self.magnet.insert(c);
                true
            }
            KeyCode::Backspace => {
                self.magnet.backspace();
                true
            }
            KeyCode::Delete => {
                self.magnet.delete();
                true
            }
            KeyCode::Left => {
                self.magnet.cursor_left();
                true
            }
            KeyCode::Right => {
                self.magnet.cursor_right();
                true
            }
            KeyCode::Home => {
                self.magnet.cursor_home();
                true
            }
            KeyCode::End => {
                self.magnet.cursor_end();
                true
            }
            _ => false,
        }
    }

    /// Handle keys in normal navigation mode
    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Char('/') | KeyCode::Char('m') => self.input_mode = InputMode::Editing,
            KeyCode::Up | KeyCode::Char('k') => self.workflow.file_list.up(),
            KeyCode::Down | KeyCode::Char('j') => self.workflow.file_list.down(),
            KeyCode::PageUp => self.workflow.file_list.page_up(10),
            KeyCode::PageDown => self.workflow.file_list.page_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.workflow.file_list.first(),
            KeyCode::End | KeyCode::Char('G') => self.workflow.file_list.last(),
            KeyCode::Enter | KeyCode::Char('p') => {
                if !self.workflow.request_play() {
                    debug!("play not available");
                }
            }
            KeyCode::Char('x') => {
                self.workflow.stop_playback();
            }
            KeyCode::Char('t') => self.toggle_theme(),
            _ => return false,
        }
        true
    }

    /// Handle keys while the audio selector is open
    fn handle_audio_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => self.quit(),
            KeyCode::Esc => {
                self.workflow.abort_audio_choice();
            }
            KeyCode::Enter => {
                let choice = self
                    .workflow
                    .audio_selector()
                    .and_then(|a| a.selected_ordinal());
                if let Some(ordinal) = choice {
                    self.workflow.choose_audio(ordinal);
                }
            }
            KeyCode::Char(c @ '1'..='9') => {
                let ordinal = (c as usize) - ('1' as usize);
                self.workflow.choose_audio(ordinal);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some(selector) = self.workflow.audio_selector_mut() {
                    selector.list.up();
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(selector) = self.workflow.audio_selector_mut() {
                    selector.list.down();
                }
            }
            _ => return false,
        }
        true
    }
}

// =============================================================================
// Tests
// =============================================================================
