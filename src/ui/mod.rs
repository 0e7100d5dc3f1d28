//! Terminal UI components
//!
//! Built with ratatui. Keyboard-first navigation throughout; the only mouse
//! the user needs is for pasting a magnet link.

pub mod audio;
pub mod overlay;
pub mod screen;
pub mod status;
pub mod theme;

pub use audio::AudioSelector;
pub use overlay::ProgressOverlay;
pub use status::{Region, StatusBoard};
pub use theme::{Theme, ThemeMode};
