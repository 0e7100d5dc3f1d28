//! cinemator - terminal client for a torrent streaming server
//!
//! Paste a magnet link, pick one of its files, and the server downloads and
//! converts it to HLS while a local player plays it.
//!
//! # Modules
//!
//! - `models` - Magnet links, file entries, audio tracks, stream handles
//! - `api` - Client for the streaming server
//! - `stream` - Playback manager, HLS engine, local player
//! - `workflow` - Request workflow from magnet to playback
//! - `ui` - TUI components
//! - `app` - Keyboard shell around the workflow
//! - `config`, `cli`, `commands` - Configuration and scriptable commands

pub mod api;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod stream;
pub mod ui;
pub mod workflow;

// Re-export commonly used types
pub use api::{ApiError, CinematorClient, PrepareOutcome};
pub use app::App;
pub use config::Config;
pub use models::{AudioTrack, FileEntry, StreamHandle, TorrentSource};
pub use workflow::{Workflow, WorkflowEvent, WorkflowState};
