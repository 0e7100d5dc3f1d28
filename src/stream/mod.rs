//! Streaming infrastructure
//!
//! - Playback: the resource manager owning engine and surface
//! - HLS: adaptive engine that loads the manifest and drives the player
//! - Player: VLC/mpv process control
//! - Backend: the system implementation of the media seam

pub mod backend;
pub mod hls;
pub mod playback;
pub mod player;

pub use backend::SystemBackend;
pub use playback::{
    AttachStrategy, MediaBackend, NativeSession, PlaybackError, PlaybackManager, PlaybackSignal,
    SignalSink, StreamEngine, VideoSurface, HLS_MIME,
};
pub use player::{LocalPlayer, PlayerType};
