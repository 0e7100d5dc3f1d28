//! Playback resource manager
//!
//! Owns the video surface and the streaming engine attached to it. Before a
//! new stream is attached the previous engine is destroyed and the surface is
//! swapped for a fresh one with a new identity, so late signals from the old
//! engine can be recognised as stale and dropped.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::models::StreamHandle;
use crate::stream::player::PlayerError;
use crate::workflow::WorkflowEvent;

/// MIME type of an HLS manifest
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// Errors from the playback layer
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("HLS playback is not supported by the configured player")]
    Unsupported,
    #[error(transparent)]
    Player(#[from] PlayerError),
}

// =============================================================================
// Signals
// =============================================================================

/// The two notifications a playback path can deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    /// Playable data arrived (first fragment loaded, or the player is ready)
    Milestone,
    /// Playback cannot continue
    Fatal(Option<String>),
}

/// Delivers signals for one surface back to the workflow
#[derive(Debug, Clone)]
pub struct SignalSink {
    surface: u64,
    tx: UnboundedSender<WorkflowEvent>,
}

impl SignalSink {
    pub fn new(surface: u64, tx: UnboundedSender<WorkflowEvent>) -> Self {
        Self { surface, tx }
    }

    /// Identity of the surface these signals belong to
    pub fn surface(&self) -> u64 {
        self.surface
    }

    pub fn milestone(&self) {
        self.send(PlaybackSignal::Milestone);
    }

    pub fn fatal(&self, detail: Option<String>) {
        self.send(PlaybackSignal::Fatal(detail));
    }

    fn send(&self, signal: PlaybackSignal) {
        // The receiver only goes away on shutdown
        let _ = self.tx.send(WorkflowEvent::Playback {
            surface: self.surface,
            signal,
        });
    }
}

// =============================================================================
// Backend Traits
// =============================================================================

/// An adaptive streaming engine instance
pub trait StreamEngine: Send {
    /// Remember the manifest to load
    fn load_source(&mut self, url: &str);
    /// Start loading into the given surface
    fn attach_media(&mut self, surface: &VideoSurface);
    /// Release network and player resources. Safe to call more than once.
    fn destroy(&mut self);
}

/// A stream played directly by the surface, without the engine
pub trait NativeSession: Send {
    fn stop(&mut self);
}

/// Everything the manager needs from the platform
pub trait MediaBackend: Send + Sync {
    /// Whether the adaptive engine can run here
    fn engine_supported(&self) -> bool;

    /// Create an engine that reports through `sink`
    fn create_engine(&self, sink: SignalSink) -> Box<dyn StreamEngine>;

    /// Whether the surface can play `mime` natively
    fn can_play_type(&self, mime: &str) -> bool;

    /// Play `url` natively; `ready` fires once when playback can start
    fn play_native(
        &self,
        url: &str,
        ready: SignalSink,
    ) -> Result<Box<dyn NativeSession>, PlaybackError>;
}

// =============================================================================
// Video Surface
// =============================================================================

/// The slot the player renders into.
///
/// A surface is never reused: resetting playback creates a new one with a
/// larger id.
pub struct VideoSurface {
    id: u64,
    src: Option<String>,
    native: Option<Box<dyn NativeSession>>,
}

impl VideoSurface {
    fn new(id: u64) -> Self {
        Self {
            id,
            src: None,
            native: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Source set for native playback, if any
    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn retire(mut self) {
        if let Some(mut native) = self.native.take() {
            native.stop();
        }
    }
}

impl std::fmt::Debug for VideoSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSurface")
            .field("id", &self.id)
            .field("src", &self.src)
            .field("native", &self.native.is_some())
            .finish()
    }
}

// =============================================================================
// Playback Manager
// =============================================================================

/// Which playback path `attach` took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachStrategy {
    Engine,
    Native,
    Unsupported,
}

/// Single owner of the engine instance and the video surface
pub struct PlaybackManager {
    backend: Arc<dyn MediaBackend>,
    events: UnboundedSender<WorkflowEvent>,
    engine: Option<Box<dyn StreamEngine>>,
    surface: VideoSurface,
}

impl PlaybackManager {
    pub fn new(backend: Arc<dyn MediaBackend>, events: UnboundedSender<WorkflowEvent>) -> Self {
        Self {
            backend,
            events,
            engine: None,
            surface: VideoSurface::new(1),
        }
    }

    /// Current surface identity
    pub fn surface_id(&self) -> u64 {
        self.surface.id
    }

    pub fn surface(&self) -> &VideoSurface {
        &self.surface
    }

    /// Whether an engine instance is alive
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Tear down everything attached and install a fresh surface.
    ///
    /// Idempotent; always bumps the surface id.
    pub fn reset(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            debug!(surface = self.surface.id, "destroying streaming engine");
            engine.destroy();
        }
        let next = VideoSurface::new(self.surface.id + 1);
        let old = std::mem::replace(&mut self.surface, next);
        old.retire();
    }

    /// Attach a stream to the current surface.
    ///
    /// Exactly one path is taken; when none is available a fatal signal is
    /// emitted right away.
    pub fn attach(&mut self, handle: &StreamHandle) -> AttachStrategy {
        if self.engine.is_some() || self.surface.native.is_some() {
            // Callers reset first; make sure two engines never share a surface
            self.reset();
        }

        let sink = SignalSink::new(self.surface.id, self.events.clone());

        if self.backend.engine_supported() {
            info!(surface = self.surface.id, url = %handle, "attaching streaming engine");
            let mut engine = self.backend.create_engine(sink);
            engine.load_source(handle.url());
            engine.attach_media(&self.surface);
            self.engine = Some(engine);
            return AttachStrategy::Engine;
        }

        if self.backend.can_play_type(HLS_MIME) {
            info!(surface = self.surface.id, url = %handle, "playing stream natively");
            self.surface.src = Some(handle.url().to_string());
            match self.backend.play_native(handle.url(), sink.clone()) {
                Ok(session) => self.surface.native = Some(session),
                Err(e) => {
                    warn!(error = %e, "native playback failed to start");
                    sink.fatal(Some(e.to_string()));
                }
            }
            return AttachStrategy::Native;
        }

        warn!("no playback path for HLS");
        sink.fatal(Some(PlaybackError::Unsupported.to_string()));
        AttachStrategy::Unsupported
    }
}

impl std::fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("engine", &self.engine.is_some())
            .field("surface", &self.surface)
            .finish()
    }
}

impl Drop for PlaybackManager {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.destroy();
        }
        if let Some(mut native) = self.surface.native.take() {
            native.stop();
        }
    }
}
