//! System media backend
//!
//! Wires the playback manager to the real world: the HLS engine for adaptive
//! playback and the local player for the native path.

use tokio::process::Child;
use tracing::debug;

use crate::stream::hls::{HlsEngine, DEFAULT_POLL_INTERVAL};
use crate::stream::playback::{
    MediaBackend, NativeSession, PlaybackError, SignalSink, StreamEngine,
};
use crate::stream::player::LocalPlayer;

/// Backend using the HLS engine and an external player
pub struct SystemBackend {
    http: reqwest::Client,
    player: LocalPlayer,
    player_available: bool,
    adaptive: bool,
    poll_limit: Option<u32>,
}

impl SystemBackend {
    /// Probe the player once and build the backend
    pub async fn detect(http: reqwest::Client, player: LocalPlayer, adaptive: bool) -> Self {
        let player_available = player.is_available().await;
        debug!(player = %player.player_type(), player_available, adaptive, "media backend ready");
        Self {
            http,
            player,
            player_available,
            adaptive,
            poll_limit: None,
        }
    }

    /// Give up on an empty live playlist after `limit` reloads
    pub fn with_poll_limit(mut self, limit: Option<u32>) -> Self {
        self.poll_limit = limit;
        self
    }

    pub fn player(&self) -> &LocalPlayer {
        &self.player
    }

    pub fn player_available(&self) -> bool {
        self.player_available
    }
}

struct PlayerSession {
    child: Child,
}

impl NativeSession for PlayerSession {
    fn stop(&mut self) {
        let _ = self.child.start_kill();
    }
}

impl MediaBackend for SystemBackend {
    fn engine_supported(&self) -> bool {
        self.adaptive && self.player_available
    }

    fn create_engine(&self, sink: SignalSink) -> Box<dyn StreamEngine> {
        Box::new(
            HlsEngine::new(self.http.clone(), self.player.clone(), sink)
                .with_polling(DEFAULT_POLL_INTERVAL, self.poll_limit),
        )
    }

    fn can_play_type(&self, mime: &str) -> bool {
        self.player_available && LocalPlayer::can_play_type(mime)
    }

    fn play_native(
        &self,
        url: &str,
        ready: SignalSink,
    ) -> Result<Box<dyn NativeSession>, PlaybackError> {
        let child = self.player.spawn(url)?;
        // The player accepted the source; that is the native "can play" moment
        ready.milestone();
        Ok(Box::new(PlayerSession { child }))
    }
}
