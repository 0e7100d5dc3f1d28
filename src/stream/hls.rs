//! Adaptive HLS engine
//!
//! Loads the manifest the server prepared, follows the first variant of a
//! master playlist, waits for the first segment of the (usually still
//! growing) media playlist, and fetches it. Once a fragment has loaded the
//! local player is launched on the manifest. Failures carry short detail
//! names such as `manifestLoadError` and `fragLoadError`.

use std::time::Duration;

use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::stream::playback::{SignalSink, StreamEngine, VideoSurface};
use crate::stream::player::LocalPlayer;

/// Delay between reloads of a live playlist with no segments yet
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Reloads of an empty live playlist before giving up; `None` waits until
/// the playlist ends or the engine is destroyed
pub const DEFAULT_MAX_POLLS: Option<u32> = None;

// =============================================================================
// Playlist Parsing
// =============================================================================

/// The parts of an M3U8 playlist the engine cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playlist {
    /// Master playlist: variant URIs in source order
    Master { variants: Vec<String> },
    /// Media playlist: segment URIs and whether `#EXT-X-ENDLIST` was seen
    Media { segments: Vec<String>, ended: bool },
}

/// Parse playlist text.
///
/// Returns `Err("manifestParseError")` when the `#EXTM3U` header is missing.
pub fn parse_playlist(text: &str) -> Result<Playlist, String> {
    let mut saw_header = false;
    let mut is_master = false;
    let mut expect_variant = false;
    let mut ended = false;
    let mut variants = Vec::new();
    let mut segments = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("#EXTM3U") {
            saw_header = true;
            continue;
        }
        if line.starts_with("#EXT-X-STREAM-INF") {
            is_master = true;
            expect_variant = true;
            continue;
        }
        if line.starts_with("#EXT-X-ENDLIST") {
            ended = true;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        // URI line
        if expect_variant {
            variants.push(line.to_string());
            expect_variant = false;
        } else {
            segments.push(line.to_string());
        }
    }

    if !saw_header {
        return Err("manifestParseError".to_string());
    }

    if is_master {
        Ok(Playlist::Master { variants })
    } else {
        Ok(Playlist::Media { segments, ended })
    }
}

/// Resolve a variant or segment URI against the playlist it came from
pub fn resolve_uri(base: &Url, uri: &str) -> Result<Url, String> {
    base.join(uri)
        .map_err(|e| format!("bad URI '{}': {}", uri, e))
}

async fn fetch_text(http: &reqwest::Client, url: &Url) -> Result<String, String> {
    let response = http.get(url.clone()).send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }
    response.text().await.map_err(|e| e.to_string())
}

/// Find the first segment of the stream, following one master indirection
/// and polling a live playlist until a segment shows up.
///
/// Preparing a large file can take minutes, so without `max_polls` the live
/// playlist is reloaded for as long as the caller keeps the future alive.
pub async fn locate_first_segment(
    http: &reqwest::Client,
    manifest: &str,
    poll_interval: Duration,
    max_polls: Option<u32>,
) -> Result<Url, String> {
    let mut playlist_url =
        Url::parse(manifest).map_err(|e| format!("manifestLoadError: {}", e))?;
    let mut in_level = false;
    let mut polls = 0u32;

    loop {
        let text = fetch_text(http, &playlist_url).await.map_err(|e| {
            let kind = if in_level { "levelLoadError" } else { "manifestLoadError" };
            format!("{}: {}", kind, e)
        })?;

        match parse_playlist(&text)? {
            Playlist::Master { variants } => {
                if in_level {
                    return Err("manifestParseError: nested master playlist".to_string());
                }
                let first = variants
                    .first()
                    .ok_or_else(|| "manifestParseError: no variants".to_string())?;
                playlist_url = resolve_uri(&playlist_url, first)?;
                in_level = true;
                debug!(url = %playlist_url, "following first variant");
            }
            Playlist::Media { segments, ended } => {
                if let Some(first) = segments.first() {
                    return resolve_uri(&playlist_url, first);
                }
                if ended {
                    return Err("levelEmptyError".to_string());
                }
                polls = polls.saturating_add(1);
                if max_polls.is_some_and(|max| polls >= max) {
                    return Err(format!("levelEmptyError: no segments after {} reloads", polls));
                }
                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// HLS engine driving a local player
pub struct HlsEngine {
    http: reqwest::Client,
    player: LocalPlayer,
    sink: SignalSink,
    source: Option<String>,
    task: Option<JoinHandle<()>>,
    poll_interval: Duration,
    max_polls: Option<u32>,
}

impl HlsEngine {
    pub fn new(http: reqwest::Client, player: LocalPlayer, sink: SignalSink) -> Self {
        Self {
            http,
            player,
            sink,
            source: None,
            task: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Override live playlist polling
    pub fn with_polling(mut self, interval: Duration, max_polls: Option<u32>) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }
}

impl StreamEngine for HlsEngine {
    fn load_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
    }

    fn attach_media(&mut self, surface: &VideoSurface) {
        let Some(url) = self.source.clone() else {
            self.sink.fatal(Some("manifestLoadError: no source".to_string()));
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.sink.fatal(Some(format!("engine unavailable: {}", e)));
                return;
            }
        };

        let http = self.http.clone();
        let player = self.player.clone();
        let sink = self.sink.clone();
        let (interval, max_polls) = (self.poll_interval, self.max_polls);
        let surface_id = surface.id();

        self.task = Some(runtime.spawn(async move {
            let segment = match locate_first_segment(&http, &url, interval, max_polls).await {
                Ok(segment) => segment,
                Err(detail) => {
                    warn!(surface = surface_id, %detail, "manifest failed");
                    sink.fatal(Some(detail));
                    return;
                }
            };

            let loaded = match http.get(segment.clone()).send().await {
                Ok(resp) if resp.status().is_success() => resp.bytes().await.is_ok(),
                _ => false,
            };
            if !loaded {
                warn!(surface = surface_id, %segment, "fragment failed");
                sink.fatal(Some("fragLoadError".to_string()));
                return;
            }

            debug!(surface = surface_id, %segment, "first fragment loaded");
            sink.milestone();

            let mut child = match player.spawn(&url) {
                Ok(child) => child,
                Err(e) => {
                    sink.fatal(Some(e.to_string()));
                    return;
                }
            };
            info!(surface = surface_id, player = %player.player_type(), "player started");

            match child.wait().await {
                Ok(status) if status.success() => {
                    info!(surface = surface_id, "player closed");
                }
                Ok(status) => sink.fatal(Some(format!("player exited with {}", status))),
                Err(e) => sink.fatal(Some(format!("player wait failed: {}", e))),
            }
        }));
    }

    fn destroy(&mut self) {
        if let Some(task) = self.task.take() {
            // Dropping the task's child process kills the player
            task.abort();
        }
        self.source = None;
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}
