//! Stream-request workflow
//!
//! Drives a magnet link from submission to playback:
//!
//! ```text
//! Idle -> ListingFiles -> FilesReady -> Preparing -> Streaming
//!                              ^            |  ^
//!                              |            v  |
//!                              +-- AwaitingAudioChoice
//! ```
//!
//! Network requests run on background tasks and report back through a
//! channel of [`WorkflowEvent`]s. Every request carries the attempt number it
//! was issued under, and playback signals carry the surface id they belong
//! to; anything that no longer matches is dropped.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::api::{ApiError, CinematorClient, PrepareOutcome};
use crate::app::ListState;
use crate::models::{CacheBuster, FileEntry, StreamHandle, TorrentSource};
use crate::stream::playback::{MediaBackend, PlaybackManager, PlaybackSignal};
use crate::ui::audio::AudioSelector;
use crate::ui::overlay::ProgressOverlay;
use crate::ui::status::{Region, StatusBoard};

pub const LOADING_FILES: &str = "Loading file list…";
pub const NO_PLAYABLE_FILES: &str = "No playable files found in torrent";

// =============================================================================
// Events
// =============================================================================

/// Parameters of one prepare request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRequest {
    pub magnet: TorrentSource,
    pub file_index: u32,
    pub audio: Option<usize>,
}

/// Results delivered to the workflow from background work
#[derive(Debug)]
pub enum WorkflowEvent {
    /// File listing finished
    FilesListed {
        attempt: u64,
        magnet: TorrentSource,
        result: Result<Vec<FileEntry>, ApiError>,
    },
    /// Prepare request finished
    StreamPrepared {
        attempt: u64,
        request: PrepareRequest,
        result: Result<PrepareOutcome, ApiError>,
    },
    /// Signal from the playback path attached to `surface`
    Playback { surface: u64, signal: PlaybackSignal },
}

/// Where the workflow currently rests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    ListingFiles,
    FilesReady,
    Preparing,
    AwaitingAudioChoice,
    Streaming,
}

// =============================================================================
// Workflow
// =============================================================================

pub struct Workflow {
    client: CinematorClient,
    events: UnboundedSender<WorkflowEvent>,
    playback: PlaybackManager,

    pub status: StatusBoard,
    pub overlay: ProgressOverlay,

    state: WorkflowState,
    /// Magnet that produced the current file list
    magnet: Option<TorrentSource>,
    files: Vec<FileEntry>,
    pub file_list: ListState,
    files_visible: bool,

    audio: Option<AudioSelector>,
    /// Request waiting for an audio choice
    pending: Option<PrepareRequest>,

    player_visible: bool,
    play_enabled: bool,
    stream: Option<StreamHandle>,
    milestone_seen: bool,

    listing_attempt: u64,
    prepare_attempt: u64,
    cache_buster: CacheBuster,
}

impl Workflow {
    pub fn new(
        client: CinematorClient,
        backend: Arc<dyn MediaBackend>,
        events: UnboundedSender<WorkflowEvent>,
    ) -> Self {
        Self {
            client,
            playback: PlaybackManager::new(backend, events.clone()),
            events,
            status: StatusBoard::new(),
            overlay: ProgressOverlay::new(),
            state: WorkflowState::Idle,
            magnet: None,
            files: Vec::new(),
            file_list: ListState::new(0),
            files_visible: false,
            audio: None,
            pending: None,
            player_visible: false,
            play_enabled: true,
            stream: None,
            milestone_seen: false,
            listing_attempt: 0,
            prepare_attempt: 0,
            cache_buster: CacheBuster::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn client(&self) -> &CinematorClient {
        &self.client
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn files_visible(&self) -> bool {
        self.files_visible
    }

    pub fn selected_file(&self) -> Option<&FileEntry> {
        self.files.get(self.file_list.selected)
    }

    pub fn magnet(&self) -> Option<&TorrentSource> {
        self.magnet.as_ref()
    }

    pub fn audio_selector(&self) -> Option<&AudioSelector> {
        self.audio.as_ref()
    }

    pub fn audio_selector_mut(&mut self) -> Option<&mut AudioSelector> {
        self.audio.as_mut()
    }

    pub fn player_visible(&self) -> bool {
        self.player_visible
    }

    pub fn play_enabled(&self) -> bool {
        self.play_enabled
    }

    /// Manifest currently attached to the player
    pub fn stream(&self) -> Option<&StreamHandle> {
        self.stream.as_ref()
    }

    pub fn playback(&self) -> &PlaybackManager {
        &self.playback
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Start listing the files of a magnet link.
    ///
    /// Returns false for blank input. Any earlier listing, prepare request or
    /// playback is abandoned.
    pub fn submit_magnet(&mut self, input: &str) -> bool {
        let Some(magnet) = TorrentSource::parse(input) else {
            debug!("ignoring blank magnet");
            return false;
        };

        self.playback.reset();
        self.overlay.hide();
        self.audio = None;
        self.pending = None;
        self.stream = None;
        self.player_visible = false;
        self.files.clear();
        self.file_list = ListState::new(0);
        self.files_visible = false;
        self.play_enabled = true;
        self.status.clear(Region::Files);
        self.status.clear(Region::Player);

        self.listing_attempt += 1;
        self.prepare_attempt += 1;
        self.status.show(Region::Magnet, LOADING_FILES, false, true);
        self.state = WorkflowState::ListingFiles;

        info!(attempt = self.listing_attempt, magnet = %magnet.label(), "listing files");

        let attempt = self.listing_attempt;
        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = client.list_files(&magnet).await;
            let _ = tx.send(WorkflowEvent::FilesListed {
                attempt,
                magnet,
                result,
            });
        });
        true
    }

    /// Highlight a file by position in the list
    pub fn select_file(&mut self, position: usize) {
        if position < self.files.len() {
            self.file_list.selected = position;
        }
    }

    /// Ask the server to prepare the highlighted file.
    ///
    /// No-op while the play control is disabled or nothing is selected.
    pub fn request_play(&mut self) -> bool {
        if !self.play_enabled {
            debug!("play ignored while a request is outstanding");
            return false;
        }
        let (Some(magnet), Some(file)) = (self.magnet.clone(), self.selected_file()) else {
            return false;
        };
        let request = PrepareRequest {
            magnet,
            file_index: file.index,
            audio: None,
        };

        self.play_enabled = false;
        self.playback.reset();
        self.stream = None;
        self.player_visible = false;
        self.audio = None;
        self.pending = None;
        self.milestone_seen = false;
        self.status.clear(Region::Files);
        self.status.clear(Region::Player);
        self.overlay.show();

        self.prepare_attempt += 1;
        self.state = WorkflowState::Preparing;
        info!(attempt = self.prepare_attempt, file = request.file_index, "preparing stream");
        self.spawn_prepare(request);
        true
    }

    /// Continue the pending request with the chosen audio track
    pub fn choose_audio(&mut self, ordinal: usize) -> bool {
        if self.state != WorkflowState::AwaitingAudioChoice {
            return false;
        }
        let track_count = self.audio.as_ref().map_or(0, |a| a.tracks().len());
        if ordinal >= track_count {
            return false;
        }
        let Some(mut request) = self.pending.take() else {
            return false;
        };

        self.audio = None;
        self.play_enabled = true;
        request.audio = Some(ordinal);

        self.prepare_attempt += 1;
        self.state = WorkflowState::Preparing;
        info!(attempt = self.prepare_attempt, audio = ordinal, "audio track chosen");
        self.spawn_prepare(request);
        true
    }

    /// Close the audio selector without choosing
    pub fn abort_audio_choice(&mut self) -> bool {
        if self.state != WorkflowState::AwaitingAudioChoice {
            return false;
        }
        self.audio = None;
        self.pending = None;
        self.overlay.hide();
        self.play_enabled = true;
        self.prepare_attempt += 1;
        self.state = WorkflowState::FilesReady;
        debug!("audio choice aborted");
        true
    }

    /// Tear down the player and go back to the file list
    pub fn stop_playback(&mut self) -> bool {
        if self.state != WorkflowState::Streaming {
            return false;
        }
        self.playback.reset();
        self.overlay.hide();
        self.stream = None;
        self.player_visible = false;
        self.status.clear(Region::Player);
        self.state = WorkflowState::FilesReady;
        info!("playback stopped");
        true
    }

    /// Release the player before exit
    pub fn shutdown(&mut self) {
        self.playback.reset();
        self.stream = None;
    }

    /// Apply one background result
    pub fn handle_event(&mut self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::FilesListed {
                attempt,
                magnet,
                result,
            } => self.on_files_listed(attempt, magnet, result),
            WorkflowEvent::StreamPrepared {
                attempt,
                request,
                result,
            } => self.on_stream_prepared(attempt, request, result),
            WorkflowEvent::Playback { surface, signal } => self.on_playback(surface, signal),
        }
    }

    /// Advance timers
    pub fn tick(&mut self, now: Instant) {
        self.status.tick(now);
    }

    // -------------------------------------------------------------------------
    // Event handlers
    // -------------------------------------------------------------------------

    fn spawn_prepare(&self, request: PrepareRequest) {
        let attempt = self.prepare_attempt;
        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = client
                .prepare_stream(&request.magnet, request.file_index, request.audio)
                .await;
            let _ = tx.send(WorkflowEvent::StreamPrepared {
                attempt,
                request,
                result,
            });
        });
    }

    fn on_files_listed(
        &mut self,
        attempt: u64,
        magnet: TorrentSource,
        result: Result<Vec<FileEntry>, ApiError>,
    ) {
        if attempt != self.listing_attempt {
            debug!(attempt, current = self.listing_attempt, "dropping stale file listing");
            return;
        }

        match result {
            Ok(files) if !files.is_empty() => {
                info!(count = files.len(), "files listed");
                self.status.show(Region::Magnet, "", false, false);
                self.file_list = ListState::new(files.len());
                self.files = files;
                self.files_visible = true;
                self.magnet = Some(magnet);
                self.play_enabled = true;
                self.state = WorkflowState::FilesReady;
            }
            Ok(_) => {
                info!("torrent has no playable files");
                self.status.show(Region::Magnet, NO_PLAYABLE_FILES, true, false);
                self.state = WorkflowState::Idle;
            }
            Err(e) => {
                warn!(error = %e, "file listing failed");
                self.status.show(Region::Magnet, e.listing_summary(), true, false);
                self.state = WorkflowState::Idle;
            }
        }
    }

    fn on_stream_prepared(
        &mut self,
        attempt: u64,
        request: PrepareRequest,
        result: Result<PrepareOutcome, ApiError>,
    ) {
        if attempt != self.prepare_attempt {
            debug!(attempt, current = self.prepare_attempt, "dropping stale prepare result");
            return;
        }

        match result {
            Ok(PrepareOutcome::AudioChoice(tracks)) => {
                if request.audio.is_some() || tracks.is_empty() {
                    warn!(tracks = tracks.len(), "unusable audio track list");
                    self.fail_prepare("Stream error");
                    return;
                }
                info!(tracks = tracks.len(), "server asks for an audio track");
                self.audio = Some(AudioSelector::new(tracks));
                self.pending = Some(request);
                self.state = WorkflowState::AwaitingAudioChoice;
            }
            Ok(PrepareOutcome::Manifest(url)) => {
                let token = self.cache_buster.next();
                let handle = StreamHandle::new(url, token, request.file_index, request.audio);
                info!(url = %handle, "manifest ready");

                self.player_visible = true;
                self.play_enabled = true;
                self.milestone_seen = false;
                self.state = WorkflowState::Streaming;
                let strategy = self.playback.attach(&handle);
                debug!(?strategy, surface = self.playback.surface_id(), "stream attached");
                self.stream = Some(handle);
            }
            Err(e) => {
                warn!(error = %e, "prepare failed");
                self.fail_prepare(e.prepare_summary());
            }
        }
    }

    fn fail_prepare(&mut self, message: &str) {
        self.overlay.hide();
        self.audio = None;
        self.pending = None;
        self.player_visible = false;
        self.play_enabled = true;
        self.status.show(Region::Files, message, true, false);
        self.state = WorkflowState::FilesReady;
    }

    fn on_playback(&mut self, surface: u64, signal: PlaybackSignal) {
        if surface != self.playback.surface_id() || self.state != WorkflowState::Streaming {
            debug!(surface, current = self.playback.surface_id(), "dropping stale playback signal");
            return;
        }

        match signal {
            PlaybackSignal::Milestone => {
                if self.milestone_seen {
                    return;
                }
                self.milestone_seen = true;
                self.overlay.hide();
                info!(surface, "playback started");
            }
            PlaybackSignal::Fatal(detail) => {
                let detail = detail.unwrap_or_else(|| "Fatal error".to_string());
                warn!(surface, %detail, "playback failed");
                self.overlay.hide();
                self.status
                    .show(Region::Player, &format!("Playback error: {}", detail), true, false);
            }
        }
    }
}

impl Drop for Workflow {
    fn drop(&mut self) {
        self.shutdown();
    }
}
