//! Workflow Tests
//!
//! Drives the request workflow end to end against a mocked server, with a
//! recording media backend standing in for the player.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cinemator::api::CinematorClient;
use cinemator::stream::playback::{
    MediaBackend, NativeSession, PlaybackError, SignalSink, StreamEngine, VideoSurface,
};
use cinemator::ui::status::Region;
use cinemator::workflow::{Workflow, WorkflowEvent, WorkflowState, LOADING_FILES};
use mockito::{Matcher, Mock, Server, ServerGuard};
use tokio::sync::mpsc::{self, UnboundedReceiver};

const MAGNET_A: &str = "magnet:?xt=urn:btih:aaaa&dn=First";
const MAGNET_B: &str = "magnet:?xt=urn:btih:bbbb&dn=Second";

// =============================================================================
// Recording backend
// =============================================================================

#[derive(Default)]
struct Record {
    /// Manifest URLs handed to engines, in order
    sources: Vec<String>,
    /// Surfaces engines were attached to
    surfaces: Vec<u64>,
    destroyed: usize,
    sinks: Vec<SignalSink>,
}

#[derive(Clone, Default)]
struct RecordingBackend(Arc<Mutex<Record>>);

struct RecordingEngine {
    record: Arc<Mutex<Record>>,
    sink: SignalSink,
}

impl StreamEngine for RecordingEngine {
    fn load_source(&mut self, url: &str) {
        self.record.lock().unwrap().sources.push(url.to_string());
    }

    fn attach_media(&mut self, surface: &VideoSurface) {
        let mut record = self.record.lock().unwrap();
        record.surfaces.push(surface.id());
        record.sinks.push(self.sink.clone());
    }

    fn destroy(&mut self) {
        self.record.lock().unwrap().destroyed += 1;
    }
}

impl MediaBackend for RecordingBackend {
    fn engine_supported(&self) -> bool {
        true
    }

    fn create_engine(&self, sink: SignalSink) -> Box<dyn StreamEngine> {
        Box::new(RecordingEngine {
            record: self.0.clone(),
            sink,
        })
    }

    fn can_play_type(&self, _mime: &str) -> bool {
        false
    }

    fn play_native(
        &self,
        _url: &str,
        _ready: SignalSink,
    ) -> Result<Box<dyn NativeSession>, PlaybackError> {
        Err(PlaybackError::Unsupported)
    }
}

impl RecordingBackend {
    fn last_sink(&self) -> SignalSink {
        self.0.lock().unwrap().sinks.last().cloned().expect("no engine attached")
    }

    fn sources(&self) -> Vec<String> {
        self.0.lock().unwrap().sources.clone()
    }

    fn destroyed(&self) -> usize {
        self.0.lock().unwrap().destroyed
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn setup(server: &ServerGuard) -> (Workflow, UnboundedReceiver<WorkflowEvent>, RecordingBackend) {
    let backend = RecordingBackend::default();
    let (tx, rx) = mpsc::unbounded_channel();
    let client = CinematorClient::new(server.url());
    let workflow = Workflow::new(client, Arc::new(backend.clone()), tx);
    (workflow, rx, backend)
}

async fn next_event(rx: &mut UnboundedReceiver<WorkflowEvent>) -> WorkflowEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for workflow event")
        .expect("event channel closed")
}

/// Deliver the next event to the workflow
async fn pump(wf: &mut Workflow, rx: &mut UnboundedReceiver<WorkflowEvent>) {
    let event = next_event(rx).await;
    wf.handle_event(event);
}

async fn mock_files(server: &mut ServerGuard, magnet: &str, body: &str) -> Mock {
    server
        .mock("GET", "/files-listing")
        .match_query(Matcher::UrlEncoded("magnet".into(), magnet.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

const MOVIE_FILES: &str = r#"[
    {"index": 0, "name": "movie.mkv", "size": 734003200},
    {"index": 2, "name": "sample.mp4", "size": 5242880}
]"#;

/// Mock a prepare endpoint that redirects to a manifest
async fn mock_manifest(server: &mut ServerGuard, query: &str, hls_dir: &str) -> (Mock, Mock) {
    let prepare = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::Regex(query.into()))
        .with_status(302)
        .with_header("location", &format!("/hls/{}/index.m3u8", hls_dir))
        .create_async()
        .await;
    let manifest = server
        .mock("GET", &*format!("/hls/{}/index.m3u8", hls_dir))
        .with_status(200)
        .with_header("content-type", "application/vnd.apple.mpegurl")
        .with_body("#EXTM3U\n")
        .create_async()
        .await;
    (prepare, manifest)
}

async fn files_ready(
    server: &mut ServerGuard,
) -> (Workflow, UnboundedReceiver<WorkflowEvent>, RecordingBackend, Mock) {
    let files = mock_files(server, MAGNET_A, MOVIE_FILES).await;
    let (mut wf, mut rx, backend) = setup(server);
    assert!(wf.submit_magnet(MAGNET_A));
    pump(&mut wf, &mut rx).await;
    assert_eq!(wf.state(), WorkflowState::FilesReady);
    (wf, rx, backend, files)
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_submit_lists_files() {
    let mut server = Server::new_async().await;
    let mock = mock_files(&mut server, MAGNET_A, MOVIE_FILES).await;
    let (mut wf, mut rx, _backend) = setup(&server);

    assert!(wf.submit_magnet(&format!("  {}  ", MAGNET_A)));
    assert_eq!(wf.state(), WorkflowState::ListingFiles);
    let status = wf.status.get(Region::Magnet);
    assert_eq!(status.text, LOADING_FILES);
    assert!(status.loader);

    pump(&mut wf, &mut rx).await;
    mock.assert_async().await;

    assert!(wf.files_visible());
    assert!(wf.status.get(Region::Magnet).is_empty());
    let labels: Vec<String> = wf.files().iter().map(|f| f.label()).collect();
    assert_eq!(labels, vec!["movie.mkv (700.00 MB)", "sample.mp4 (5.00 MB)"]);
}

#[tokio::test]
async fn test_double_submit_shows_latest_list_only() {
    let mut server = Server::new_async().await;
    let _a = mock_files(
        &mut server,
        MAGNET_A,
        r#"[{"index": 0, "name": "first.mkv", "size": 1048576}]"#,
    )
    .await;
    let _b = mock_files(
        &mut server,
        MAGNET_B,
        r#"[{"index": 5, "name": "second.mkv", "size": 2097152}]"#,
    )
    .await;
    let (mut wf, mut rx, _backend) = setup(&server);

    wf.submit_magnet(MAGNET_A);
    wf.submit_magnet(MAGNET_B);

    // Both responses arrive; whichever order, only the second one sticks
    pump(&mut wf, &mut rx).await;
    pump(&mut wf, &mut rx).await;

    assert_eq!(wf.files().len(), 1);
    assert_eq!(wf.files()[0].name, "second.mkv");
    assert_eq!(wf.magnet().map(|m| m.as_str()), Some(MAGNET_B));
}

#[tokio::test]
async fn test_empty_torrent() {
    let mut server = Server::new_async().await;
    let _mock = mock_files(&mut server, MAGNET_A, "[]").await;
    let (mut wf, mut rx, _backend) = setup(&server);

    wf.submit_magnet(MAGNET_A);
    pump(&mut wf, &mut rx).await;

    let status = wf.status.get(Region::Magnet);
    assert_eq!(status.text, "No playable files found in torrent");
    assert!(status.is_error);
    assert!(!wf.files_visible());
    assert_eq!(wf.state(), WorkflowState::Idle);
}

// =============================================================================
// Prepare
// =============================================================================

#[tokio::test]
async fn test_prepare_failure_keeps_file_list() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let _prepare = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    assert!(wf.request_play());
    assert!(wf.overlay.is_visible());
    assert!(!wf.play_enabled());
    // Play is ignored while the request is outstanding
    assert!(!wf.request_play());

    pump(&mut wf, &mut rx).await;

    let status = wf.status.get(Region::Files);
    assert_eq!(status.text, "Stream error");
    assert!(status.is_error);
    assert!(!wf.overlay.is_visible());
    assert!(wf.play_enabled());
    assert!(!wf.player_visible());
    assert_eq!(wf.files().len(), 2);
    assert!(backend.sources().is_empty());
}

#[tokio::test]
async fn test_play_sends_server_index() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let (prepare, _manifest) = mock_manifest(&mut server, "file=2$", "bbbb_2").await;

    wf.select_file(1);
    assert!(wf.request_play());
    pump(&mut wf, &mut rx).await;
    prepare.assert_async().await;

    assert_eq!(wf.state(), WorkflowState::Streaming);
    assert!(wf.player_visible());
    assert!(wf.play_enabled());
    let sources = backend.sources();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].contains("/hls/bbbb_2/index.m3u8?t="));
}

#[tokio::test]
async fn test_audio_choice_reissues_with_ordinal() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;

    let ask = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::Regex("file=0$".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"title": "English"}, {"title": "Español", "language": "es"}]"#)
        .expect(1)
        .create_async()
        .await;
    let (with_audio, _manifest) = mock_manifest(&mut server, "file=0&audio=1$", "aaaa_0_1").await;

    wf.request_play();
    pump(&mut wf, &mut rx).await;
    ask.assert_async().await;

    assert_eq!(wf.state(), WorkflowState::AwaitingAudioChoice);
    assert!(!wf.player_visible());
    let labels = wf.audio_selector().map(|a| a.labels()).unwrap();
    assert_eq!(labels, vec!["English", "Español (es)"]);

    assert!(wf.choose_audio(1));
    assert!(wf.audio_selector().is_none());
    pump(&mut wf, &mut rx).await;
    with_audio.assert_async().await;

    assert_eq!(wf.state(), WorkflowState::Streaming);
    assert!(wf.player_visible());
    assert_eq!(wf.stream().and_then(|s| s.audio), Some(1));
    assert_eq!(backend.sources().len(), 1);
}

// =============================================================================
// Playback
// =============================================================================

#[tokio::test]
async fn test_replay_uses_fresh_token_and_destroys_engine() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let _mocks = mock_manifest(&mut server, "file=0$", "aaaa_0").await;

    wf.request_play();
    pump(&mut wf, &mut rx).await;
    let first_surface = wf.playback().surface_id();

    wf.request_play();
    pump(&mut wf, &mut rx).await;

    let sources = backend.sources();
    assert_eq!(sources.len(), 2);
    assert_ne!(sources[0], sources[1]);
    assert_eq!(backend.destroyed(), 1);
    assert!(wf.playback().surface_id() > first_surface);
    let surfaces = backend.0.lock().unwrap().surfaces.clone();
    assert_eq!(surfaces, vec![first_surface, wf.playback().surface_id()]);
}

#[tokio::test]
async fn test_overlay_hidden_once_on_first_milestone() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let _mocks = mock_manifest(&mut server, "file=0$", "aaaa_0").await;

    wf.request_play();
    pump(&mut wf, &mut rx).await;
    assert!(wf.overlay.is_visible());

    let sink = backend.last_sink();
    sink.milestone();
    pump(&mut wf, &mut rx).await;
    assert!(!wf.overlay.is_visible());

    sink.milestone();
    pump(&mut wf, &mut rx).await;
    assert!(!wf.overlay.is_visible());
    assert!(wf.status.get(Region::Player).is_empty());
}

#[tokio::test]
async fn test_fatal_error_reported_in_player_region() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let _mocks = mock_manifest(&mut server, "file=0$", "aaaa_0").await;

    wf.request_play();
    pump(&mut wf, &mut rx).await;

    backend
        .last_sink()
        .fatal(Some("manifestLoadError: HTTP 404 Not Found".into()));
    pump(&mut wf, &mut rx).await;

    let status = wf.status.get(Region::Player);
    assert_eq!(status.text, "Playback error: manifestLoadError: HTTP 404 Not Found");
    assert!(status.is_error);
    assert!(!wf.overlay.is_visible());
    assert_eq!(wf.files().len(), 2);
    assert!(wf.play_enabled());
}

#[tokio::test]
async fn test_late_signal_from_replaced_engine_ignored() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let _mocks = mock_manifest(&mut server, "file=0$", "aaaa_0").await;

    wf.request_play();
    pump(&mut wf, &mut rx).await;
    let old_sink = backend.last_sink();

    wf.request_play();
    pump(&mut wf, &mut rx).await;
    assert!(wf.overlay.is_visible());

    old_sink.fatal(Some("stale".into()));
    old_sink.milestone();
    pump(&mut wf, &mut rx).await;
    pump(&mut wf, &mut rx).await;

    assert!(wf.status.get(Region::Player).is_empty());
    assert!(wf.overlay.is_visible());
}

#[tokio::test]
async fn test_stop_playback_returns_to_files() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let _mocks = mock_manifest(&mut server, "file=0$", "aaaa_0").await;

    wf.request_play();
    pump(&mut wf, &mut rx).await;
    assert!(wf.stop_playback());

    assert_eq!(wf.state(), WorkflowState::FilesReady);
    assert!(!wf.player_visible());
    assert!(wf.stream().is_none());
    assert_eq!(backend.destroyed(), 1);
    assert!(!wf.stop_playback());
}

#[tokio::test]
async fn test_new_magnet_discards_pending_prepare() {
    let mut server = Server::new_async().await;
    let (mut wf, mut rx, backend, _files) = files_ready(&mut server).await;
    let _mocks = mock_manifest(&mut server, "file=0$", "aaaa_0").await;
    let _b = mock_files(&mut server, MAGNET_B, r#"[{"index": 9, "name": "b.mkv", "size": 1}]"#).await;

    wf.request_play();
    wf.submit_magnet(MAGNET_B);
    assert!(!wf.overlay.is_visible());
    assert!(wf.play_enabled());

    pump(&mut wf, &mut rx).await;
    pump(&mut wf, &mut rx).await;

    assert!(backend.sources().is_empty());
    assert!(!wf.player_visible());
    assert_eq!(wf.files()[0].name, "b.mkv");
}
