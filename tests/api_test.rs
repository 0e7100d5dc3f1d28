//! Server Client Tests
//!
//! File listing and stream preparation against a mocked server.

use cinemator::api::{ApiError, CinematorClient, PrepareOutcome};
use cinemator::models::TorrentSource;
use mockito::{Matcher, Server};

const MAGNET: &str = "magnet:?xt=urn:btih:c9e15763f722f23e98a29decdfae341b98d53056&dn=Big+Buck+Bunny";

fn magnet() -> TorrentSource {
    TorrentSource::parse(MAGNET).unwrap()
}

// =============================================================================
// File Listing
// =============================================================================

#[tokio::test]
async fn test_list_files_keeps_server_order_and_indices() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/files-listing")
        .match_query(Matcher::UrlEncoded("magnet".into(), MAGNET.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[
                {"index": 4, "name": "movie.mkv", "size": 734003200},
                {"index": 1, "name": "sample.mp4", "size": 1048576}
            ]"#,
        )
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let files = client.list_files(&magnet()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].index, 4);
    assert_eq!(files[0].label(), "movie.mkv (700.00 MB)");
    assert_eq!(files[1].index, 1);
    assert_eq!(files[1].format_size(), "1.00 MB");
}

#[tokio::test]
async fn test_list_files_empty() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/files-listing")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    assert!(client.list_files(&magnet()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_files_server_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/files-listing")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let err = client.list_files(&magnet()).await.unwrap_err();
    assert!(matches!(err, ApiError::Status(s) if s.as_u16() == 500));
    assert_eq!(err.listing_summary(), "Server error");
}

#[tokio::test]
async fn test_list_files_malformed_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/files-listing")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let err = client.list_files(&magnet()).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidResponse(_)));
    assert_eq!(err.listing_summary(), "Error loading files");
}

#[tokio::test]
async fn test_unreachable_server() {
    // Nothing listens on the discard port
    let client = CinematorClient::new("http://127.0.0.1:9");
    let err = client.list_files(&magnet()).await.unwrap_err();
    assert!(matches!(err, ApiError::Request(_)));
    assert_eq!(err.listing_summary(), "Error loading files");

    let err = client.prepare_stream(&magnet(), 0, None).await.unwrap_err();
    assert_eq!(err.prepare_summary(), "Could not start stream");
}

#[tokio::test]
async fn test_custom_endpoint_paths() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/torrent/files")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"index": 0, "name": "a.mkv", "size": 1}]"#)
        .create_async()
        .await;

    let client = CinematorClient::with_paths(
        format!("{}/", server.url()),
        "/api/torrent/files",
        "/api/hls/prepare",
    );
    assert_eq!(client.list_files(&magnet()).await.unwrap().len(), 1);
    mock.assert_async().await;
}

// =============================================================================
// Stream Preparation
// =============================================================================

#[tokio::test]
async fn test_prepare_follows_redirect_to_manifest() {
    let mut server = Server::new_async().await;

    let prepare = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("magnet".into(), MAGNET.into()),
            Matcher::UrlEncoded("file".into(), "4".into()),
        ]))
        .with_status(302)
        .with_header("location", "/hls/c9e15763_4/index.m3u8")
        .create_async()
        .await;

    let manifest = server
        .mock("GET", "/hls/c9e15763_4/index.m3u8")
        .with_status(200)
        .with_header("content-type", "application/vnd.apple.mpegurl")
        .with_body("#EXTM3U\n#EXT-X-VERSION:3\n")
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let outcome = client.prepare_stream(&magnet(), 4, None).await.unwrap();

    prepare.assert_async().await;
    manifest.assert_async().await;
    match outcome {
        PrepareOutcome::Manifest(url) => {
            assert_eq!(url.path(), "/hls/c9e15763_4/index.m3u8");
        }
        other => panic!("expected manifest, got {:?}", other),
    }
}

#[tokio::test]
async fn test_prepare_returns_audio_tracks() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::Regex("file=0$".into()))
        .with_status(200)
        .with_header("content-type", "application/json; charset=utf-8")
        .with_body(r#"[{"title": "English"}, {"title": "", "language": "spa"}]"#)
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    match client.prepare_stream(&magnet(), 0, None).await.unwrap() {
        PrepareOutcome::AudioChoice(tracks) => {
            assert_eq!(tracks.len(), 2);
            assert_eq!(tracks[0].label(0), "English");
            assert_eq!(tracks[1].label(1), "Track 2 (spa)");
        }
        other => panic!("expected audio choice, got {:?}", other),
    }
}

#[tokio::test]
async fn test_prepare_json_wins_over_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::Any)
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"title": "Commentary"}]"#)
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let outcome = client.prepare_stream(&magnet(), 0, None).await.unwrap();
    assert!(matches!(outcome, PrepareOutcome::AudioChoice(ref t) if t.len() == 1));
}

#[tokio::test]
async fn test_prepare_sends_audio_ordinal() {
    let mut server = Server::new_async().await;
    let with_audio = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::Regex("file=2&audio=1$".into()))
        .with_status(200)
        .with_header("content-type", "application/vnd.apple.mpegurl")
        .with_body("#EXTM3U\n")
        .expect(1)
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let outcome = client.prepare_stream(&magnet(), 2, Some(1)).await.unwrap();
    assert!(matches!(outcome, PrepareOutcome::Manifest(_)));
    with_audio.assert_async().await;
}

#[tokio::test]
async fn test_prepare_server_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/prepare-stream")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("conversion failed")
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let err = client.prepare_stream(&magnet(), 0, None).await.unwrap_err();
    assert_eq!(err.prepare_summary(), "Stream error");
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn test_concurrent_listings() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/files-listing")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"index": 0, "name": "a.mkv", "size": 10}]"#)
        .expect(4)
        .create_async()
        .await;

    let client = CinematorClient::new(server.url());
    let source = magnet();
    let results =
        futures::future::join_all((0..4).map(|_| client.list_files(&source))).await;

    for result in &results {
        assert_eq!(result.as_ref().map(|files| files.len()).ok(), Some(1));
    }
    mock.assert_async().await;
}
