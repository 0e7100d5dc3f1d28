//! Streaming server client
//!
//! Talks to the backend that lists a torrent's files and prepares HLS
//! renditions of them. Only two calls are consumed:
//!
//! - `GET <files>?magnet=...` → JSON array of files
//! - `GET <prepare>?magnet=...&file=N[&audio=K]` → redirect to a manifest, or a
//!   JSON array of audio tracks when the file needs a track choice first

use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{AudioTrack, FileEntry, TorrentSource};

/// Default listing endpoint
pub const DEFAULT_FILES_PATH: &str = "/files-listing";
/// Default stream preparation endpoint
pub const DEFAULT_PREPARE_PATH: &str = "/prepare-stream";

/// Server API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Server returned HTTP {0}")]
    Status(StatusCode),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl ApiError {
    /// Message shown in the magnet region when listing fails
    pub fn listing_summary(&self) -> &'static str {
        match self {
            ApiError::Status(_) => "Server error",
            _ => "Error loading files",
        }
    }

    /// Message shown in the file region when preparing a stream fails
    pub fn prepare_summary(&self) -> &'static str {
        match self {
            ApiError::Status(_) => "Stream error",
            _ => "Could not start stream",
        }
    }
}

/// How the server answered a prepare request
#[derive(Debug, Clone, PartialEq)]
pub enum PrepareOutcome {
    /// The file has several audio tracks; ask again with `audio=<ordinal>`
    AudioChoice(Vec<AudioTrack>),
    /// The rendition is ready; final URL after redirects
    Manifest(Url),
}

/// Client for the streaming server
#[derive(Debug, Clone)]
pub struct CinematorClient {
    base_url: String,
    files_path: String,
    prepare_path: String,
    client: reqwest::Client,
}

impl CinematorClient {
    /// Create a client for a server using the default endpoint paths
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_paths(base_url, DEFAULT_FILES_PATH, DEFAULT_PREPARE_PATH)
    }

    /// Create a client with custom endpoint paths
    pub fn with_paths(
        base_url: impl Into<String>,
        files_path: impl Into<String>,
        prepare_path: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            files_path: files_path.into(),
            prepare_path: prepare_path.into(),
            // No request timeout: preparing a stream can take minutes
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, shared with the playback engine
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// URL of the file listing call for a magnet
    pub fn files_url(&self, magnet: &TorrentSource) -> String {
        format!(
            "{}{}?magnet={}",
            self.base_url,
            self.files_path,
            urlencoding::encode(magnet.as_str())
        )
    }

    /// URL of the prepare call for a file and optional audio track
    pub fn prepare_url(&self, magnet: &TorrentSource, file_index: u32, audio: Option<usize>) -> String {
        let mut url = format!(
            "{}{}?magnet={}&file={}",
            self.base_url,
            self.prepare_path,
            urlencoding::encode(magnet.as_str()),
            file_index
        );
        if let Some(ordinal) = audio {
            url.push_str(&format!("&audio={}", ordinal));
        }
        url
    }

    /// List the playable files of a torrent.
    ///
    /// The order and indices are returned exactly as the server sent them.
    pub async fn list_files(&self, magnet: &TorrentSource) -> Result<Vec<FileEntry>, ApiError> {
        let url = self.files_url(magnet);
        debug!(%url, "listing torrent files");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "file listing failed");
            return Err(ApiError::Status(status));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON parse error: {}", e)))
    }

    /// Ask the server to prepare an HLS rendition of a file.
    ///
    /// Redirects are followed; the response is classified by its content type
    /// first (a JSON body is always an audio track list), then by status.
    pub async fn prepare_stream(
        &self,
        magnet: &TorrentSource,
        file_index: u32,
        audio: Option<usize>,
    ) -> Result<PrepareOutcome, ApiError> {
        let url = self.prepare_url(magnet, file_index, audio);
        debug!(%url, "preparing stream");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.contains("application/json") {
            let body = response.text().await?;
            let tracks: Vec<AudioTrack> = serde_json::from_str(&body)
                .map_err(|e| ApiError::InvalidResponse(format!("JSON parse error: {}", e)))?;
            debug!(tracks = tracks.len(), "server asked for an audio track");
            return Ok(PrepareOutcome::AudioChoice(tracks));
        }

        if !status.is_success() {
            warn!(%status, "stream preparation failed");
            return Err(ApiError::Status(status));
        }

        Ok(PrepareOutcome::Manifest(response.url().clone()))
    }
}

/// Validate a server base URL from config or the command line
pub fn validate_server_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidUrl(format!("unsupported scheme '{}'", other))),
    }
}
