//! Data structures and types for cinemator
//!
//! Contains the shared models used across the application organized by domain:
//! - **Torrent**: magnet sources and the files they contain
//! - **Stream**: audio tracks offered by the server and the active manifest

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Torrent Models
// =============================================================================

/// A magnet link as typed by the user, trimmed.
///
/// The string is opaque to the client: it is only validated for emptiness and
/// forwarded verbatim (URL-encoded) to every server call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentSource(String);

impl TorrentSource {
    /// Trim the input, returning `None` when nothing is left
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// BitTorrent info hash from an `xt=urn:btih:` parameter, lowercased
    pub fn info_hash(&self) -> Option<String> {
        let re = Regex::new(r"(?i)xt=urn:btih:([0-9a-z]+)").ok()?;
        re.captures(&self.0)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
    }

    /// Human-readable name from the `dn=` parameter, if the magnet carries one
    pub fn display_name(&self) -> Option<String> {
        let re = Regex::new(r"[?&]dn=([^&]+)").ok()?;
        let raw = re.captures(&self.0)?.get(1)?.as_str().replace('+', " ");
        urlencoding::decode(&raw).ok().map(|s| s.into_owned())
    }

    /// Short label for headers: display name, else info hash, else the raw link
    pub fn label(&self) -> String {
        self.display_name()
            .or_else(|| self.info_hash())
            .unwrap_or_else(|| self.0.clone())
    }
}

impl fmt::Display for TorrentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A playable file inside a torrent, as listed by the server.
///
/// `index` is the server's identifier and is sent back verbatim when a stream
/// is prepared; it is never derived from the entry's position in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub index: u32,
    pub name: String,
    pub size: u64,
}

impl FileEntry {
    /// Size in mebibytes with two decimals, e.g. `700.00 MB`
    pub fn format_size(&self) -> String {
        format!("{:.2} MB", self.size as f64 / 1_048_576.0)
    }

    /// List label: `movie.mkv (700.00 MB)`
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.format_size())
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Stream Models
// =============================================================================

/// Audio track offered by the server when a file has more than one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl AudioTrack {
    /// Selector label for the track at `position` (0-based)
    pub fn label(&self, position: usize) -> String {
        let title = match self.title.as_deref() {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => format!("Track {}", position + 1),
        };
        match self.language.as_deref() {
            Some(lang) if !lang.is_empty() => format!("{} ({})", title, lang),
            _ => title,
        }
    }
}

/// The manifest currently handed to the playback manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    /// Final manifest URL including the cache-busting `t` parameter
    pub manifest_url: Url,
    /// Server index of the file being streamed
    pub file_index: u32,
    /// Chosen audio track ordinal, if the server asked for one
    pub audio: Option<usize>,
}

impl StreamHandle {
    /// Build a handle from the prepare response URL, appending `t=<token>`
    pub fn new(mut manifest_url: Url, token: u64, file_index: u32, audio: Option<usize>) -> Self {
        manifest_url
            .query_pairs_mut()
            .append_pair("t", &token.to_string());
        Self {
            manifest_url,
            file_index,
            audio,
        }
    }

    pub fn url(&self) -> &str {
        self.manifest_url.as_str()
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.manifest_url)
    }
}

/// Source of cache-busting tokens.
///
/// Tokens are wall-clock milliseconds, bumped when needed so that every token
/// handed out in a session is strictly greater than the previous one.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: u64,
}

impl CacheBuster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next token, based on the current time
    pub fn next(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.next_at(now)
    }

    /// Next token for an explicit clock reading
    pub fn next_at(&mut self, now_ms: u64) -> u64 {
        self.last = now_ms.max(self.last + 1);
        self.last
    }
}
