//! CLI - Command Line Interface for cinemator
//!
//! Every server call the TUI makes is scriptable. All output is
//! JSON-parseable with `--json`.
//!
//! # Examples
//!
//! ```bash
//! # List the playable files of a torrent
//! cinemator files "magnet:?xt=urn:btih:..." --json
//!
//! # Prepare file 0, picking the second audio track
//! cinemator prepare "magnet:?xt=urn:btih:..." --file 0 --audio 1
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::stream::PlayerType;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Server answered with an error status
    ServerError = 4,
    /// Torrent has no playable files
    NoFiles = 5,
    /// Server needs an audio track choice
    AudioRequired = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// cinemator - stream torrents through a cinemator server
///
/// Run without arguments to launch interactive TUI.
/// Use subcommands for scriptable automation.
#[derive(Parser, Debug)]
#[command(
    name = "cinemator",
    version,
    about = "Terminal client for a cinemator streaming server",
    long_about = "Paste a magnet link, pick a file, and watch it while the \
                  server downloads and converts it.\n\n\
                  Run without arguments to launch the interactive TUI.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  cinemator                                  Launch interactive TUI\n\
                  cinemator files \"magnet:?...\"              List playable files\n\
                  cinemator prepare \"magnet:?...\" -f 0       Prepare a stream\n\
                  cinemator --server http://nas:8000         Use another server"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides config and CINEMATOR_SERVER)
    #[arg(long, short = 's', global = true)]
    pub server: Option<String>,

    /// Local player to use
    #[arg(long, short = 'p', global = true, value_enum)]
    pub player: Option<PlayerType>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Subcommand to run (omit for TUI mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running in CLI mode (has subcommand)
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the playable files of a torrent
    #[command(visible_alias = "ls")]
    Files(FilesCmd),

    /// Ask the server to prepare a file for streaming
    #[command(visible_alias = "pr")]
    Prepare(PrepareCmd),
}

/// List files of a magnet link
#[derive(Args, Debug)]
pub struct FilesCmd {
    /// Magnet link
    #[arg(required = true)]
    pub magnet: String,
}

/// Prepare a stream
#[derive(Args, Debug)]
pub struct PrepareCmd {
    /// Magnet link
    #[arg(required = true)]
    pub magnet: String,

    /// Server index of the file (from `files`)
    #[arg(long, short = 'f')]
    pub file: u32,

    /// Audio track ordinal, when the server asks for one
    #[arg(long, short = 'a')]
    pub audio: Option<usize>,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Result of `prepare`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrepareResponse {
    /// Server wants an audio track; rerun with `--audio`
    AudioRequired { tracks: Vec<String> },
    /// Manifest is ready
    Ready { manifest_url: String },
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data as a JSON envelope
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let output = JsonOutput::success(data);
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Print a plain line (human mode)
    pub fn line(&self, msg: impl std::fmt::Display) {
        println!("{}", msg);
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Magnet Validation
// =============================================================================

/// Reject input that cannot be a magnet link before hitting the server
pub fn validate_magnet(magnet: &str) -> Result<&str, &'static str> {
    let trimmed = magnet.trim();
    if trimmed.is_empty() {
        Err("Magnet link is empty")
    } else if !trimmed.starts_with("magnet:?") {
        Err("Invalid magnet link (expected magnet:?...)")
    } else {
        Ok(trimmed)
    }
}

// =============================================================================
// Tests
// =============================================================================
