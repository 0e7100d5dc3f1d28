//! CLI Command Handlers
//!
//! Implements the CLI commands on top of the server client.
//! Each handler takes CLI args and Output, returns ExitCode.

use serde::Serialize;
use tracing::debug;

use crate::api::{ApiError, CinematorClient, PrepareOutcome};
use crate::cli::{self, ExitCode, FilesCmd, Output, PrepareCmd, PrepareResponse};
use crate::models::TorrentSource;

/// One row of `files` output
#[derive(Debug, Serialize)]
struct FileRow {
    index: u32,
    name: String,
    size: u64,
    label: String,
}

fn exit_code_for(error: &ApiError) -> ExitCode {
    match error {
        ApiError::Status(_) => ExitCode::ServerError,
        ApiError::InvalidUrl(_) => ExitCode::InvalidArgs,
        ApiError::Request(_) => ExitCode::NetworkError,
        ApiError::InvalidResponse(_) => ExitCode::Error,
    }
}

fn parse_magnet(raw: &str, output: &Output) -> Result<TorrentSource, ExitCode> {
    cli::validate_magnet(raw)
        .ok()
        .and_then(TorrentSource::parse)
        .ok_or_else(|| {
            output.error(
                "Invalid magnet link (expected magnet:?...)",
                ExitCode::InvalidArgs,
            )
        })
}

// =============================================================================
// Files Command
// =============================================================================

pub async fn files_cmd(cmd: FilesCmd, client: &CinematorClient, output: &Output) -> ExitCode {
    let magnet = match parse_magnet(&cmd.magnet, output) {
        Ok(m) => m,
        Err(code) => return code,
    };

    output.info(format!("Listing files of {}", magnet.label()));

    match client.list_files(&magnet).await {
        Ok(files) if files.is_empty() => {
            output.error("No playable files found in torrent", ExitCode::NoFiles)
        }
        Ok(files) => {
            debug!(count = files.len(), "files listed");
            if output.json {
                let rows: Vec<FileRow> = files
                    .iter()
                    .map(|f| FileRow {
                        index: f.index,
                        name: f.name.clone(),
                        size: f.size,
                        label: f.label(),
                    })
                    .collect();
                if let Err(e) = output.print(&rows) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                for file in &files {
                    output.line(format!("{:>4}  {}", file.index, file.label()));
                }
            }
            ExitCode::Success
        }
        Err(e) => output.error(
            format!("{}: {}", e.listing_summary(), e),
            exit_code_for(&e),
        ),
    }
}

// =============================================================================
// Prepare Command
// =============================================================================

pub async fn prepare_cmd(cmd: PrepareCmd, client: &CinematorClient, output: &Output) -> ExitCode {
    let magnet = match parse_magnet(&cmd.magnet, output) {
        Ok(m) => m,
        Err(code) => return code,
    };

    output.info(format!(
        "Preparing file {} (this may take several minutes)...",
        cmd.file
    ));

    match client.prepare_stream(&magnet, cmd.file, cmd.audio).await {
        Ok(PrepareOutcome::AudioChoice(tracks)) => {
            let labels: Vec<String> = tracks
                .iter()
                .enumerate()
                .map(|(i, t)| t.label(i))
                .collect();
            if output.json {
                let response = PrepareResponse::AudioRequired { tracks: labels };
                if let Err(e) = output.print(&response) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                output.line("Select an audio track with --audio <N>:");
                for (i, label) in labels.iter().enumerate() {
                    output.line(format!("{:>4}  {}", i, label));
                }
            }
            ExitCode::AudioRequired
        }
        Ok(PrepareOutcome::Manifest(url)) => {
            if output.json {
                let response = PrepareResponse::Ready {
                    manifest_url: url.to_string(),
                };
                if let Err(e) = output.print(&response) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                output.line(url);
            }
            ExitCode::Success
        }
        Err(e) => output.error(
            format!("{}: {}", e.prepare_summary(), e),
            exit_code_for(&e),
        ),
    }
}
