//! cinemator - terminal client for a torrent streaming server
//!
//! # Usage
//!
//! ```bash
//! # Launch interactive TUI
//! cinemator
//!
//! # CLI mode (for automation)
//! cinemator files "magnet:?xt=urn:btih:..."
//! cinemator prepare "magnet:?xt=urn:btih:..." --file 0 --json
//! ```

use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cinemator::api::server::validate_server_url;
use cinemator::app::App;
use cinemator::cli::{Cli, Command, ExitCode, Output};
use cinemator::commands;
use cinemator::config::Config;
use cinemator::stream::{LocalPlayer, SystemBackend};
use cinemator::ui::screen;
use cinemator::workflow::{Workflow, WorkflowEvent};

/// Terminal type alias for convenience
type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Redraw and timer resolution
const TICK_RATE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    if cli.is_cli_mode() {
        // CLI mode: log to stderr, execute command and exit
        init_cli_logging(cli.verbose, cli.quiet);
        let exit_code = run_cli(cli, config).await;
        std::process::exit(exit_code.into());
    } else {
        // TUI mode: the terminal is ours, logs go to a file
        let _guard = init_tui_logging(cli.verbose);
        run_tui(cli, config).await
    }
}

// =============================================================================
// Logging
// =============================================================================

fn env_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("cinemator=debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    }
}

fn init_cli_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        env_filter(true)
    } else {
        EnvFilter::new("warn")
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Daily log file under the cache directory. No logging when there is none.
fn init_tui_logging(verbose: bool) -> Option<WorkerGuard> {
    let dir = dirs::cache_dir()?.join("cinemator");
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(&dir, "cinemator.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter(verbose))
        .try_init()
        .ok()?;
    Some(guard)
}

// =============================================================================
// CLI Mode
// =============================================================================

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: Config) -> ExitCode {
    let output = Output::new(&cli);

    let server = config.resolve_server(cli.server.as_deref());
    if let Err(e) = validate_server_url(&server) {
        return output.error(e.to_string(), ExitCode::InvalidArgs);
    }
    let client = config.client(&server);

    match cli.command {
        Some(Command::Files(cmd)) => commands::files_cmd(cmd, &client, &output).await,

        Some(Command::Prepare(cmd)) => commands::prepare_cmd(cmd, &client, &output).await,

        None => {
            // This shouldn't happen (handled by is_cli_mode check)
            ExitCode::Success
        }
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Initialize the terminal for TUI mode
fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Leave raw mode and the alternate screen before a panic message prints
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(stdout(), DisableBracketedPaste, LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Restore terminal to normal state
fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run interactive TUI
async fn run_tui(cli: Cli, mut config: Config) -> Result<()> {
    if let Some(player) = cli.player {
        config.player = player;
    }

    let server = config.resolve_server(cli.server.as_deref());
    validate_server_url(&server)?;
    let client = config.client(&server);

    let player = LocalPlayer::new(config.player);
    let backend = SystemBackend::detect(client.http().clone(), player, config.adaptive_engine)
        .await
        .with_poll_limit(config.segment_poll_limit);
    if !backend.player_available() {
        warn!(player = %config.player, "player not found, playback will fail");
    }
    info!(%server, player = %config.player, "starting TUI");

    let (tx, rx) = mpsc::unbounded_channel();
    let workflow = Workflow::new(client, Arc::new(backend), tx);
    let mut app = App::new(workflow, config, cli.config.clone());

    // Initialize terminal
    install_panic_hook();
    let mut terminal = init_terminal()?;

    // Run the main event loop
    let result = run_event_loop(&mut terminal, &mut app, rx).await;

    app.workflow.shutdown();

    // Always restore terminal, even on error
    restore_terminal(&mut terminal)?;

    result
}

/// Main event loop - handles input, applies background results, renders UI
async fn run_event_loop(
    terminal: &mut Tui,
    app: &mut App,
    mut events: UnboundedReceiver<WorkflowEvent>,
) -> Result<()> {
    while app.running {
        // Render current state
        terminal.draw(|frame| screen::render(frame, app))?;

        // Poll for input without starving the runtime
        let input = tokio::task::block_in_place(|| -> Result<Option<Event>> {
            if event::poll(TICK_RATE)? {
                Ok(Some(event::read()?))
            } else {
                Ok(None)
            }
        })?;

        match input {
            // Only handle key press events (ignore releases on Windows)
            Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                app.handle_key(key);
            }
            Some(Event::Paste(text)) => app.handle_paste(&text),
            _ => {}
        }

        // Apply finished background work
        loop {
            match events.try_recv() {
                Ok(event) => app.workflow.handle_event(event),
                Err(TryRecvError::Empty) => break,
                // The workflow holds a sender, so this only happens on shutdown
                Err(TryRecvError::Disconnected) => break,
            }
        }

        app.workflow.tick(Instant::now());
    }

    Ok(())
}
