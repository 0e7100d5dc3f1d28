//! Screen layout
//!
//! ```text
//! ┌ CINEMATOR ┐┌ MAGNET ─────────────────────────────┐
//! └───────────┘└─────────────────────────────────────┘
//!  <magnet status>
//! ┌ FILES ──────────────────┐┌ PLAYER ───────────────┐
//! │                         ││                       │
//! └─────────────────────────┘└───────────────────────┘
//!  <files status>             <player status>
//!  NORMAL  FILES READY  ▶ play │ keys
//! ```

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState as TuiListState, Paragraph},
};

use crate::app::{App, Focus, InputMode};
use crate::ui::status::Region;
use crate::ui::Theme;
use crate::workflow::WorkflowState;

/// Draw the whole screen
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let theme = &app.theme;

    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(theme.background()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(1), // Magnet status
            Constraint::Min(3),    // Panels
            Constraint::Length(1), // Panel status
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_header(frame, chunks[0], app);
    app.workflow
        .status
        .render(Region::Magnet, theme, frame, indent(chunks[1]));

    let panels = split_panels(chunks[2]);
    render_files(frame, panels[0], app);
    render_player(frame, panels[1], app);

    let status_row = split_panels(chunks[3]);
    app.workflow
        .status
        .render(Region::Files, theme, frame, indent(status_row[0]));
    app.workflow
        .status
        .render(Region::Player, theme, frame, indent(status_row[1]));

    render_status_bar(frame, chunks[4], app);

    app.workflow.overlay.render(theme, frame, area);
    if let Some(selector) = app.workflow.audio_selector() {
        selector.render(theme, frame, area);
    }
}

fn split_panels(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area)
}

fn indent(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        width: area.width.saturating_sub(1),
        ..area
    }
}

fn panel<'a>(title: &'a str, focused: bool, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(if focused {
            theme.border_focused()
        } else {
            theme.border()
        })
        .title(Span::styled(title, theme.title()))
}

/// Logo and magnet input
fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(13), // Logo
            Constraint::Min(1),     // Magnet box
        ])
        .split(area);

    let logo = Paragraph::new(Line::from(vec![
        Span::styled("CINE", theme.title()),
        Span::styled("MATOR", theme.secondary().add_modifier(Modifier::BOLD)),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme.border()),
    );
    frame.render_widget(logo, header_chunks[0]);

    let editing = app.focus() == Focus::Magnet;
    let text = if editing {
        let cursor = app.magnet.cursor.min(app.magnet.text.len());
        let (before, after) = app.magnet.text.split_at(cursor);
        format!("🧲 {}│{}", before, after)
    } else if app.magnet.text.is_empty() {
        "🧲 Press / to paste a magnet link...".to_string()
    } else {
        format!("🧲 {}", app.magnet.text)
    };

    let input = Paragraph::new(text)
        .style(if editing {
            theme.input().fg(theme.palette.primary)
        } else {
            theme.input()
        })
        .block(panel(" MAGNET ", editing, theme));
    frame.render_widget(input, header_chunks[1]);
}

/// File list, or a hint while there is nothing to list
fn render_files(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let wf = &app.workflow;
    let focused = app.focus() == Focus::Files;
    let block = panel(" FILES ", focused, theme);

    if !wf.files_visible() {
        let hint = if wf.state() == WorkflowState::ListingFiles {
            Line::from(vec![
                Span::styled(format!("{} ", wf.status.spinner_frame()), theme.accent()),
                Span::styled("Fetching torrent metadata...", theme.dimmed()),
            ])
        } else {
            Line::from(Span::styled(
                "Submit a magnet link to list its files",
                theme.dimmed(),
            ))
        };
        frame.render_widget(
            Paragraph::new(vec![Line::from(""), hint])
                .alignment(Alignment::Center)
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = wf
        .files()
        .iter()
        .map(|f| {
            ListItem::new(Line::from(vec![
                Span::styled(f.name.clone(), theme.list_item()),
                Span::styled(format!(" ({})", f.format_size()), theme.dimmed()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(theme.list_item_selected())
        .highlight_symbol("▸ ");

    let mut state = TuiListState::default();
    state.select(Some(wf.file_list.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

/// What the player is showing
fn render_player(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let wf = &app.workflow;
    let block = panel(" ▶ PLAYER ", false, theme);

    let lines = match wf.stream().filter(|_| wf.player_visible()) {
        Some(stream) => {
            let name = wf
                .files()
                .iter()
                .find(|f| f.index == stream.file_index)
                .map(|f| f.name.clone())
                .unwrap_or_else(|| format!("file {}", stream.file_index));
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(name, theme.title())),
            ];
            if let Some(audio) = stream.audio {
                lines.push(Line::from(Span::styled(
                    format!("audio track {}", audio + 1),
                    theme.secondary(),
                )));
            }
            let state = if wf.overlay.is_visible() {
                Span::styled("buffering...", theme.warning())
            } else {
                Span::styled("playing in external player", theme.success())
            };
            lines.push(Line::from(""));
            lines.push(Line::from(state));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(stream.url().to_string(), theme.dimmed())));
            lines
        }
        None => vec![
            Line::from(""),
            Line::from(Span::styled("Nothing playing", theme.dimmed())),
        ],
    };

    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(ratatui::widgets::Wrap { trim: true })
            .block(block),
        area,
    );
}

/// Mode, workflow state and key hints
fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let wf = &app.workflow;

    let mode_indicator = match app.input_mode {
        InputMode::Normal => Span::styled(
            " NORMAL ",
            Style::default()
                .fg(theme.palette.background)
                .bg(theme.palette.primary),
        ),
        InputMode::Editing => Span::styled(
            " INSERT ",
            Style::default()
                .fg(theme.palette.background)
                .bg(theme.palette.accent),
        ),
    };

    let state_label = match wf.state() {
        WorkflowState::Idle => "IDLE",
        WorkflowState::ListingFiles => "LISTING",
        WorkflowState::FilesReady => "FILES READY",
        WorkflowState::Preparing => "PREPARING",
        WorkflowState::AwaitingAudioChoice => "CHOOSE AUDIO",
        WorkflowState::Streaming => "STREAMING",
    };
    let state_indicator = Span::styled(format!(" {} ", state_label), theme.dimmed());

    let play = if wf.play_enabled() && !wf.files().is_empty() {
        Span::styled(" ▶ play ", theme.keybind())
    } else {
        Span::styled(" ▶ play ", theme.disabled())
    };

    let help = match app.focus() {
        Focus::Magnet => " ENTER:submit  ESC:files  ^U:clear ",
        Focus::Files => " q:quit  /:magnet  ↑↓:select  p:play  x:stop  t:theme ",
        Focus::Audio => " ↑↓:select  ENTER:choose  ESC:cancel ",
    };

    let status_line = Line::from(vec![
        mode_indicator,
        state_indicator,
        play,
        Span::raw("│"),
        Span::styled(help, theme.keybind_desc()),
        Span::styled(format!(" {} ", wf.client().base_url()), theme.dimmed()),
    ]);

    frame.render_widget(Paragraph::new(status_line).style(theme.status_bar()), area);
}
