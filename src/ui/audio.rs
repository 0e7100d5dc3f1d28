//! Audio track selector
//!
//! Popup listing the audio tracks the server offered for a file. Lives only
//! between the prepare response and the user's choice.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState as TuiListState},
};

use crate::app::ListState;
use crate::models::AudioTrack;
use crate::ui::Theme;

#[derive(Debug, Clone)]
pub struct AudioSelector {
    tracks: Vec<AudioTrack>,
    pub list: ListState,
}

impl AudioSelector {
    pub fn new(tracks: Vec<AudioTrack>) -> Self {
        Self {
            list: ListState::new(tracks.len()),
            tracks,
        }
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    /// Labels in server order
    pub fn labels(&self) -> Vec<String> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(i, t)| t.label(i))
            .collect()
    }

    /// Ordinal of the highlighted track, `None` for an empty list
    pub fn selected_ordinal(&self) -> Option<usize> {
        (self.list.selected < self.tracks.len()).then_some(self.list.selected)
    }

    pub fn render(&self, theme: &Theme, frame: &mut Frame, area: Rect) {
        // Two rows of border around the tracks, never taller than the screen
        let width = area.width.min(48);
        let height = u16::try_from(self.tracks.len())
            .unwrap_or(u16::MAX)
            .saturating_add(2)
            .max(3)
            .min(area.height);
        if width == 0 || height == 0 {
            return;
        }
        let popup = Rect {
            x: area.x + (area.width.saturating_sub(width)) / 2,
            y: area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        };

        let items: Vec<ListItem> = self
            .labels()
            .into_iter()
            .map(|label| ListItem::new(Span::styled(label, theme.list_item())))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(theme.border_focused())
                    .title(Span::styled(" Select audio track ", theme.title()))
                    .style(theme.background()),
            )
            .highlight_style(theme.list_item_selected())
            .highlight_symbol("▶ ");

        let mut state = TuiListState::default();
        state.select(self.selected_ordinal());

        frame.render_widget(Clear, popup);
        frame.render_stateful_widget(list, popup, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks() -> Vec<AudioTrack> {
        vec![
            AudioTrack {
                title: Some("English".into()),
                language: None,
            },
            AudioTrack {
                title: Some("Spanish".into()),
                language: Some("es".into()),
            },
        ]
    }

    #[test]
    fn test_labels_follow_server_order() {
        let selector = AudioSelector::new(tracks());
        assert_eq!(selector.labels(), vec!["English", "Spanish (es)"]);
    }

    #[test]
    fn test_selection_moves() {
        let mut selector = AudioSelector::new(tracks());
        assert_eq!(selector.selected_ordinal(), Some(0));
        selector.list.down();
        assert_eq!(selector.selected_ordinal(), Some(1));
        selector.list.down();
        assert_eq!(selector.selected_ordinal(), Some(1));
    }

    #[test]
    fn test_popup_fits_short_areas() {
        use ratatui::{backend::TestBackend, Terminal};

        let selector = AudioSelector::new(tracks());
        let theme = Theme::default();
        for height in [1, 2, 3, 4] {
            let mut terminal = Terminal::new(TestBackend::new(30, height)).unwrap();
            terminal
                .draw(|frame| selector.render(&theme, frame, frame.area()))
                .unwrap();
        }

        // Zero-sized area draws nothing
        let mut terminal = Terminal::new(TestBackend::new(30, 4)).unwrap();
        terminal
            .draw(|frame| {
                let area = Rect::new(0, 0, 30, 0);
                selector.render(&theme, frame, area);
            })
            .unwrap();
    }

    #[test]
    fn test_empty_selector_has_no_choice() {
        let selector = AudioSelector::new(vec![]);
        assert_eq!(selector.selected_ordinal(), None);
    }
}
