use ratatui::{
    Frame,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem},
};

use deployscope_types::{LogSource, SourceSelection};

use crate::app::AppState;
use crate::ui::{Layout, Theme};

/// Popup for switching between the merged view and individual pods
pub struct SourcePicker;

impl SourcePicker {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let area = frame.area();
        let height = (state.source_picker_len() as u16 + 2).clamp(3, 14);
        let popup_area = Layout::popup(area, 40, height);

        frame.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = std::iter::once(Self::entry(
            "all (merged)",
            true,
            state.selected_source == SourceSelection::Merged,
        ))
        .chain(state.sources.iter().map(|source| {
            Self::entry(
                &source.name,
                source.ready,
                state.selected_source.pod_param() == Some(source.name.as_str()),
            )
        }))
        .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border_focused())
            .title(Span::styled(" Log Source ", Theme::title()));

        let list = List::new(items)
            .block(block)
            .highlight_style(Theme::list_item_selected())
            .highlight_symbol("▶ ");

        frame.render_stateful_widget(list, popup_area, &mut state.ui_state.source_state);
    }

    fn entry(name: &str, ready: bool, is_active: bool) -> ListItem<'static> {
        let mut spans = vec![Span::styled(
            name.to_string(),
            if is_active {
                Theme::list_item_current()
            } else {
                Theme::list_item()
            },
        )];
        if !ready {
            spans.push(Span::styled(" (not ready)", Theme::text_dim()));
        }
        if is_active {
            spans.push(Span::styled(" •", Theme::text_highlight()));
        }
        ListItem::new(Line::from(spans))
    }
}

/// Compact summary of available sources for the header
pub fn source_summary(sources: &[LogSource]) -> String {
    let ready = sources.iter().filter(|s| s.ready).count();
    format!("{}/{} pods ready", ready, sources.len())
}
