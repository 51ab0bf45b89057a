use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout as RatatuiLayout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use deployscope_stream::LineBuffer;
use deployscope_types::{ConnectionState, LogLine};

use crate::app::AppState;
use crate::ui::components::{StatusBar, source_summary};
use crate::ui::Theme;

/// Log viewer screen
pub struct LogViewerScreen;

impl LogViewerScreen {
    pub fn render(
        frame: &mut Frame,
        state: &mut AppState,
        buffer: &LineBuffer,
        connection: ConnectionState,
    ) {
        let area = frame.area();

        let show_filter_bar =
            state.ui_state.search_active || state.ui_state.active_filter.is_some();

        let mut constraints = vec![Constraint::Length(3)]; // Header always
        if show_filter_bar {
            constraints.push(Constraint::Length(3)); // Filter bar
        }
        constraints.push(Constraint::Min(1)); // Logs
        constraints.push(Constraint::Length(1)); // Status bar

        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut idx = 0;
        Self::render_header(frame, chunks[idx], state);
        idx += 1;

        if show_filter_bar {
            Self::render_filter_bar(frame, chunks[idx], state);
            idx += 1;
        }

        Self::render_logs(frame, chunks[idx], state, buffer);
        idx += 1;

        Self::render_status_bar(frame, chunks[idx], state, buffer, connection);
    }

    fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
        let deployment = state
            .selected_deployment
            .as_ref()
            .map(|(_, name)| name.as_str())
            .unwrap_or("?");

        let mut spans = vec![
            Span::styled("deployscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(deployment, Theme::text_highlight()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled(
                format!("source: {}", state.selected_source.label()),
                Theme::text(),
            ),
        ];

        if !state.sources.is_empty() {
            spans.push(Span::styled(" │ ", Theme::text_dim()));
            spans.push(Span::styled(source_summary(&state.sources), Theme::text()));
        }

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let mut spans = vec![];

        if state.ui_state.search_active {
            spans.push(Span::styled(
                " /",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(" Filter: ", Theme::text_dim()));
        }

        let pattern = if state.ui_state.search_active {
            &state.ui_state.search_input
        } else if let Some(filter) = &state.ui_state.active_filter {
            filter.pattern()
        } else {
            ""
        };
        spans.push(Span::styled(pattern.to_string(), Theme::text_highlight()));

        if state.ui_state.search_active {
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        }

        spans.push(Span::styled("  ", Theme::text()));
        let case_text = if state.ui_state.filter_case_insensitive {
            "[i] case-insensitive"
        } else {
            "[I] case-sensitive"
        };
        spans.push(Span::styled(case_text, Theme::text_dim()));

        if state.ui_state.search_active {
            spans.push(Span::styled(
                "  [Enter] Apply  [Esc] Cancel",
                Theme::text_dim(),
            ));
        } else {
            spans.push(Span::styled("  [n] Clear  [/] Edit", Theme::text_dim()));
        }

        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if state.ui_state.search_active {
                    Style::default().fg(Color::Yellow)
                } else {
                    Theme::border()
                })
                .title(Span::styled(" Search/Filter ", Theme::title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, buffer: &LineBuffer) {
        let current_count = buffer.len();

        let needs_refresh = state.ui_state.filter_cache.needs_refresh(
            state.ui_state.active_filter.as_ref(),
            state.ui_state.filter_case_insensitive,
            current_count,
        );

        if needs_refresh {
            let all_lines = buffer.all();
            let filtered: Vec<LogLine> = if let Some(filter) = &state.ui_state.active_filter {
                all_lines
                    .into_iter()
                    .filter(|line| filter.matches(line))
                    .collect()
            } else {
                all_lines
            };

            state.ui_state.filter_cache.update(
                state.ui_state.active_filter.as_ref(),
                state.ui_state.filter_case_insensitive,
                current_count,
                filtered,
            );
        }

        let total = state.ui_state.filter_cache.cached_lines.len();
        let inner_height = area.height.saturating_sub(2) as usize;

        // Follow mode pins the viewport to the newest lines
        if state.ui_state.auto_scroll && total > 0 {
            state.ui_state.log_scroll = total.saturating_sub(inner_height);
        }
        let max_scroll = total.saturating_sub(inner_height);
        if state.ui_state.log_scroll > max_scroll {
            state.ui_state.log_scroll = max_scroll;
        }

        let lines: Vec<Line> = state
            .ui_state
            .filter_cache
            .cached_lines
            .iter()
            .skip(state.ui_state.log_scroll)
            .take(inner_height)
            .map(|line| Self::format_line(line, state))
            .collect();

        let title = if state.ui_state.active_filter.is_some() {
            format!(" Logs ({} matching) ", total)
        } else {
            format!(" Logs ({}) ", total)
        };

        let logs_widget = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border())
                .title(Span::styled(title, Theme::title())),
        );

        frame.render_widget(logs_widget, area);

        if total > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));
            let mut scrollbar_state =
                ScrollbarState::new(max_scroll).position(state.ui_state.log_scroll);
            frame.render_stateful_widget(
                scrollbar,
                area.inner(ratatui::layout::Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    fn format_line<'a>(line: &'a LogLine, state: &AppState) -> Line<'a> {
        let mut spans = Vec::new();

        if state.ui_state.show_timestamps {
            let ts = if state.ui_state.use_local_time {
                line.timestamp
                    .with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string()
            } else {
                line.timestamp.format("%H:%M:%S").to_string()
            };
            spans.push(Span::styled(format!("{} ", ts), Theme::text_dim()));
        }

        if state.ui_state.show_source_tags {
            spans.push(Span::styled(
                format!("[{}] ", line.source_tag),
                Style::default().fg(Color::Blue),
            ));
        }

        let mut message_style = Style::default().fg(line.level.color());
        if line.historical {
            message_style = message_style.patch(Theme::historical());
        }
        spans.push(Span::styled(line.message.as_str(), message_style));

        Line::from(spans)
    }

    fn render_status_bar(
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        buffer: &LineBuffer,
        connection: ConnectionState,
    ) {
        let hints = vec![
            ("f", "Follow"),
            ("p", "Source"),
            ("/", "Filter"),
            ("c", "Clear"),
            ("r", "Refresh"),
            ("e", "Export"),
            ("?", "Help"),
        ];

        let right = match &state.ui_state.status_message {
            Some(msg) => msg.clone(),
            None => {
                let follow = if state.ui_state.auto_scroll {
                    "following"
                } else {
                    "paused"
                };
                format!("{} lines │ {}", buffer.len(), follow)
            }
        };

        let status = StatusBar::new()
            .badge(connection.label(), connection.color())
            .hints(hints)
            .right(right);
        frame.render_widget(status, area);
    }
}
