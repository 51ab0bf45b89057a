use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::{
    app::AppState,
    ui::{
        Layout, Theme,
        components::{ListSelector, ListSelectorExt, StatusBar, list_nav_hints},
    },
};

/// Deployment selection screen
pub struct DeploymentSelectScreen;

impl DeploymentSelectScreen {
    pub fn render(frame: &mut Frame, state: &mut AppState) {
        let area = frame.area();
        let (header_area, content_area, status_area) = Layout::main(area);

        Self::render_header(frame, header_area);
        Self::render_list(frame, content_area, state);
        Self::render_status_bar(frame, status_area, state);
    }

    fn render_header(frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            Span::styled("deployscope", Theme::title()),
            Span::styled(" │ ", Theme::text_dim()),
            Span::styled("Select Deployment", Theme::text()),
        ]);

        let header = Paragraph::new(title).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::border()),
        );

        frame.render_widget(header, area);
    }

    fn render_list(frame: &mut Frame, area: Rect, state: &mut AppState) {
        let list_area = Layout::centered_list(area, 80);

        let items: Vec<(String, bool)> = state
            .deployments
            .iter()
            .map(|deploy| {
                let display = format!(
                    "{} ({}, {} replicas)",
                    deploy.app_name, deploy.status, deploy.replicas
                );
                (display, deploy.is_running())
            })
            .collect();

        let selector = ListSelector::new(" Deployments ").items(items);

        frame.render_list_selector(list_area, selector, &mut state.ui_state.list_state);
    }

    fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState) {
        let right = match &state.ui_state.status_message {
            Some(msg) => msg.clone(),
            None => format!("{} deployments", state.deployments.len()),
        };

        let status = StatusBar::new().hints(list_nav_hints()).right(right);

        frame.render_widget(status, area);
    }
}
