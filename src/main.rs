use std::fs::File;
use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use deployscope_api::ApiClient;
use deployscope_stream::{LogSession, SessionEvent, SessionEventKind};
use deployscope_tui::{
    Action, AppState, DeploymentSelectScreen, Event, EventHandler, HelpOverlay, KeyBindings,
    KeyContext, LogViewerScreen, Screen, SourcePicker, Tui,
};
use deployscope_types::{DeploymentSummary, SourceSelection};

mod config;

/// Deployscope - A terminal UI for streaming container platform deployment logs
#[derive(Parser, Debug)]
#[command(name = "deployscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Deployment name or id (optional, will prompt if not provided)
    #[arg(value_name = "DEPLOYMENT")]
    deployment: Option<String>,

    /// Pod to stream from (defaults to the merged view of all pods)
    #[arg(long, value_name = "POD")]
    pod: Option<String>,

    /// Platform API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// API token (prefer the DEPLOYSCOPE_TOKEN env var or the config file)
    #[arg(long)]
    token: Option<String>,

    /// Buffer size for log lines
    #[arg(long, default_value = "10000")]
    buffer_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Internal actions for async operations
enum InternalAction {
    LoadDeployments,
    DeploymentsLoaded(Vec<DeploymentSummary>),
    Error(String),
}

async fn run_app(args: Args) -> Result<()> {
    let settings = config::resolve(
        args.base_url.clone(),
        args.token.clone(),
        config::load_file_config()?,
    )?;
    let api = ApiClient::new(&settings.base_url, &settings.token);

    // Create action channels
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalAction>();
    let (session_tx, mut session_rx) = mpsc::unbounded_channel::<SessionEvent>();

    // Initialize state
    let mut state = AppState::new(action_tx.clone());

    // Fetch deployments before entering the alternate screen so connection
    // and auth errors print normally.
    state.deployments = api.list_deployments().await?;

    let mut session: Option<LogSession<ApiClient>> = None;

    // Handle CLI arguments for direct navigation
    if let Some(wanted) = &args.deployment {
        let deployment = state
            .deployments
            .iter()
            .find(|d| &d.id == wanted || &d.app_name == wanted)
            .cloned();

        let Some(deployment) = deployment else {
            anyhow::bail!("Deployment '{}' not found", wanted);
        };

        let selection = match &args.pod {
            Some(pod) => SourceSelection::Pod(pod.clone()),
            None => SourceSelection::Merged,
        };

        state.selected_deployment = Some((deployment.id.clone(), deployment.app_name.clone()));
        state.selected_source = selection.clone();
        state.screen_stack.push(Screen::DeploymentSelect);
        state.current_screen = Screen::LogViewer;

        session = Some(open_session(
            &api,
            &deployment.id,
            &deployment.app_name,
            selection,
            args.buffer_size,
            &session_tx,
        ));
        state.show_status("Loading logs...");
    }

    // Initialize TUI
    let mut tui = Tui::new()?;

    // Initialize event handler
    let mut events = EventHandler::new(Duration::from_millis(100));

    // Initialize keybindings
    let keybindings = KeyBindings::new();

    // Initial render
    render(&mut tui, &mut state, &mut session)?;

    // Main event loop
    loop {
        tokio::select! {
            // Handle terminal events
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        if state.ui_state.source_picker_open
                            && state.current_screen == Screen::LogViewer
                        {
                            if let Some(action) = keybindings.get_source_picker_action(&key) {
                                let _ = action_tx.send(action);
                            }
                        } else if state.ui_state.search_active
                            && state.current_screen == Screen::LogViewer
                        {
                            if let Some(action) = keybindings.get_filter_input_action(&key) {
                                let _ = action_tx.send(action);
                            }
                        } else {
                            let context = match state.current_screen {
                                Screen::DeploymentSelect => KeyContext::ListNavigation,
                                Screen::LogViewer => KeyContext::LogViewer,
                            };
                            if let Some(action) = keybindings.get_action(context, &key) {
                                let _ = action_tx.send(action);
                            }
                        }
                    }
                    Event::Paste(text) => {
                        // Pasted text only means something in the filter input
                        if state.ui_state.search_active
                            && state.current_screen == Screen::LogViewer
                        {
                            for c in text.chars().filter(|c| !c.is_control()) {
                                state.search_input_char(c);
                            }
                        }
                    }
                    Event::Tick => {
                        // Fall through to the render below so new lines show up
                    }
                    Event::Resize(_, _) => {
                        let _ = action_tx.send(Action::Render);
                    }
                    Event::Error(e) => {
                        state.show_status(e);
                    }
                }
            }

            // Handle events from the log session's background tasks
            Some(event) = session_rx.recv() => {
                if let Some(session) = session.as_mut() {
                    match session.apply(event) {
                        Some(SessionEventKind::SourcesLoaded(_)) => {
                            state.sources = session.sources().to_vec();
                        }
                        Some(SessionEventKind::HistoryLoaded(_)) => {
                            state.ui_state.filter_cache.invalidate();
                            state.dismiss_status();
                        }
                        Some(SessionEventKind::Notice(msg))
                        | Some(SessionEventKind::Terminal(msg)) => {
                            state.show_status(msg);
                        }
                        _ => {}
                    }
                }
            }

            // Handle user actions
            Some(action) = action_rx.recv() => {
                handle_action(
                    &mut state,
                    &mut session,
                    &api,
                    &session_tx,
                    &internal_tx,
                    args.buffer_size,
                    action,
                );
            }

            // Handle internal async actions
            Some(internal) = internal_rx.recv() => {
                match internal {
                    InternalAction::LoadDeployments => {
                        match api.list_deployments().await {
                            Ok(deployments) => {
                                let _ = internal_tx.send(
                                    InternalAction::DeploymentsLoaded(deployments),
                                );
                            }
                            Err(e) => {
                                let _ = internal_tx.send(InternalAction::Error(
                                    format!("Failed to load deployments: {}", e),
                                ));
                            }
                        }
                    }
                    InternalAction::DeploymentsLoaded(deployments) => {
                        state.deployments = deployments;
                        state.ui_state.list_state.select(Some(0));
                        state.dismiss_status();
                    }
                    InternalAction::Error(msg) => {
                        state.show_status(msg);
                    }
                }
            }
        }

        if state.should_quit {
            break;
        }

        render(&mut tui, &mut state, &mut session)?;
    }

    // Cleanup
    if let Some(mut session) = session {
        session.shutdown();
    }
    events.shutdown();
    tui.restore()?;

    Ok(())
}

fn open_session(
    api: &ApiClient,
    deployment_id: &str,
    deployment_name: &str,
    selection: SourceSelection,
    buffer_size: usize,
    session_tx: &mpsc::UnboundedSender<SessionEvent>,
) -> LogSession<ApiClient> {
    let mut session = LogSession::new(
        api.clone(),
        deployment_id,
        deployment_name,
        buffer_size,
        session_tx.clone(),
    )
    .with_selection(selection);
    session.start();
    session
}

fn handle_action(
    state: &mut AppState,
    session: &mut Option<LogSession<ApiClient>>,
    api: &ApiClient,
    session_tx: &mpsc::UnboundedSender<SessionEvent>,
    internal_tx: &mpsc::UnboundedSender<InternalAction>,
    buffer_size: usize,
    action: Action,
) {
    match action {
        Action::Quit => {
            if let Some(session) = session.as_mut() {
                session.shutdown();
            }
            state.should_quit = true;
        }
        Action::GoBack => {
            if state.ui_state.help_visible {
                state.ui_state.help_visible = false;
                return;
            }
            if state.current_screen == Screen::LogViewer {
                if let Some(mut old) = session.take() {
                    old.shutdown();
                }
                state.sources.clear();
                state.selected_source = SourceSelection::Merged;
                state.clear_filter();
                state.dismiss_status();
            }
            if !state.go_back() {
                state.should_quit = true;
            }
        }
        Action::Navigate(screen) => {
            state.navigate_to(screen);
        }

        // Deployment selection
        Action::ListUp => state.list_up(),
        Action::ListDown => state.list_down(),
        Action::ListSelect => {
            if state.current_screen == Screen::DeploymentSelect {
                let picked = state
                    .ui_state
                    .list_state
                    .selected()
                    .and_then(|i| state.deployments.get(i))
                    .map(|d| d.id.clone());
                if let Some(id) = picked {
                    let _ = state.action_tx.send(Action::SelectDeployment(id));
                }
            }
        }
        Action::SelectDeployment(id) => {
            let Some(deployment) = state.deployments.iter().find(|d| d.id == id).cloned()
            else {
                return;
            };
            if let Some(mut old) = session.take() {
                old.shutdown();
            }
            state.selected_deployment = Some((deployment.id.clone(), deployment.app_name.clone()));
            state.selected_source = SourceSelection::Merged;
            state.sources.clear();
            state.ui_state.log_scroll = 0;
            state.ui_state.auto_scroll = true;
            state.clear_filter();
            state.navigate_to(Screen::LogViewer);
            state.show_status("Loading logs...");

            *session = Some(open_session(
                api,
                &deployment.id,
                &deployment.app_name,
                SourceSelection::Merged,
                buffer_size,
                session_tx,
            ));
        }
        Action::RefreshDeployments => {
            state.show_status("Refreshing deployments...");
            let _ = internal_tx.send(InternalAction::LoadDeployments);
        }

        // Source picker
        Action::ToggleSourcePicker => {
            if state.ui_state.source_picker_open {
                state.ui_state.source_picker_open = false;
            } else {
                state.open_source_picker();
            }
        }
        Action::SourceUp => state.source_up(),
        Action::SourceDown => state.source_down(),
        Action::SourceSelect => {
            let picked = state.picked_source();
            state.ui_state.source_picker_open = false;
            if let Some(session) = session.as_mut() {
                if session.select_source(picked.clone()) {
                    state.selected_source = picked;
                    state.ui_state.filter_cache.invalidate();
                    state.ui_state.log_scroll = 0;
                    state.ui_state.auto_scroll = true;
                    state.show_status(format!(
                        "Loading logs for {}...",
                        state.selected_source.label()
                    ));
                }
            }
        }

        // Log viewer actions
        Action::ScrollUp(n) => {
            state.ui_state.auto_scroll = false;
            state.ui_state.log_scroll = state.ui_state.log_scroll.saturating_sub(n);
        }
        Action::ScrollDown(n) => {
            state.ui_state.auto_scroll = false;
            // render_logs clamps to the actual filtered count
            state.ui_state.log_scroll = state.ui_state.log_scroll.saturating_add(n);
        }
        Action::PageUp => {
            state.ui_state.auto_scroll = false;
            state.ui_state.log_scroll = state.ui_state.log_scroll.saturating_sub(20);
        }
        Action::PageDown => {
            state.ui_state.auto_scroll = false;
            state.ui_state.log_scroll = state.ui_state.log_scroll.saturating_add(20);
        }
        Action::ScrollToTop => {
            state.ui_state.auto_scroll = false;
            state.ui_state.log_scroll = 0;
        }
        Action::ScrollToBottom => {
            state.ui_state.auto_scroll = false;
            state.ui_state.log_scroll = usize::MAX;
        }
        Action::ToggleAutoScroll => {
            state.ui_state.auto_scroll = !state.ui_state.auto_scroll;
        }
        Action::ToggleTimestamps => {
            state.ui_state.show_timestamps = !state.ui_state.show_timestamps;
        }
        Action::ToggleLocalTime => {
            state.ui_state.use_local_time = !state.ui_state.use_local_time;
        }
        Action::ToggleSourceTags => {
            state.ui_state.show_source_tags = !state.ui_state.show_source_tags;
        }
        Action::ClearLogs => {
            if let Some(session) = session.as_mut() {
                session.clear();
            }
            state.ui_state.filter_cache.invalidate();
            state.ui_state.log_scroll = 0;
        }
        Action::RefreshLogs => {
            if let Some(session) = session.as_mut() {
                session.refresh();
                state.ui_state.auto_scroll = true;
                state.show_status("Refreshing logs...");
            }
        }
        Action::ExportLogs => {
            if let Some(session) = session.as_ref() {
                if session.buffer().is_empty() {
                    state.show_status("No logs to export");
                    return;
                }
                let filename = session.export_filename();
                let count = session.buffer().len();
                match export_logs(&filename, &session.export_text()) {
                    Ok(()) => {
                        state.show_status(format!("Exported {} lines to {}", count, filename));
                    }
                    Err(e) => {
                        state.show_status(format!("Export failed: {}", e));
                    }
                }
            }
        }

        // Filter/Search actions
        Action::OpenSearch => state.start_search(),
        Action::CloseSearch => state.cancel_search(),
        Action::SearchInput(c) => state.search_input_char(c),
        Action::SearchBackspace => state.search_input_backspace(),
        Action::SearchClear => state.ui_state.search_input.clear(),
        Action::ApplyFilter => {
            state.apply_filter();
            state.ui_state.log_scroll = 0;
        }
        Action::ClearFilter => state.clear_filter(),
        Action::ToggleCaseSensitive => {
            state.ui_state.filter_case_insensitive = !state.ui_state.filter_case_insensitive;
            // Recompile the active filter with the new setting
            if state.ui_state.active_filter.is_some() {
                let pattern = state
                    .ui_state
                    .active_filter
                    .as_ref()
                    .map(|f| f.pattern().to_string())
                    .unwrap_or_default();
                state.ui_state.search_input = pattern;
                state.apply_filter();
            }
        }

        Action::ToggleHelp => {
            state.ui_state.help_visible = !state.ui_state.help_visible;
        }
        Action::ShowStatus(msg) => state.show_status(msg),
        Action::DismissStatus => state.dismiss_status(),
        Action::Tick | Action::Render => {}
    }
}

fn render(
    tui: &mut Tui,
    state: &mut AppState,
    session: &mut Option<LogSession<ApiClient>>,
) -> Result<()> {
    tui.draw(|frame| {
        match state.current_screen {
            Screen::DeploymentSelect => DeploymentSelectScreen::render(frame, state),
            Screen::LogViewer => {
                if let Some(session) = session.as_ref() {
                    LogViewerScreen::render(
                        frame,
                        state,
                        session.buffer(),
                        session.connection_state(),
                    );
                }
            }
        }

        if state.ui_state.source_picker_open {
            SourcePicker::render(frame, state);
        }
        if state.ui_state.help_visible {
            HelpOverlay::render(frame);
        }
    })?;
    Ok(())
}

/// Write the export text exactly as produced, with no trailing newline
fn export_logs(filename: &str, text: &str) -> Result<()> {
    let mut file = File::create(filename)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_writes_text_verbatim() {
        let path = std::env::temp_dir().join("deployscope-export-test.log");
        let text = "[2024-01-15 10:30:00] first\n[2024-01-15 10:30:01] second";
        export_logs(path.to_str().unwrap(), text).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, text);
        let _ = std::fs::remove_file(&path);
    }
}
