use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use deployscope_types::{ConnectionState, LogLine, LogSource, SourceSelection};

use crate::api::LogsApi;
use crate::buffer::LineBuffer;
use crate::connector::{StreamConnector, StreamEvent};
use crate::history::{HISTORY_RETRY_DELAY, HistoryLoader, HistoryOutcome};

/// Event emitted by the session's background tasks.
///
/// Carries the generation it was produced under; events from a source that
/// has since been switched away from are dropped by `apply`.
#[derive(Debug)]
pub struct SessionEvent {
    pub generation: u64,
    pub kind: SessionEventKind,
}

#[derive(Debug)]
pub enum SessionEventKind {
    /// Pod list fetched (possibly empty; the merged view always exists)
    SourcesLoaded(Vec<LogSource>),
    /// Backfill finished; these lines replace the buffer
    HistoryLoaded(Vec<LogLine>),
    /// One live line from the stream
    Line(LogLine),
    /// Stream connection state changed
    Connection(ConnectionState),
    /// Progress message for the status bar
    Notice(String),
    /// The session stopped for good (auth, missing deployment, retry budget)
    Terminal(String),
}

/// Controller for one deployment's log view.
///
/// Owns the line buffer and the stream connector, runs the backfill, and
/// serializes source switches through a generation counter so a stale
/// task can never write into the new source's view.
pub struct LogSession<A: LogsApi> {
    api: A,
    deployment_id: String,
    deployment_name: String,
    selection: SourceSelection,
    sources: Vec<LogSource>,
    buffer: LineBuffer,
    connector: StreamConnector,
    generation: u64,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<SessionEvent>,
    connection: ConnectionState,
    history_retry_delay: Duration,
}

impl<A: LogsApi> LogSession<A> {
    pub fn new(
        api: A,
        deployment_id: &str,
        deployment_name: &str,
        buffer_capacity: usize,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            api,
            deployment_id: deployment_id.to_string(),
            deployment_name: deployment_name.to_string(),
            selection: SourceSelection::Merged,
            sources: Vec::new(),
            buffer: LineBuffer::new(buffer_capacity),
            connector: StreamConnector::new(),
            generation: 0,
            cancel: CancellationToken::new(),
            tx,
            connection: ConnectionState::Disconnected,
            history_retry_delay: HISTORY_RETRY_DELAY,
        }
    }

    /// Override the backfill retry pause. Tests pass zero.
    pub fn with_history_retry_delay(mut self, delay: Duration) -> Self {
        self.history_retry_delay = delay;
        self
    }

    /// Set the source before `start`, for sessions opened directly on a pod
    pub fn with_selection(mut self, selection: SourceSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn buffer(&self) -> &LineBuffer {
        &self.buffer
    }

    pub fn sources(&self) -> &[LogSource] {
        &self.sources
    }

    pub fn selection(&self) -> &SourceSelection {
        &self.selection
    }

    pub fn deployment_name(&self) -> &str {
        &self.deployment_name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Kick off the initial pod list fetch and backfill
    pub fn start(&mut self) {
        self.load_sources();
        self.start_history();
    }

    /// Apply a background event. Returns the event kind once the session
    /// state has been updated, or `None` if the event is from a previous
    /// generation and was dropped.
    pub fn apply(&mut self, event: SessionEvent) -> Option<SessionEventKind> {
        if event.generation != self.generation {
            debug!(
                event_gen = event.generation,
                current = self.generation,
                "dropping stale session event"
            );
            return None;
        }
        match &event.kind {
            SessionEventKind::SourcesLoaded(sources) => {
                self.sources = sources.clone();
            }
            SessionEventKind::HistoryLoaded(lines) => {
                self.buffer.replace(lines.clone());
                self.connect_stream();
            }
            SessionEventKind::Line(line) => {
                self.buffer.push(line.clone());
            }
            SessionEventKind::Connection(state) => {
                self.connection = *state;
            }
            SessionEventKind::Notice(_) | SessionEventKind::Terminal(_) => {}
        }
        Some(event.kind)
    }

    /// Switch to a different log source. Tears down the current stream and
    /// backfill, clears the buffer, and starts over for the new source.
    /// Selecting the current source is a no-op.
    pub fn select_source(&mut self, selection: SourceSelection) -> bool {
        if selection == self.selection {
            return false;
        }
        self.teardown_generation();
        self.selection = selection;
        self.buffer.clear();
        self.connection = ConnectionState::Disconnected;
        self.start_history();
        true
    }

    /// Re-run the pod list fetch and backfill for the current source. The
    /// buffer keeps its contents until the fresh backfill replaces them.
    pub fn refresh(&mut self) {
        self.teardown_generation();
        self.connection = ConnectionState::Disconnected;
        self.load_sources();
        self.start_history();
    }

    /// Empty the view. The live stream keeps running.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Suggested filename for an export of the current view
    pub fn export_filename(&self) -> String {
        format!(
            "{}_{}_{}.log",
            sanitize(&self.deployment_name),
            sanitize(self.selection.label()),
            chrono::Local::now().format("%Y-%m-%d")
        )
    }

    pub fn export_text(&self) -> String {
        self.buffer.export_text()
    }

    /// Stop all background work for this session
    pub fn shutdown(&mut self) {
        self.teardown_generation();
    }

    fn teardown_generation(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.connector.disconnect();
        self.generation += 1;
    }

    fn load_sources(&self) {
        let api = self.api.clone();
        let deployment_id = self.deployment_id.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            // Best effort: a failed pod list still leaves the merged view
            let sources = match api.fetch_sources(&deployment_id).await {
                Ok(sources) => sources,
                Err(err) => {
                    warn!(%err, "pod list fetch failed");
                    Vec::new()
                }
            };
            let _ = tx.send(SessionEvent {
                generation,
                kind: SessionEventKind::SourcesLoaded(sources),
            });
        });
    }

    fn start_history(&self) {
        let loader = HistoryLoader::new(
            self.api.clone(),
            &self.deployment_id,
            self.selection.pod_param(),
            self.selection.label(),
        )
        .with_retry_delay(self.history_retry_delay);
        let cancel = self.cancel.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let status_tx = tx.clone();
            let outcome = loader
                .load(cancel, move |msg| {
                    let _ = status_tx.send(SessionEvent {
                        generation,
                        kind: SessionEventKind::Notice(msg),
                    });
                })
                .await;
            let kind = match outcome {
                HistoryOutcome::Loaded(lines) => SessionEventKind::HistoryLoaded(lines),
                HistoryOutcome::Failed(msg) => SessionEventKind::Terminal(msg),
                HistoryOutcome::Canceled => return,
            };
            let _ = tx.send(SessionEvent { generation, kind });
        });
    }

    fn connect_stream(&mut self) {
        let url = self
            .api
            .stream_url(&self.deployment_id, self.selection.pod_param());
        let (stream_tx, mut stream_rx) = mpsc::unbounded_channel();
        self.connector
            .connect(url, self.selection.label().to_string(), stream_tx);

        let tx = self.tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            while let Some(event) = stream_rx.recv().await {
                let kind = match event {
                    StreamEvent::Line(line) => SessionEventKind::Line(line),
                    StreamEvent::State(state) => SessionEventKind::Connection(state),
                    StreamEvent::Notice(msg) => SessionEventKind::Notice(msg),
                    StreamEvent::Terminal(msg) => SessionEventKind::Terminal(msg),
                };
                if tx.send(SessionEvent { generation, kind }).is_err() {
                    break;
                }
            }
        });
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    use chrono::Utc;
    use deployscope_api::ApiError;
    use deployscope_types::LogLevel;

    #[derive(Clone)]
    struct StubApi;

    impl LogsApi for StubApi {
        fn fetch_history(
            &self,
            _deployment_id: &str,
            _pod: Option<&str>,
            _tail: u32,
        ) -> impl Future<Output = Result<String, ApiError>> + Send {
            async { Ok("2024-01-15T10:30:00Z hello".to_string()) }
        }

        fn fetch_sources(
            &self,
            _deployment_id: &str,
        ) -> impl Future<Output = Result<Vec<LogSource>, ApiError>> + Send {
            async {
                Ok(vec![LogSource {
                    name: "web-0".to_string(),
                    ready: true,
                }])
            }
        }

        fn stream_url(&self, deployment_id: &str, _pod: Option<&str>) -> String {
            // Nothing listens here; stream tests drive `apply` directly
            format!("ws://127.0.0.1:1/{}", deployment_id)
        }
    }

    fn test_line(msg: &str) -> LogLine {
        LogLine {
            id: msg.to_string(),
            timestamp: Utc::now(),
            message: msg.to_string(),
            source_tag: "all".to_string(),
            historical: false,
            level: LogLevel::Unknown,
        }
    }

    fn new_session() -> (
        LogSession<StubApi>,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = LogSession::new(StubApi, "d-1", "my-app", 100, tx)
            .with_history_retry_delay(Duration::ZERO);
        (session, rx)
    }

    #[tokio::test]
    async fn test_switch_clears_buffer_and_bumps_generation() {
        let (mut session, _rx) = new_session();
        session.buffer().push(test_line("old line"));
        let before = session.generation();

        let switched = session.select_source(SourceSelection::Pod("web-0".to_string()));

        assert!(switched);
        assert!(session.buffer().is_empty());
        assert_eq!(session.generation(), before + 1);
        assert_eq!(session.selection().label(), "web-0");
    }

    #[tokio::test]
    async fn test_same_source_switch_is_noop() {
        let (mut session, _rx) = new_session();
        session.buffer().push(test_line("kept"));
        let before = session.generation();

        let switched = session.select_source(SourceSelection::Merged);

        assert!(!switched);
        assert_eq!(session.buffer().len(), 1);
        assert_eq!(session.generation(), before);
    }

    #[tokio::test]
    async fn test_stale_generation_event_dropped() {
        let (mut session, _rx) = new_session();
        session.select_source(SourceSelection::Pod("web-0".to_string()));

        // A line produced before the switch must not reach the buffer
        let stale = SessionEvent {
            generation: session.generation() - 1,
            kind: SessionEventKind::Line(test_line("from old source")),
        };
        assert!(session.apply(stale).is_none());
        assert!(session.buffer().is_empty());

        let fresh = SessionEvent {
            generation: session.generation(),
            kind: SessionEventKind::Line(test_line("from new source")),
        };
        assert!(session.apply(fresh).is_some());
        assert_eq!(session.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_history_loaded_replaces_buffer() {
        let (mut session, _rx) = new_session();
        session.buffer().push(test_line("leftover"));

        let event = SessionEvent {
            generation: session.generation(),
            kind: SessionEventKind::HistoryLoaded(vec![
                test_line("backfill a"),
                test_line("backfill b"),
            ]),
        };
        session.apply(event);

        let lines = session.buffer().all();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "backfill a");
    }

    #[tokio::test]
    async fn test_refresh_keeps_selection_and_buffer_until_backfill() {
        let (mut session, _rx) = new_session();
        session.select_source(SourceSelection::Pod("web-0".to_string()));
        session.buffer().push(test_line("still visible"));
        let before = session.generation();

        session.refresh();

        assert_eq!(session.selection().label(), "web-0");
        assert_eq!(session.buffer().len(), 1);
        assert_eq!(session.generation(), before + 1);
    }

    #[tokio::test]
    async fn test_start_reports_sources_and_history() {
        let (mut session, mut rx) = new_session();
        session.start();

        let mut saw_sources = false;
        let mut saw_history = false;
        for _ in 0..2 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event within timeout")
                .expect("channel open");
            match session.apply(event) {
                Some(SessionEventKind::SourcesLoaded(sources)) => {
                    assert_eq!(sources.len(), 1);
                    saw_sources = true;
                }
                Some(SessionEventKind::HistoryLoaded(lines)) => {
                    assert_eq!(lines.len(), 1);
                    saw_history = true;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert!(saw_sources);
        assert!(saw_history);
        assert_eq!(session.buffer().len(), 1);
        session.shutdown();
    }

    #[tokio::test]
    async fn test_export_filename_shape() {
        let (mut session, _rx) = new_session();
        session.select_source(SourceSelection::Pod("web 0/a".to_string()));
        let name = session.export_filename();
        assert!(name.starts_with("my-app_web-0-a_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_clear_only_empties_buffer() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = LogSession::new(StubApi, "d-1", "my-app", 100, tx);
        session.buffer().push(test_line("gone"));
        let generation = session.generation();

        session.clear();

        assert!(session.buffer().is_empty());
        assert_eq!(session.generation(), generation);
    }
}
