use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use deployscope_types::ConnectionState;

use crate::backoff::ReconnectPolicy;
use crate::parser::live_line;

/// Why a stream closed, as far as reconnect policy is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Token rejected. Reconnecting would loop on the same failure.
    Auth,
    /// Deployment gone or not ours. Same: no reconnect.
    NotFound,
    /// Anything else. Reconnect with backoff.
    Transient,
}

/// Map a WebSocket close frame to a reconnect decision.
///
/// The server uses policy-violation (1008) and the private 4401/4404 codes
/// for auth and missing-deployment closes; older builds only put the cause
/// in the reason text, so that is matched too.
pub fn classify_close(code: Option<u16>, reason: &str) -> CloseKind {
    let reason_lower = reason.to_lowercase();
    match code {
        Some(1008) | Some(4401) => CloseKind::Auth,
        Some(4404) => CloseKind::NotFound,
        _ if reason_lower.contains("authentication") || reason_lower.contains("unauthorized") => {
            CloseKind::Auth
        }
        _ if reason_lower.contains("not found") || reason_lower.contains("access denied") => {
            CloseKind::NotFound
        }
        _ => CloseKind::Transient,
    }
}

/// Server-side status sentinels that must never land in the log buffer.
/// Anything mentioning authentication is server chatter around the
/// connection lifecycle, never container output.
pub fn is_control_message(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed == "Connected to log stream"
        || trimmed == "Log stream ended"
        || trimmed.contains("Authentication")
}

/// Text frames the server sends right before a terminal close
fn terminal_text(text: &str) -> Option<CloseKind> {
    let trimmed = text.trim();
    if trimmed.starts_with("Authentication failed") {
        Some(CloseKind::Auth)
    } else if trimmed.starts_with("Error: Deployment not found") {
        Some(CloseKind::NotFound)
    } else {
        None
    }
}

/// What the connector reports back to the session
#[derive(Debug)]
pub enum StreamEvent {
    /// A log line ready for the buffer
    Line(deployscope_types::LogLine),
    /// Connection state changed
    State(ConnectionState),
    /// Progress message worth showing in the status bar
    Notice(String),
    /// The stream ended for good; the session should not expect more events
    Terminal(String),
}

/// Owns the live WebSocket for the current source.
///
/// At most one stream task runs at a time. The task reconnects on
/// transient drops with capped exponential backoff and exits on auth or
/// not-found closes. `disconnect` tears the task down and arms a fresh
/// cancellation token for the next source.
pub struct StreamConnector {
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StreamConnector {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start streaming from `url`. A second call while a stream task is
    /// alive is ignored; disconnect first to switch sources.
    pub fn connect(&mut self, url: String, source_tag: String, tx: mpsc::UnboundedSender<StreamEvent>) {
        if self.is_active() {
            debug!("stream task already running, ignoring connect");
            return;
        }
        let state = self.state.clone();
        let cancel = self.cancel.clone();
        self.task = Some(tokio::spawn(async move {
            run_stream(url, source_tag, state, cancel, tx).await;
        }));
    }

    /// Stop the current stream and reset to a connectable state
    pub fn disconnect(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        *self.state.lock() = ConnectionState::Disconnected;
        self.cancel = CancellationToken::new();
    }
}

impl Default for StreamConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamConnector {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_stream(
    url: String,
    source_tag: String,
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<StreamEvent>,
) {
    let mut policy = ReconnectPolicy::new();

    let set_state = |s: ConnectionState| {
        *state.lock() = s;
        let _ = tx.send(StreamEvent::State(s));
    };

    loop {
        set_state(ConnectionState::Connecting);

        let connected = tokio::select! {
            _ = cancel.cancelled() => return,
            result = connect_async(&url) => result,
        };

        match connected {
            Ok((ws, _)) => {
                info!("log stream connected");
                policy.on_connected();
                set_state(ConnectionState::Connected);

                let (_, mut read) = ws.split();
                let close_kind = loop {
                    let msg = tokio::select! {
                        _ = cancel.cancelled() => return,
                        msg = read.next() => msg,
                    };
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(kind) = terminal_text(&text) {
                                break kind;
                            }
                            for raw in text.lines() {
                                if raw.trim().is_empty() || is_control_message(raw) {
                                    continue;
                                }
                                let _ = tx.send(StreamEvent::Line(live_line(raw, &source_tag)));
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = match &frame {
                                Some(f) => (Some(u16::from(f.code)), f.reason.as_ref()),
                                None => (None, ""),
                            };
                            break classify_close(code, reason);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            warn!(%err, "log stream read error");
                            break CloseKind::Transient;
                        }
                        None => break CloseKind::Transient,
                    }
                };

                match close_kind {
                    CloseKind::Auth => {
                        set_state(ConnectionState::Disconnected);
                        let _ = tx.send(StreamEvent::Terminal(
                            "Authentication failed. Check your token.".to_string(),
                        ));
                        return;
                    }
                    CloseKind::NotFound => {
                        set_state(ConnectionState::Disconnected);
                        let _ = tx.send(StreamEvent::Terminal(
                            "Deployment not found or access denied.".to_string(),
                        ));
                        return;
                    }
                    CloseKind::Transient => {}
                }
            }
            Err(err) => {
                warn!(%err, "log stream connect failed");
            }
        }

        set_state(ConnectionState::Disconnected);
        let delay = policy.next_delay();
        let _ = tx.send(StreamEvent::Notice(format!(
            "Stream disconnected. Reconnecting in {}s...",
            delay.as_secs().max(1)
        )));
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_close_codes() {
        assert_eq!(classify_close(Some(1008), ""), CloseKind::Auth);
        assert_eq!(classify_close(Some(4401), ""), CloseKind::Auth);
        assert_eq!(classify_close(Some(4404), ""), CloseKind::NotFound);
        assert_eq!(classify_close(Some(1006), ""), CloseKind::Transient);
        assert_eq!(classify_close(None, ""), CloseKind::Transient);
    }

    #[test]
    fn test_classify_close_reasons() {
        assert_eq!(
            classify_close(Some(1000), "Authentication failed: bad token"),
            CloseKind::Auth
        );
        assert_eq!(
            classify_close(None, "deployment not found or access denied"),
            CloseKind::NotFound
        );
        assert_eq!(
            classify_close(Some(1001), "server going away"),
            CloseKind::Transient
        );
    }

    #[test]
    fn test_control_messages_filtered() {
        assert!(is_control_message("Connected to log stream"));
        assert!(is_control_message("Log stream ended"));
        assert!(is_control_message("  Log stream ended  "));
        assert!(!is_control_message("Connected to database pool"));
        assert!(!is_control_message("user logged in"));
    }

    #[test]
    fn test_authentication_frames_never_become_lines() {
        // Any frame mentioning authentication is either a terminal signal
        // or dropped as control chatter; none of them may reach the buffer.
        for frame in [
            "Authentication failed: token expired",
            "User Authentication succeeded for session 42",
            "Authentication token refreshed",
        ] {
            assert!(
                is_control_message(frame) || terminal_text(frame).is_some(),
                "frame leaked through: {frame}"
            );
        }
    }

    #[test]
    fn test_terminal_text_frames() {
        assert_eq!(
            terminal_text("Authentication failed: token expired"),
            Some(CloseKind::Auth)
        );
        assert_eq!(
            terminal_text("Error: Deployment not found or access denied"),
            Some(CloseKind::NotFound)
        );
        assert_eq!(terminal_text("plain log line"), None);
    }

    #[tokio::test]
    async fn test_auth_close_is_terminal_with_no_reconnect() {
        use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
        use tokio_tungstenite::tungstenite::protocol::CloseFrame;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.close(Some(CloseFrame {
                code: CloseCode::Policy,
                reason: "Authentication failed".into(),
            }))
            .await
            .unwrap();
            // Drain until the close handshake completes
            while let Some(msg) = ws.next().await {
                if msg.is_err() {
                    break;
                }
            }
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut connector = StreamConnector::new();
        connector.connect(format!("ws://{}", addr), "all".to_string(), tx);

        // The channel closes when the stream task returns instead of
        // scheduling another attempt, so draining it to the end proves
        // there was no reconnect.
        let mut states = Vec::new();
        let mut terminal = None;
        while let Some(event) =
            tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                .await
                .expect("stream should settle without backing off")
        {
            match event {
                StreamEvent::State(s) => states.push(s),
                StreamEvent::Terminal(msg) => terminal = Some(msg),
                StreamEvent::Notice(_) | StreamEvent::Line(_) => {}
            }
        }

        assert_eq!(
            terminal.as_deref(),
            Some("Authentication failed. Check your token.")
        );
        assert_eq!(
            states,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Connected,
                ConnectionState::Disconnected,
            ]
        );
    }

    #[tokio::test]
    async fn test_second_connect_ignored_while_active() {
        let mut connector = StreamConnector::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        // Nothing listens on this port; the task stays alive in its
        // connect/backoff loop, which is all the guard needs.
        connector.connect("ws://127.0.0.1:1".to_string(), "all".to_string(), tx.clone());
        assert!(connector.is_active());
        connector.connect("ws://127.0.0.1:1".to_string(), "all".to_string(), tx);
        connector.disconnect();
        assert!(!connector.is_active());
        assert_eq!(connector.state(), ConnectionState::Disconnected);
    }
}
