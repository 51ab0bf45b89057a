use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use deployscope_api::ApiError;
use deployscope_types::LogLine;

use crate::api::LogsApi;
use crate::parser::{detect_level, split_timestamp};

/// Number of lines requested from the backfill endpoint
pub const HISTORY_TAIL: u32 = 100;

/// How many times a "container still starting" response is retried
pub const HISTORY_MAX_RETRIES: u32 = 10;

/// Pause between backfill retries
pub const HISTORY_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Result of a backfill attempt
#[derive(Debug)]
pub enum HistoryOutcome {
    /// Parsed lines, oldest first. May be empty.
    Loaded(Vec<LogLine>),
    /// Terminal failure with a message for the user
    Failed(String),
    /// The session moved on before the fetch finished
    Canceled,
}

/// Parse a newline-separated history blob into display lines.
///
/// Lines keep their embedded timestamps when present. Lines without one get
/// synthesized timestamps spaced a second apart, counting back from now, so
/// the backfill still sorts ahead of live lines.
pub fn parse_history(blob: &str, source_tag: &str) -> Vec<LogLine> {
    let raw_lines: Vec<&str> = blob.lines().filter(|l| !l.trim().is_empty()).collect();
    let now = Utc::now();
    let total = raw_lines.len() as i64;

    raw_lines
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let (ts, content) = split_timestamp(raw);
            let timestamp =
                ts.unwrap_or_else(|| now - chrono::Duration::seconds(total - i as i64));
            LogLine {
                id: format!("h-{}", i),
                timestamp,
                message: content.trim_end().to_string(),
                source_tag: source_tag.to_string(),
                historical: true,
                level: detect_level(content),
            }
        })
        .collect()
}

/// One-shot backfill of recent log lines before the live stream attaches.
///
/// Auth and not-found failures are terminal. A 400 telling us the container
/// has not produced logs yet is retried on a fixed schedule with a visible
/// attempt counter; everything else fails after the first try.
pub struct HistoryLoader<A: LogsApi> {
    api: A,
    deployment_id: String,
    pod: Option<String>,
    source_tag: String,
    tail: u32,
    max_retries: u32,
    retry_delay: Duration,
}

impl<A: LogsApi> HistoryLoader<A> {
    pub fn new(api: A, deployment_id: &str, pod: Option<&str>, source_tag: &str) -> Self {
        Self {
            api,
            deployment_id: deployment_id.to_string(),
            pod: pod.map(str::to_string),
            source_tag: source_tag.to_string(),
            tail: HISTORY_TAIL,
            max_retries: HISTORY_MAX_RETRIES,
            retry_delay: HISTORY_RETRY_DELAY,
        }
    }

    /// Override the pause between retries. Tests pass zero.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Fetch the backfill, retrying while the container is still starting.
    /// `on_status` receives user-visible progress messages.
    pub async fn load(
        &self,
        cancel: CancellationToken,
        mut on_status: impl FnMut(String),
    ) -> HistoryOutcome {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return HistoryOutcome::Canceled;
            }

            let fetch = self
                .api
                .fetch_history(&self.deployment_id, self.pod.as_deref(), self.tail);
            let result = tokio::select! {
                _ = cancel.cancelled() => return HistoryOutcome::Canceled,
                result = fetch => result,
            };

            match result {
                Ok(blob) => {
                    let lines = parse_history(&blob, &self.source_tag);
                    debug!(lines = lines.len(), "history backfill loaded");
                    return HistoryOutcome::Loaded(lines);
                }
                Err(ApiError::Starting(msg)) if attempt < self.max_retries => {
                    attempt += 1;
                    on_status(format!(
                        "Waiting for container logs ({}/{})...",
                        attempt, self.max_retries
                    ));
                    debug!(attempt, max = self.max_retries, %msg, "backfill retry");
                    tokio::select! {
                        _ = cancel.cancelled() => return HistoryOutcome::Canceled,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
                Err(ApiError::Starting(_)) => {
                    warn!("container still starting after final backfill retry");
                    return HistoryOutcome::Failed(
                        "Container is taking longer than expected to start. Try Refresh."
                            .to_string(),
                    );
                }
                Err(err) => {
                    warn!(%err, "history backfill failed");
                    return HistoryOutcome::Failed(format!("Failed to load logs: {}", err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use deployscope_types::LogSource;

    #[derive(Clone)]
    struct ScriptedApi {
        starting_responses: u32,
        calls: Arc<AtomicU32>,
    }

    impl LogsApi for ScriptedApi {
        fn fetch_history(
            &self,
            _deployment_id: &str,
            _pod: Option<&str>,
            _tail: u32,
        ) -> impl Future<Output = Result<String, deployscope_api::ApiError>> + Send {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let starting = self.starting_responses;
            async move {
                if call < starting {
                    Err(deployscope_api::ApiError::Starting(
                        "container is starting".to_string(),
                    ))
                } else {
                    Ok("2024-01-15T10:30:00Z first\n2024-01-15T10:30:01Z second".to_string())
                }
            }
        }

        fn fetch_sources(
            &self,
            _deployment_id: &str,
        ) -> impl Future<Output = Result<Vec<LogSource>, deployscope_api::ApiError>> + Send {
            async { Ok(Vec::new()) }
        }

        fn stream_url(&self, _deployment_id: &str, _pod: Option<&str>) -> String {
            "ws://unused".to_string()
        }
    }

    #[test]
    fn test_parse_history_keeps_order_and_marks_historical() {
        let blob = "2024-01-15T10:30:00Z alpha\n\n2024-01-15T10:30:05Z beta\ngamma";
        let lines = parse_history(blob, "all");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].message, "alpha");
        assert_eq!(lines[1].message, "beta");
        assert_eq!(lines[2].message, "gamma");
        assert!(lines.iter().all(|l| l.historical));
        // Unique ids even for identical content
        assert_ne!(lines[0].id, lines[1].id);
    }

    #[test]
    fn test_parse_history_synthesizes_monotonic_timestamps() {
        let lines = parse_history("one\ntwo\nthree", "all");
        assert!(lines[0].timestamp < lines[1].timestamp);
        assert!(lines[1].timestamp < lines[2].timestamp);
    }

    #[tokio::test]
    async fn test_load_retries_while_starting() {
        let calls = Arc::new(AtomicU32::new(0));
        let api = ScriptedApi {
            starting_responses: 3,
            calls: calls.clone(),
        };
        let loader = HistoryLoader::new(api, "d-1", None, "all")
            .with_retry_delay(Duration::ZERO);

        let mut statuses = Vec::new();
        let outcome = loader
            .load(CancellationToken::new(), |s| statuses.push(s))
            .await;

        match outcome {
            HistoryOutcome::Loaded(lines) => assert_eq!(lines.len(), 2),
            other => panic!("expected Loaded, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(statuses.len(), 3);
        assert!(statuses[0].contains("(1/10)"));
        assert!(statuses[2].contains("(3/10)"));
    }

    #[tokio::test]
    async fn test_load_gives_up_after_retry_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let api = ScriptedApi {
            starting_responses: u32::MAX,
            calls: calls.clone(),
        };
        let loader = HistoryLoader::new(api, "d-1", None, "all")
            .with_retry_delay(Duration::ZERO);

        let outcome = loader.load(CancellationToken::new(), |_| {}).await;

        assert!(matches!(outcome, HistoryOutcome::Failed(_)));
        // Initial attempt plus the full retry budget
        assert_eq!(calls.load(Ordering::SeqCst), 1 + HISTORY_MAX_RETRIES);
    }

    #[tokio::test]
    async fn test_load_canceled_before_start() {
        let api = ScriptedApi {
            starting_responses: 0,
            calls: Arc::new(AtomicU32::new(0)),
        };
        let loader = HistoryLoader::new(api, "d-1", None, "all");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = loader.load(cancel, |_| {}).await;
        assert!(matches!(outcome, HistoryOutcome::Canceled));
    }
}
