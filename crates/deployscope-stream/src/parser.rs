use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use deployscope_types::{LogLevel, LogLine};

/// Extract an RFC 3339 timestamp from the beginning of a log line.
///
/// The platform forwards container logs with the runtime's timestamp prefix
/// (e.g. `2024-01-15T10:30:00.123456789Z message`). Returns the parsed
/// timestamp and the remainder of the line, or the whole line if no valid
/// prefix is present.
pub fn split_timestamp(raw: &str) -> (Option<DateTime<Utc>>, &str) {
    // Shortest valid prefix is 2024-01-15T10:30:00Z (20 chars); the 'Z'
    // terminator sits within the first ~35 bytes even with nanoseconds.
    if raw.len() >= 20 {
        let search_end = floor_char_boundary(raw, 35.min(raw.len()));
        if let Some(z_pos) = raw.get(..search_end).and_then(|s| s.find('Z')) {
            let ts_str = &raw[..=z_pos];
            if let Ok(ts) = DateTime::parse_from_rfc3339(ts_str) {
                let remaining = raw[z_pos + 1..].trim_start();
                return (Some(ts.with_timezone(&Utc)), remaining);
            }
        }
    }
    (None, raw)
}

/// Find the largest valid char boundary <= the given byte index
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Level tokens in severity order; mapped to levels via `LogLevel::from_str`
const LEVEL_TOKENS: [&str; 10] = [
    "FATAL", "PANIC", "CRITICAL", "ERROR", "ERR", "WARNING", "WARN", "INFO", "DEBUG", "TRACE",
];

/// Detect a log level from plain-text patterns, for display coloring only.
/// Bracketed tokens win over colon-suffixed ones, which win over a bare
/// leading token.
pub fn detect_level(content: &str) -> LogLevel {
    let upper = content.to_uppercase();

    for token in LEVEL_TOKENS {
        if upper.contains(&format!("[{token}]")) {
            return LogLevel::from_str(token);
        }
    }

    for token in LEVEL_TOKENS {
        if upper.contains(&format!("{token}:")) {
            return LogLevel::from_str(token);
        }
    }

    let trimmed_upper = upper.trim_start();
    for token in LEVEL_TOKENS {
        if trimmed_upper.starts_with(token) {
            return LogLevel::from_str(token);
        }
    }

    LogLevel::Unknown
}

/// Build a live (non-historical) log line from a stream frame.
///
/// Live ids combine the timestamp with a process-wide counter; they only
/// need to be unique enough to key a rendered list.
pub fn live_line(raw: &str, source_tag: &str) -> LogLine {
    static LIVE_SEQ: AtomicU64 = AtomicU64::new(0);

    let (ts, content) = split_timestamp(raw);
    let timestamp = ts.unwrap_or_else(Utc::now);
    let seq = LIVE_SEQ.fetch_add(1, Ordering::Relaxed);

    LogLine {
        id: format!("{}-{}", timestamp.timestamp_millis(), seq),
        timestamp,
        message: content.trim_end().to_string(),
        source_tag: source_tag.to_string(),
        historical: false,
        level: detect_level(content),
    }
}
