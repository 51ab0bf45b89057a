//! Shared types for deployscope
//!
//! This crate contains data structures used across multiple deployscope crates.

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::Deserialize;

// ============================================================================
// Platform Resource Types
// ============================================================================

/// Summary of a deployment as returned by the platform's list endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct DeploymentSummary {
    pub id: String,
    pub app_name: String,
    pub status: String,
    #[serde(default)]
    pub replicas: i32,
}

impl DeploymentSummary {
    /// Whether the deployment is in a state that can serve logs
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// One addressable origin of log lines (a single pod)
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LogSource {
    pub name: String,
    pub ready: bool,
}

/// The active log source for a session: either the server-side merged view
/// of all pods, or one named pod.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SourceSelection {
    /// Server-side merge across all pods. Always available.
    #[default]
    Merged,
    Pod(String),
}

impl SourceSelection {
    /// Display label ("all" for the merged view)
    pub fn label(&self) -> &str {
        match self {
            Self::Merged => "all",
            Self::Pod(name) => name,
        }
    }

    /// Value for the `pod` query parameter, if any
    pub fn pod_param(&self) -> Option<&str> {
        match self {
            Self::Merged => None,
            Self::Pod(name) => Some(name),
        }
    }
}

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level, detected from line content for display coloring only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    #[default]
    Unknown,
}

impl LogLevel {
    /// Parse log level from common formats
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" | "trc" => Self::Trace,
            "debug" | "dbg" => Self::Debug,
            "info" | "inf" => Self::Info,
            "warn" | "warning" | "wrn" => Self::Warn,
            "error" | "err" => Self::Error,
            "fatal" | "panic" | "critical" => Self::Fatal,
            _ => Self::Unknown,
        }
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Trace => Color::DarkGray,
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
            Self::Unknown => Color::White,
        }
    }
}

/// A single displayed log line
#[derive(Clone, Debug)]
pub struct LogLine {
    /// Unique per displayed line. Index-derived for backfilled lines,
    /// timestamp+counter for live lines. Only unique enough for list keys.
    pub id: String,

    /// Parsed or synthesized timestamp
    pub timestamp: DateTime<Utc>,

    /// Line content with any leading timestamp stripped
    pub message: String,

    /// Which source produced this line ("all" for the merged view)
    pub source_tag: String,

    /// Backfilled line (styling only, no behavioral effect)
    pub historical: bool,

    /// Detected severity (styling only)
    pub level: LogLevel,
}

// ============================================================================
// Connection Types
// ============================================================================

/// Lifecycle state of the live log stream connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Disconnected => Color::Red,
            Self::Connecting => Color::Yellow,
            Self::Connected => Color::Green,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_selection_labels() {
        assert_eq!(SourceSelection::Merged.label(), "all");
        assert_eq!(SourceSelection::Merged.pod_param(), None);

        let pod = SourceSelection::Pod("web-7f9c".to_string());
        assert_eq!(pod.label(), "web-7f9c");
        assert_eq!(pod.pod_param(), Some("web-7f9c"));
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!(LogLevel::from_str("WARNING"), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("panic"), LogLevel::Fatal);
        assert_eq!(LogLevel::from_str("whatever"), LogLevel::Unknown);
    }
}
