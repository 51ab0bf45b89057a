use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use deployscope_types::LogLine;

/// Shared, capacity-bounded buffer of display lines.
///
/// Cloning is cheap and clones see the same storage. When the buffer is
/// full the oldest line is evicted.
#[derive(Clone)]
pub struct LineBuffer {
    inner: Arc<RwLock<VecDeque<LogLine>>>,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
        }
    }

    pub fn push(&self, line: LogLine) {
        let mut buf = self.inner.write();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(line);
    }

    pub fn extend(&self, lines: Vec<LogLine>) {
        let mut buf = self.inner.write();
        for line in lines {
            if buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(line);
        }
    }

    /// Drop current contents and install the given lines. Used when a
    /// backfill replaces whatever the previous source left behind.
    pub fn replace(&self, lines: Vec<LogLine>) {
        let mut buf = self.inner.write();
        buf.clear();
        for line in lines.into_iter().rev().take(self.capacity).rev() {
            buf.push_back(line);
        }
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Snapshot of the current lines, oldest first
    pub fn all(&self) -> Vec<LogLine> {
        self.inner.read().iter().cloned().collect()
    }

    /// Render the buffer for export: one `[local timestamp] message` line
    /// per entry, joined with newlines.
    pub fn export_text(&self) -> String {
        self.inner
            .read()
            .iter()
            .map(|line| {
                format!(
                    "[{}] {}",
                    line.timestamp
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S"),
                    line.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use deployscope_types::LogLevel;

    fn line(id: &str, msg: &str) -> LogLine {
        LogLine {
            id: id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            message: msg.to_string(),
            source_tag: "all".to_string(),
            historical: false,
            level: LogLevel::Unknown,
        }
    }

    #[test]
    fn test_push_evicts_oldest_at_capacity() {
        let buf = LineBuffer::new(3);
        for i in 0..5 {
            buf.push(line(&i.to_string(), &format!("msg {}", i)));
        }
        let lines = buf.all();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].message, "msg 2");
        assert_eq!(lines[2].message, "msg 4");
    }

    #[test]
    fn test_replace_discards_previous_contents() {
        let buf = LineBuffer::new(10);
        buf.push(line("old", "stale"));
        buf.replace(vec![line("a", "fresh a"), line("b", "fresh b")]);
        let lines = buf.all();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "fresh a");
    }

    #[test]
    fn test_replace_keeps_newest_when_over_capacity() {
        let buf = LineBuffer::new(2);
        buf.replace(vec![line("a", "one"), line("b", "two"), line("c", "three")]);
        let lines = buf.all();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "two");
        assert_eq!(lines[1].message, "three");
    }

    #[test]
    fn test_export_text_format() {
        let buf = LineBuffer::new(10);
        buf.push(line("1", "first line"));
        buf.push(line("2", "second line"));
        let text = buf.export_text();
        let rows: Vec<&str> = text.split('\n').collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with('['));
        assert!(rows[0].ends_with("] first line"));
        assert!(rows[1].ends_with("] second line"));
    }

    #[test]
    fn test_clones_share_storage() {
        let buf = LineBuffer::new(10);
        let other = buf.clone();
        buf.push(line("1", "shared"));
        assert_eq!(other.len(), 1);
    }
}
