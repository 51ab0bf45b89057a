//! Log streaming core for deployscope
//!
//! This crate implements the log view's three cooperating pieces: the
//! history loader (bounded backfill with retry), the stream connector
//! (one live WebSocket per session, reconnecting with capped exponential
//! backoff), and the session controller that switches sources, owns the
//! line buffer, and exposes the clear/refresh/export operations.

mod api;
mod backoff;
mod buffer;
mod connector;
mod filter;
mod history;
mod parser;
mod session;

pub use api::LogsApi;
pub use backoff::{RECONNECT_CEILING_MS, RECONNECT_FLOOR_MS, ReconnectPolicy, next_delay};
pub use buffer::LineBuffer;
pub use connector::{CloseKind, StreamConnector, StreamEvent, classify_close, is_control_message};
pub use filter::CompiledFilter;
pub use history::{HistoryLoader, HistoryOutcome, parse_history};
pub use parser::{detect_level, live_line, split_timestamp};
pub use session::{LogSession, SessionEvent, SessionEventKind};

// Re-export types used in our public API
pub use deployscope_types::{ConnectionState, LogLine, LogSource, SourceSelection};
