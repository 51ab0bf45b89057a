//! Platform REST client for deployscope
//!
//! This crate talks to the container platform's management API: deployment
//! listing, historical log backfill, and pod discovery. The live stream
//! endpoint is consumed elsewhere; this crate only builds its URL.

mod client;
mod error;

pub use client::{ApiClient, stream_url};
pub use error::{ApiError, classify_status};

// Re-export types that are used in our public API
pub use deployscope_types::{DeploymentSummary, LogSource};
