use std::future::Future;

use deployscope_api::{ApiClient, ApiError};
use deployscope_types::LogSource;

/// The slice of the management API the log session depends on.
///
/// Abstracting it behind a trait keeps the session and history loader
/// testable without a live backend.
pub trait LogsApi: Clone + Send + Sync + 'static {
    fn fetch_history(
        &self,
        deployment_id: &str,
        pod: Option<&str>,
        tail: u32,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;

    fn fetch_sources(
        &self,
        deployment_id: &str,
    ) -> impl Future<Output = Result<Vec<LogSource>, ApiError>> + Send;

    fn stream_url(&self, deployment_id: &str, pod: Option<&str>) -> String;
}

impl LogsApi for ApiClient {
    fn fetch_history(
        &self,
        deployment_id: &str,
        pod: Option<&str>,
        tail: u32,
    ) -> impl Future<Output = Result<String, ApiError>> + Send {
        ApiClient::fetch_history(self, deployment_id, pod, tail)
    }

    fn fetch_sources(
        &self,
        deployment_id: &str,
    ) -> impl Future<Output = Result<Vec<LogSource>, ApiError>> + Send {
        ApiClient::fetch_sources(self, deployment_id)
    }

    fn stream_url(&self, deployment_id: &str, pod: Option<&str>) -> String {
        ApiClient::stream_url(self, deployment_id, pod)
    }
}
