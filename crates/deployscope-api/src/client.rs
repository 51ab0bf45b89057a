use serde::Deserialize;

use crate::error::{ApiError, classify_status};
use deployscope_types::{DeploymentSummary, LogSource};

#[derive(Deserialize)]
struct DeploymentListResponse {
    deployments: Vec<DeploymentSummary>,
}

#[derive(Deserialize)]
struct HistoryResponse {
    logs: String,
}

#[derive(Deserialize)]
struct SourcesResponse {
    sources: Vec<LogSource>,
}

/// Client for the platform management API
///
/// Cheap to clone; the underlying reqwest client is reference-counted. The
/// bearer token is read-only here: the client consumes a credential issued
/// elsewhere and never refreshes or mutates it.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// List the user's deployments
    pub async fn list_deployments(&self) -> Result<Vec<DeploymentSummary>, ApiError> {
        let url = format!("{}/v1/deployments", self.base_url);
        let resp = self.send_checked(self.http.get(&url)).await?;
        let list: DeploymentListResponse = resp.json().await?;
        Ok(list.deployments)
    }

    /// Fetch the most recent `tail` log lines as one newline-separated blob.
    /// `pod` scopes the fetch to a single pod; `None` is the merged view.
    pub async fn fetch_history(
        &self,
        deployment_id: &str,
        pod: Option<&str>,
        tail: u32,
    ) -> Result<String, ApiError> {
        let url = format!("{}/v1/deployments/{}/logs", self.base_url, deployment_id);
        let mut req = self.http.get(&url).query(&[("tail", tail.to_string())]);
        if let Some(pod) = pod {
            req = req.query(&[("pod", pod)]);
        }
        let resp = self.send_checked(req).await?;
        let history: HistoryResponse = resp.json().await?;
        Ok(history.logs)
    }

    /// List the pods currently serving a deployment
    pub async fn fetch_sources(&self, deployment_id: &str) -> Result<Vec<LogSource>, ApiError> {
        let url = format!("{}/v1/deployments/{}/pods", self.base_url, deployment_id);
        let resp = self.send_checked(self.http.get(&url)).await?;
        let sources: SourcesResponse = resp.json().await?;
        Ok(sources.sources)
    }

    /// Build the WebSocket URL for the live log stream. The endpoint
    /// authenticates via a token query parameter since WebSocket upgrades
    /// cannot carry an Authorization header from every client.
    pub fn stream_url(&self, deployment_id: &str, pod: Option<&str>) -> String {
        stream_url(&self.base_url, &self.token, deployment_id, pod)
    }

    async fn send_checked(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = req.bearer_auth(&self.token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }
        Ok(resp)
    }
}

/// Translate the HTTP base URL into the stream endpoint's ws/wss URL.
/// Query values are form-encoded so tokens and pod names survive verbatim.
pub fn stream_url(base_url: &str, token: &str, deployment_id: &str, pod: Option<&str>) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        format!("ws://{}", base_url)
    };

    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("token", token);
    if let Some(pod) = pod {
        query.append_pair("pod", pod);
    }

    format!(
        "{}/v1/deployments/{}/logs/stream?{}",
        ws_base,
        deployment_id,
        query.finish()
    )
}
