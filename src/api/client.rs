use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::http::{send_once, send_with_retry};
use super::types::ApiError;
use crate::domain::RepositoryRef;

/// Default request timeout in seconds
pub(super) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Public GitHub API root
pub const DEFAULT_API_URL: &str = "https://api.github.com/";

/// Default CLI version (from Cargo.toml)
const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Build the User-Agent string (GitHub rejects requests without one)
fn build_user_agent() -> String {
    std::env::var("REPOSYNC_USER_AGENT")
        .unwrap_or_else(|_| format!("reposync/{}", DEFAULT_VERSION))
}

/// HTTP client for the GitHub REST API
pub struct ApiClient {
    pub(super) client: Client,
    pub(super) user_agent: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(user_agent: Option<String>) -> Self {
        let user_agent = user_agent.unwrap_or_else(build_user_agent);

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self { client, user_agent }
    }

    /// Append path segments to the API root, percent-encoding each one.
    pub(super) fn build_url(base_url: &Url, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::invalid_url(format!("Invalid base URL: {}", base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `repos/{owner}/{name}/...`
    pub(super) fn repo_url(
        base_url: &Url,
        repo: &RepositoryRef,
        tail: &[&str],
    ) -> Result<Url, ApiError> {
        let mut segments = vec!["repos", repo.owner.as_str(), repo.name.as_str()];
        segments.extend_from_slice(tail);
        Self::build_url(base_url, &segments)
    }

    fn client_with_timeout(&self, timeout_secs: u64) -> Result<Client, ApiError> {
        if timeout_secs == DEFAULT_TIMEOUT_SECS {
            return Ok(self.client.clone());
        }

        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::invalid_url(format!("Failed to build HTTP client: {}", e)))
    }

    fn request(
        &self,
        client: &Client,
        method: Method,
        url: &Url,
        access_token: &str,
    ) -> reqwest::RequestBuilder {
        client
            .request(method, url.clone())
            .header("Accept", GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", &self.user_agent)
            .header("Authorization", format!("Bearer {}", access_token))
    }

    /// GET a JSON document. Reads are idempotent and retried on transient failures.
    pub(super) async fn get_json<R>(
        &self,
        url: Url,
        access_token: &str,
        timeout_secs: u64,
    ) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        debug!("=== API Request ===");
        debug!("GET {}", url);

        let client = self.client_with_timeout(timeout_secs)?;
        let response =
            send_with_retry(|| self.request(&client, Method::GET, &url, access_token)).await?;

        Self::read_response(response).await
    }

    /// Send a JSON body with a write method. Never retried.
    pub(super) async fn send_json<T, R>(
        &self,
        method: Method,
        url: Url,
        access_token: &str,
        body: &T,
    ) -> Result<R, ApiError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        debug!("=== API Request ===");
        debug!("{} {}", method, url);

        let request = self
            .request(&self.client, method, &url, access_token)
            .json(body);
        let response = send_once(request).await?;

        Self::read_response(response).await
    }

    async fn read_response<R>(response: reqwest::Response) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
    {
        let status = response.status();
        debug!("=== API Response ===");
        debug!("Status: {}", status);

        if !status.is_success() {
            let headers = response.headers();
            let request_id = headers
                .get("x-github-request-id")
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            let quota_exhausted = headers
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim() == "0");

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let api_error = ApiError::from_http_response(
                status.as_u16(),
                error_text,
                request_id,
                quota_exhausted,
            );

            // Not-found and conflict answers drive normal control flow (missing
            // branch, empty repository) and are left to the caller to report.
            if api_error.is_fatal() {
                error!("❌ {}", api_error.message);
                error!("   {}", api_error.user_hint());
            } else {
                debug!(
                    "API request failed: {} (request id: {})",
                    api_error.message,
                    api_error.request_id.as_deref().unwrap_or("-")
                );
            }

            return Err(api_error);
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ApiError::decode("response body", e))?;
        serde_json::from_str(&response_text).map_err(|e| ApiError::decode("API response", e))
    }
}
