//! Token validation against `GET /user`.

use tracing::debug;
use url::Url;

use super::client::ApiClient;
use super::types::{ApiError, UserResponse};

/// Timeout for validation requests (short, for quick feedback)
const VALIDATION_TIMEOUT_SECS: u64 = 10;

impl ApiClient {
    /// The account a token belongs to.
    ///
    /// This is a lightweight check that validates that the API root is
    /// reachable and that the token is accepted.
    pub async fn get_user(&self, api_url: &Url, access_token: &str) -> Result<UserResponse, ApiError> {
        debug!("Validating token against {}", api_url);
        let url = Self::build_url(api_url, &["user"])?;
        self.get_json(url, access_token, VALIDATION_TIMEOUT_SECS)
            .await
    }
}
