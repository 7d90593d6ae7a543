//! GitHub API request and response types.
//!
//! Wire shapes of the Git Data, Contents and Repository endpoints, plus the
//! structured error every API call returns.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

// ============================================================================
// Repository / Refs
// ============================================================================

/// Repository metadata (only what the resolver needs)
#[derive(Debug, Deserialize)]
pub(super) struct RepositoryResponse {
    pub default_branch: String,
}

/// Pointer to a git object inside a larger response
#[derive(Debug, Clone, Deserialize)]
pub(super) struct GitObjectRef {
    pub sha: String,
}

/// `GET /git/ref/heads/{branch}` and ref mutation responses
#[derive(Debug, Deserialize)]
pub(super) struct RefResponse {
    #[serde(rename = "ref")]
    pub name: String,
    pub object: GitObjectRef,
}

/// Move an existing branch; `force: false` makes GitHub reject non-fast-forwards
#[derive(Debug, Serialize)]
pub(super) struct UpdateRefRequest {
    pub sha: String,
    pub force: bool,
}

/// Create a branch
#[derive(Debug, Serialize)]
pub(super) struct CreateRefRequest {
    #[serde(rename = "ref")]
    pub name: String,
    pub sha: String,
}

// ============================================================================
// Blobs / Trees / Commits
// ============================================================================

/// Blob upload body
#[derive(Debug, Serialize)]
pub(super) struct CreateBlobRequest {
    pub content: String,
    pub encoding: &'static str,
}

/// Any create call that only answers with the new object's sha
#[derive(Debug, Deserialize)]
pub(super) struct ShaResponse {
    pub sha: String,
}

/// One overlay entry of a tree creation. `sha: None` serializes as `null`,
/// which removes the path from the base tree.
#[derive(Debug, Serialize)]
pub(super) struct TreeEntryRequest {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub sha: Option<String>,
}

/// Tree creation body
#[derive(Debug, Serialize)]
pub(super) struct CreateTreeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_tree: Option<String>,
    pub tree: Vec<TreeEntryRequest>,
}

/// Commit creation body
#[derive(Debug, Serialize)]
pub(super) struct CreateCommitRequest {
    pub message: String,
    pub tree: String,
    pub parents: Vec<String>,
}

/// Commit object as returned by get/create commit
#[derive(Debug, Deserialize)]
pub(super) struct CommitResponse {
    pub sha: String,
    pub tree: GitObjectRef,
    #[serde(default)]
    pub parents: Vec<GitObjectRef>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

// ============================================================================
// Listings / Contents
// ============================================================================

/// One entry of a recursive tree listing
#[derive(Debug, Deserialize)]
pub(super) struct TreeListingEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// `GET /git/trees/{sha}?recursive=1`
#[derive(Debug, Deserialize)]
pub(super) struct TreeListingResponse {
    pub tree: Vec<TreeListingEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// A single entry answered by the contents endpoint
#[derive(Debug, Deserialize)]
pub(super) struct ContentFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// The contents endpoint answers a file with an object and a directory with an array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ContentsResponse {
    File(ContentFile),
    Directory(Vec<IgnoredAny>),
}

/// `PUT /contents/{path}` body. Works on an empty repository, unlike the Git Data endpoints.
#[derive(Debug, Serialize)]
pub(super) struct PutContentsRequest {
    pub message: String,
    pub content: String,
    pub branch: String,
}

/// `PUT /contents/{path}` answer; only the commit it made is used
#[derive(Debug, Deserialize)]
pub(super) struct PutContentsResponse {
    pub commit: CommitResponse,
}

/// `GET /git/blobs/{sha}`
#[derive(Debug, Deserialize)]
pub(super) struct BlobResponse {
    pub content: String,
    pub encoding: String,
}

/// `GET /user`
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub login: String,
}

/// GitHub error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// API Status Codes
// ============================================================================

/// Classification of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    /// Success
    Ok,
    /// Malformed request (400)
    InvalidArgument,
    /// Missing or invalid token (401) - FATAL
    Unauthenticated,
    /// Token lacks access (403) - FATAL
    PermissionDenied,
    /// Repository, ref or path does not exist (404)
    NotFound,
    /// Repository state forbids the call, e.g. an empty repository (409)
    Conflict,
    /// Request understood but rejected, e.g. a non-fast-forward ref update (422)
    Unprocessable,
    /// Rate limit exceeded (429, or 403 with an exhausted quota) - retryable
    ResourceExhausted,
    /// Request or gateway timeout - retryable
    Timeout,
    /// Server error - retryable
    Unavailable,
    /// No HTTP response at all (DNS, connect, TLS) - retryable
    Transport,
    /// Anything else, including unparseable responses
    Unknown,
}

impl ApiStatus {
    /// Convert from HTTP status code to internal API status
    pub fn from_http_status(http_status: u16) -> Self {
        match http_status {
            200..=299 => ApiStatus::Ok,
            400 => ApiStatus::InvalidArgument,
            401 => ApiStatus::Unauthenticated,
            403 => ApiStatus::PermissionDenied,
            404 => ApiStatus::NotFound,
            408 | 504 => ApiStatus::Timeout,
            409 => ApiStatus::Conflict,
            422 => ApiStatus::Unprocessable,
            429 => ApiStatus::ResourceExhausted,
            500..=599 => ApiStatus::Unavailable,
            _ => ApiStatus::Unknown,
        }
    }

    /// Check if this error is fatal (requires user action, cannot continue)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ApiStatus::Unauthenticated | ApiStatus::PermissionDenied
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiStatus::ResourceExhausted
                | ApiStatus::Timeout
                | ApiStatus::Unavailable
                | ApiStatus::Transport
        )
    }

    /// Get the error message for this status
    pub fn error_message(&self) -> &'static str {
        match self {
            ApiStatus::Ok => "Success",
            ApiStatus::InvalidArgument => "Invalid request",
            ApiStatus::Unauthenticated => "Authentication failed",
            ApiStatus::PermissionDenied => "Permission denied",
            ApiStatus::NotFound => "Not found",
            ApiStatus::Conflict => "Repository state conflict",
            ApiStatus::Unprocessable => "Request rejected",
            ApiStatus::ResourceExhausted => "Rate limit exceeded",
            ApiStatus::Timeout => "Request timed out",
            ApiStatus::Unavailable => "Service temporarily unavailable",
            ApiStatus::Transport => "Network error",
            ApiStatus::Unknown => "Unknown error occurred",
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error_message())
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// API error with status code and details.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Classified status
    pub status: ApiStatus,
    /// HTTP status code, absent when no response arrived
    pub http_status: Option<u16>,
    /// Error message (GitHub's own message when it sent one)
    pub message: String,
    /// `x-github-request-id` (for debugging)
    pub request_id: Option<String>,
}

impl ApiError {
    /// Create from HTTP status code and response body.
    ///
    /// `quota_exhausted` is set when `x-ratelimit-remaining` was `0`; GitHub
    /// reports primary rate limits as 403, which must not read as an auth failure.
    pub fn from_http_response(
        http_status: u16,
        body: String,
        request_id: Option<String>,
        quota_exhausted: bool,
    ) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        let mut status = ApiStatus::from_http_status(http_status);
        if status == ApiStatus::PermissionDenied
            && (quota_exhausted || detail.to_lowercase().contains("rate limit"))
        {
            status = ApiStatus::ResourceExhausted;
        }

        let message = match status {
            ApiStatus::Unauthenticated => format!(
                "Authentication failed (HTTP {}). The token is missing, invalid or expired.",
                http_status
            ),
            ApiStatus::ResourceExhausted => format!(
                "Rate limit exceeded (HTTP {}). Please wait and try again.",
                http_status
            ),
            _ if detail.is_empty() => {
                format!("API error (HTTP {}): {}", http_status, status.error_message())
            }
            _ => format!("API error (HTTP {}): {}", http_status, detail),
        };

        Self {
            status,
            http_status: Some(http_status),
            message,
            request_id,
        }
    }

    /// A request that never produced a response.
    pub fn transport(err: &reqwest::Error, attempts: usize) -> Self {
        let status = if err.is_timeout() {
            ApiStatus::Timeout
        } else {
            ApiStatus::Transport
        };

        Self {
            status,
            http_status: None,
            message: format!("HTTP request failed after {} attempt(s): {}", attempts, err),
            request_id: None,
        }
    }

    /// A response whose body could not be understood.
    pub fn decode(what: &str, err: impl std::fmt::Display) -> Self {
        Self {
            status: ApiStatus::Unknown,
            http_status: None,
            message: format!("Failed to parse {}: {}", what, err),
            request_id: None,
        }
    }

    /// A URL that could not be built from the configured API base.
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::InvalidArgument,
            http_status: None,
            message: message.into(),
            request_id: None,
        }
    }

    /// Check if this error is fatal (requires user action)
    pub fn is_fatal(&self) -> bool {
        self.status.is_fatal()
    }

    /// Check if re-sending the same request could succeed
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    /// Get a hint message for the user
    pub fn user_hint(&self) -> &'static str {
        match self.status {
            ApiStatus::Unauthenticated => {
                "Run 'reposync login --token <TOKEN>' or set GITHUB_TOKEN."
            }
            ApiStatus::PermissionDenied => {
                "The token does not grant access to this repository. \
                 It needs the 'contents: write' permission to deploy."
            }
            ApiStatus::ResourceExhausted => {
                "You have exceeded the rate limit. Please wait a moment and try again."
            }
            ApiStatus::Unavailable | ApiStatus::Transport | ApiStatus::Timeout => {
                "GitHub is temporarily unreachable. Please try again later."
            }
            _ => "An unexpected error occurred. Re-run with --verbose for details.",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}
