//! Error taxonomy of the sync engine.
//!
//! `ValidationError` is always local and never worth retrying. `SyncError`
//! is what every engine operation returns; `DeployError` adds the stage a
//! deploy failed in.

use std::fmt;

use thiserror::Error;

use crate::api::{ApiError, ApiStatus};

/// A malformed path, change or argument, caught before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("path is empty")]
    EmptyPath,
    #[error("malformed path `{path}`: {reason}")]
    MalformedPath { path: String, reason: &'static str },
    #[error("path `{0}` contains a `..` segment")]
    PathTraversal(String),
    #[error("`{0}` is marked for deletion but carries content")]
    ContentOnDelete(String),
    #[error("`{0}` is created or updated without content")]
    MissingContent(String),
    #[error("`{0}` appears more than once")]
    DuplicatePath(String),
    #[error("`{0}` is listed both as a file and as a directory")]
    KindConflict(String),
    #[error("change-set is empty")]
    EmptyChangeSet,
    #[error("commit message is empty")]
    EmptyMessage,
    #[error("invalid repository `{0}`, expected owner/name[@branch]")]
    InvalidRepository(String),
}

impl ValidationError {
    /// The offending path, when the error is about one.
    pub fn path(&self) -> Option<&str> {
        match self {
            ValidationError::MalformedPath { path, .. } => Some(path),
            ValidationError::PathTraversal(path)
            | ValidationError::ContentOnDelete(path)
            | ValidationError::MissingContent(path)
            | ValidationError::DuplicatePath(path)
            | ValidationError::KindConflict(path) => Some(path),
            _ => None,
        }
    }
}

/// Pipeline stage of a deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Validate,
    ResolveRef,
    CreateBlobs,
    ComposeTree,
    ComposeCommit,
    UpdateRef,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::ResolveRef => "resolve-ref",
            Stage::CreateBlobs => "create-blobs",
            Stage::ComposeTree => "compose-tree",
            Stage::ComposeCommit => "compose-commit",
            Stage::UpdateRef => "update-ref",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One content group whose blob upload failed.
#[derive(Debug)]
pub struct BlobFailure {
    /// Every path that shared the failed payload.
    pub paths: Vec<String>,
    pub error: SyncError,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("branch `{branch}` moved since it was resolved; re-run against the new head")]
    Conflict { branch: String },

    #[error(transparent)]
    Remote(ApiError),

    #[error("{stage} stage exceeded the deadline")]
    Timeout { stage: Stage },

    #[error("{} blob upload(s) failed: {}", .failures.len(), summarize(.failures))]
    BlobUploads { failures: Vec<BlobFailure> },
}

fn summarize(failures: &[BlobFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.paths.join(", "), f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl SyncError {
    /// Whether re-running the same call could succeed without changing it.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Conflict { .. } | SyncError::Timeout { .. } => true,
            SyncError::Remote(api_error) => api_error.is_retryable(),
            SyncError::BlobUploads { failures } => failures.iter().all(|f| f.error.is_retryable()),
            SyncError::Validation(_) | SyncError::Auth(_) | SyncError::NotFound(_) => false,
        }
    }
}

impl From<ApiError> for SyncError {
    fn from(error: ApiError) -> Self {
        match error.status {
            ApiStatus::Unauthenticated | ApiStatus::PermissionDenied => {
                SyncError::Auth(error.message)
            }
            ApiStatus::NotFound => SyncError::NotFound(error.message),
            _ => SyncError::Remote(error),
        }
    }
}

/// Failure of a deploy, tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("deploy failed during {stage}: {source}")]
pub struct DeployError {
    pub stage: Stage,
    #[source]
    pub source: SyncError,
}

impl DeployError {
    pub fn new(stage: Stage, source: impl Into<SyncError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_classification() {
        let auth: SyncError = ApiError::from_http_response(401, String::new(), None, false).into();
        assert!(matches!(auth, SyncError::Auth(_)));

        let missing: SyncError =
            ApiError::from_http_response(404, String::new(), None, false).into();
        assert!(matches!(missing, SyncError::NotFound(_)));

        let limited: SyncError = ApiError::from_http_response(403, String::new(), None, true).into();
        assert!(matches!(limited, SyncError::Remote(_)));
        assert!(limited.is_retryable());
    }

    #[test]
    fn test_blob_failures_listed_in_message() {
        let err = SyncError::BlobUploads {
            failures: vec![BlobFailure {
                paths: vec!["a.txt".into(), "b.txt".into()],
                error: SyncError::NotFound("blob endpoint".into()),
            }],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("1 blob upload(s) failed"));
        assert!(msg.contains("a.txt, b.txt"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_deploy_error_names_stage() {
        let err = DeployError::new(
            Stage::UpdateRef,
            SyncError::Conflict {
                branch: "main".into(),
            },
        );
        assert_eq!(err.stage, Stage::UpdateRef);
        assert!(err.to_string().starts_with("deploy failed during update-ref"));
    }

    #[test]
    fn test_validation_error_path() {
        assert_eq!(
            ValidationError::DuplicatePath("a.md".into()).path(),
            Some("a.md")
        );
        assert_eq!(ValidationError::EmptyChangeSet.path(), None);
    }
}
