//! Authenticated API client with stored credentials.
//!
//! `AuthenticatedClient` wraps `ApiClient` together with the API root and the
//! access token, and is the GitHub implementation of [`GitRemote`].
//!
//! Benefits:
//! - No need to pass credentials to every API call
//! - HTTP/2 connection reuse (same Client instance = connection pooling)
//! - The sync engine only sees the `GitRemote` trait

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use super::client::ApiClient;
use super::contents::decode_base64;
use super::types::{
    ApiError, ApiStatus, ContentsResponse, PutContentsRequest, TreeEntryRequest, UserResponse,
};
use crate::domain::{
    CommitId, CommitRef, ObjectId, PathRecord, RepositoryRef, TreeId, TreeOverlayEntry,
    FILE_MODE, PLACEHOLDER_MESSAGE, PLACEHOLDER_PATH,
};
use crate::error::SyncError;
use crate::sync::{BranchLookup, GitRemote, TreeListing};

/// Authenticated API client with stored credentials.
///
/// Created once per command after credentials are loaded, then passed to
/// every engine operation that needs the remote.
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<ApiClient>,
    api_url: Url,
    access_token: String,
}

impl AuthenticatedClient {
    /// Create a new authenticated client.
    ///
    /// # Arguments
    /// * `api_url` - API root, e.g. `https://api.github.com/`
    /// * `access_token` - Bearer token
    pub fn new(api_url: Url, access_token: String) -> Self {
        Self::from_client(ApiClient::new(None), api_url, access_token)
    }

    /// Create from an existing ApiClient (for testing or custom configuration).
    pub fn from_client(client: ApiClient, api_url: Url, access_token: String) -> Self {
        Self {
            inner: Arc::new(client),
            api_url,
            access_token,
        }
    }

    /// Get the API root.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Get the access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The account the token belongs to.
    pub async fn current_user(&self) -> Result<UserResponse, ApiError> {
        self.inner.get_user(&self.api_url, &self.access_token).await
    }
}

/// A rejected ref write means someone else moved or created the branch.
fn ref_write_error(error: ApiError, branch: &str) -> SyncError {
    match error.status {
        ApiStatus::Unprocessable | ApiStatus::Conflict => {
            debug!("Ref write rejected (HTTP {:?}): {}", error.http_status, error.message);
            SyncError::Conflict {
                branch: branch.to_string(),
            }
        }
        _ => error.into(),
    }
}

impl GitRemote for AuthenticatedClient {
    async fn default_branch(&self, repo: &RepositoryRef) -> Result<String, SyncError> {
        let repository = self
            .inner
            .get_repository(&self.api_url, &self.access_token, repo)
            .await?;
        Ok(repository.default_branch)
    }

    async fn branch_head(
        &self,
        repo: &RepositoryRef,
        branch: &str,
    ) -> Result<BranchLookup, SyncError> {
        match self
            .inner
            .get_branch_ref(&self.api_url, &self.access_token, repo, branch)
            .await
        {
            Ok(reference) => {
                debug!("{} -> {}", reference.name, reference.object.sha);
                Ok(BranchLookup::Found(CommitId::new(reference.object.sha)))
            }
            Err(e) if e.status == ApiStatus::NotFound => Ok(BranchLookup::Missing),
            // "Git Repository is empty."
            Err(e) if e.status == ApiStatus::Conflict => Ok(BranchLookup::RepositoryEmpty),
            Err(e) => Err(e.into()),
        }
    }

    async fn commit_tree(
        &self,
        repo: &RepositoryRef,
        commit: &CommitId,
    ) -> Result<TreeId, SyncError> {
        let commit = self
            .inner
            .get_commit(&self.api_url, &self.access_token, repo, commit.as_str())
            .await?;
        Ok(TreeId::new(commit.tree.sha))
    }

    async fn initialize(&self, repo: &RepositoryRef, branch: &str) -> Result<CommitId, SyncError> {
        let body = PutContentsRequest::new(PLACEHOLDER_MESSAGE, b"", branch);
        let written = self
            .inner
            .put_contents(&self.api_url, &self.access_token, repo, PLACEHOLDER_PATH, &body)
            .await
            .map_err(|e| ref_write_error(e, branch))?;

        let commit = written.commit;
        if !commit.parents.is_empty() {
            // Someone else committed first; our file now sits on top of their history.
            warn!(
                "{} gained history before it was initialized; {} was added on top of {}",
                repo, PLACEHOLDER_PATH, branch
            );
            return Err(SyncError::Conflict {
                branch: branch.to_string(),
            });
        }

        debug!("Initialized {} with placeholder commit {}", repo, commit.sha);
        Ok(CommitId::new(commit.sha))
    }

    async fn create_blob(
        &self,
        repo: &RepositoryRef,
        content: &[u8],
    ) -> Result<ObjectId, SyncError> {
        let blob = self
            .inner
            .create_blob(&self.api_url, &self.access_token, repo, content)
            .await?;
        Ok(ObjectId::new(blob.sha))
    }

    async fn create_tree(
        &self,
        repo: &RepositoryRef,
        base: Option<&TreeId>,
        entries: &[TreeOverlayEntry],
    ) -> Result<TreeId, SyncError> {
        let tree = entries
            .iter()
            .map(|entry| TreeEntryRequest {
                path: entry.path.clone(),
                mode: FILE_MODE,
                kind: "blob",
                sha: entry.object.as_ref().map(|id| id.as_str().to_string()),
            })
            .collect();

        let created = self
            .inner
            .create_tree(
                &self.api_url,
                &self.access_token,
                repo,
                base.map(TreeId::as_str),
                tree,
            )
            .await?;
        Ok(TreeId::new(created.sha))
    }

    async fn create_commit(
        &self,
        repo: &RepositoryRef,
        tree: &TreeId,
        parent: Option<&CommitId>,
        message: &str,
    ) -> Result<CommitRef, SyncError> {
        let parents = parent.map(|p| p.as_str().to_string()).into_iter().collect();
        let commit = self
            .inner
            .create_commit(
                &self.api_url,
                &self.access_token,
                repo,
                message,
                tree.as_str(),
                parents,
            )
            .await?;

        debug!(
            "Created commit {} on tree {} with {} parent(s)",
            commit.sha,
            commit.tree.sha,
            commit.parents.len()
        );

        let url = commit
            .html_url
            .or(commit.url)
            .unwrap_or_else(|| format!("https://github.com/{}/commit/{}", repo, commit.sha));
        Ok(CommitRef {
            id: CommitId::new(commit.sha),
            url,
        })
    }

    async fn move_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
        previous: &CommitId,
    ) -> Result<(), SyncError> {
        // GitHub enforces the compare-and-swap itself: with force=false a ref
        // that no longer has `previous` as an ancestor of `commit` is rejected.
        debug!("Moving {} from {} to {}", branch, previous, commit);
        self.inner
            .update_branch_ref(
                &self.api_url,
                &self.access_token,
                repo,
                branch,
                commit.as_str(),
                false,
            )
            .await
            .map(|_| ())
            .map_err(|e| ref_write_error(e, branch))
    }

    async fn replace_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
        previous: &CommitId,
    ) -> Result<(), SyncError> {
        // GitHub has no conditional forced update; check the head right before writing.
        let current = self
            .inner
            .get_branch_ref(&self.api_url, &self.access_token, repo, branch)
            .await?;
        if current.object.sha != previous.as_str() {
            debug!("{} is at {}, expected {}", branch, current.object.sha, previous);
            return Err(SyncError::Conflict {
                branch: branch.to_string(),
            });
        }

        debug!("Replacing {} ({}) with {}", branch, previous, commit);
        self.inner
            .update_branch_ref(
                &self.api_url,
                &self.access_token,
                repo,
                branch,
                commit.as_str(),
                true,
            )
            .await
            .map(|_| ())
            .map_err(|e| ref_write_error(e, branch))
    }

    async fn create_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
    ) -> Result<(), SyncError> {
        self.inner
            .create_branch_ref(
                &self.api_url,
                &self.access_token,
                repo,
                branch,
                commit.as_str(),
            )
            .await
            .map(|_| ())
            .map_err(|e| ref_write_error(e, branch))
    }

    async fn list_tree(
        &self,
        repo: &RepositoryRef,
        tree: &TreeId,
    ) -> Result<TreeListing, SyncError> {
        let listing = self
            .inner
            .get_tree_recursive(&self.api_url, &self.access_token, repo, tree.as_str())
            .await?;

        let records = listing
            .tree
            .into_iter()
            .map(|entry| match entry.kind.as_str() {
                "tree" => PathRecord::directory(entry.path),
                "blob" => PathRecord::file(entry.path, entry.size),
                // Submodules ("commit") are shown as leaves.
                _ => PathRecord::new(entry.path),
            })
            .collect();

        Ok(TreeListing {
            records,
            truncated: listing.truncated,
        })
    }

    async fn file_content(
        &self,
        repo: &RepositoryRef,
        commit: &CommitId,
        path: &str,
    ) -> Result<Vec<u8>, SyncError> {
        let response = self
            .inner
            .get_contents(&self.api_url, &self.access_token, repo, path, commit.as_str())
            .await?;

        let file = match response {
            ContentsResponse::File(file) if file.kind == "file" => file,
            ContentsResponse::File(other) => {
                return Err(SyncError::NotFound(format!(
                    "{} is a {}, not a file",
                    path, other.kind
                )))
            }
            ContentsResponse::Directory(entries) => {
                return Err(SyncError::NotFound(format!(
                    "{} is a directory ({} entries)",
                    path,
                    entries.len()
                )))
            }
        };

        match (file.encoding.as_deref(), file.content) {
            (Some("base64"), Some(content)) => Ok(decode_base64(&content)?),
            // Files above the contents endpoint's size limit come back without
            // content; the blob endpoint serves them in full.
            _ => {
                warn!("{} is too large for the contents endpoint, fetching blob {}", path, file.sha);
                let blob = self
                    .inner
                    .get_blob(&self.api_url, &self.access_token, repo, &file.sha)
                    .await?;
                match blob.encoding.as_str() {
                    "base64" => Ok(decode_base64(&blob.content)?),
                    _ => Ok(blob.content.into_bytes()),
                }
            }
        }
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("api_url", &self.api_url.as_str())
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
