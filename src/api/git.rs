//! Git Data endpoints: refs, commits, trees and blobs.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use url::Url;

use super::client::{ApiClient, DEFAULT_TIMEOUT_SECS};
use super::types::{
    ApiError, CommitResponse, CreateBlobRequest, CreateCommitRequest, CreateRefRequest,
    CreateTreeRequest, RefResponse, RepositoryResponse, ShaResponse, TreeEntryRequest,
    UpdateRefRequest,
};
use crate::domain::RepositoryRef;

/// `heads/feature/x` as separate path segments, so the slash is not encoded.
fn branch_segments<'a>(prefix: &[&'a str], branch: &'a str) -> Vec<&'a str> {
    let mut segments = prefix.to_vec();
    segments.extend(branch.split('/'));
    segments
}

impl ApiClient {
    /// Repository metadata, for its default branch.
    pub(super) async fn get_repository(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
    ) -> Result<RepositoryResponse, ApiError> {
        let url = Self::repo_url(api_url, repo, &[])?;
        self.get_json(url, access_token, DEFAULT_TIMEOUT_SECS).await
    }

    /// Exact lookup of `refs/heads/{branch}`.
    pub(super) async fn get_branch_ref(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        branch: &str,
    ) -> Result<RefResponse, ApiError> {
        let segments = branch_segments(&["git", "ref", "heads"], branch);
        let url = Self::repo_url(api_url, repo, &segments)?;
        self.get_json(url, access_token, DEFAULT_TIMEOUT_SECS).await
    }

    pub(super) async fn get_commit(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        sha: &str,
    ) -> Result<CommitResponse, ApiError> {
        let url = Self::repo_url(api_url, repo, &["git", "commits", sha])?;
        self.get_json(url, access_token, DEFAULT_TIMEOUT_SECS).await
    }

    /// Upload raw bytes as a blob. Base64 keeps binary payloads intact.
    pub(super) async fn create_blob(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        content: &[u8],
    ) -> Result<ShaResponse, ApiError> {
        let url = Self::repo_url(api_url, repo, &["git", "blobs"])?;
        let body = CreateBlobRequest {
            content: STANDARD.encode(content),
            encoding: "base64",
        };
        self.send_json(Method::POST, url, access_token, &body).await
    }

    pub(super) async fn create_tree(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        base_tree: Option<&str>,
        tree: Vec<TreeEntryRequest>,
    ) -> Result<ShaResponse, ApiError> {
        let url = Self::repo_url(api_url, repo, &["git", "trees"])?;
        let body = CreateTreeRequest {
            base_tree: base_tree.map(ToOwned::to_owned),
            tree,
        };
        self.send_json(Method::POST, url, access_token, &body).await
    }

    pub(super) async fn create_commit(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        message: &str,
        tree: &str,
        parents: Vec<String>,
    ) -> Result<CommitResponse, ApiError> {
        let url = Self::repo_url(api_url, repo, &["git", "commits"])?;
        let body = CreateCommitRequest {
            message: message.to_string(),
            tree: tree.to_string(),
            parents,
        };
        self.send_json(Method::POST, url, access_token, &body).await
    }

    /// Move `refs/heads/{branch}` to `sha`. Without `force` GitHub only
    /// accepts fast-forwards.
    pub(super) async fn update_branch_ref(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<RefResponse, ApiError> {
        let segments = branch_segments(&["git", "refs", "heads"], branch);
        let url = Self::repo_url(api_url, repo, &segments)?;
        let body = UpdateRefRequest {
            sha: sha.to_string(),
            force,
        };
        self.send_json(Method::PATCH, url, access_token, &body).await
    }

    pub(super) async fn create_branch_ref(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        branch: &str,
        sha: &str,
    ) -> Result<RefResponse, ApiError> {
        let url = Self::repo_url(api_url, repo, &["git", "refs"])?;
        let body = CreateRefRequest {
            name: format!("refs/heads/{}", branch),
            sha: sha.to_string(),
        };
        self.send_json(Method::POST, url, access_token, &body).await
    }
}
