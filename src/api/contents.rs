//! Contents endpoints: recursive tree listings, file contents, and the one
//! write that works on an empty repository.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use url::Url;

use super::client::{ApiClient, DEFAULT_TIMEOUT_SECS};
use super::types::{
    ApiError, BlobResponse, ContentsResponse, PutContentsRequest, PutContentsResponse,
    TreeListingResponse,
};
use crate::domain::RepositoryRef;

/// Recursive listings of large repositories can take a while to render
const TREE_LISTING_TIMEOUT_SECS: u64 = 120;

/// Decode the base64 GitHub sends, which is wrapped at 60 columns.
pub(super) fn decode_base64(content: &str) -> Result<Vec<u8>, ApiError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ApiError::decode("base64 content", e))
}

impl PutContentsRequest {
    pub(super) fn new(message: &str, content: &[u8], branch: &str) -> Self {
        Self {
            message: message.to_string(),
            content: STANDARD.encode(content),
            branch: branch.to_string(),
        }
    }
}

impl ApiClient {
    /// Every path reachable from a tree, one level of nesting per entry.
    pub(super) async fn get_tree_recursive(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        tree_sha: &str,
    ) -> Result<TreeListingResponse, ApiError> {
        let mut url = Self::repo_url(api_url, repo, &["git", "trees", tree_sha])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        self.get_json(url, access_token, TREE_LISTING_TIMEOUT_SECS)
            .await
    }

    /// File or directory at `path` as of `git_ref`.
    pub(super) async fn get_contents(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        path: &str,
        git_ref: &str,
    ) -> Result<ContentsResponse, ApiError> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/'));
        let mut url = Self::repo_url(api_url, repo, &segments)?;
        url.query_pairs_mut().append_pair("ref", git_ref);
        self.get_json(url, access_token, DEFAULT_TIMEOUT_SECS).await
    }

    /// Commit a new file at `path`, as described by `body`.
    pub(super) async fn put_contents(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        path: &str,
        body: &PutContentsRequest,
    ) -> Result<PutContentsResponse, ApiError> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/'));
        let url = Self::repo_url(api_url, repo, &segments)?;
        self.send_json(Method::PUT, url, access_token, body).await
    }

    /// Raw blob, used when a file is too large for the contents endpoint.
    pub(super) async fn get_blob(
        &self,
        api_url: &Url,
        access_token: &str,
        repo: &RepositoryRef,
        sha: &str,
    ) -> Result<BlobResponse, ApiError> {
        let url = Self::repo_url(api_url, repo, &["git", "blobs", sha])?;
        self.get_json(url, access_token, TREE_LISTING_TIMEOUT_SECS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_base64() {
        assert_eq!(decode_base64("aGVs\nbG8=\n").unwrap(), b"hello");
    }

    #[test]
    fn test_put_contents_body() {
        let body = PutContentsRequest::new("Initialize repository", b"", "main");
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"message": "Initialize repository", "content": "", "branch": "main"})
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_base64("not base64!").is_err());
    }
}
