//! Read path: browsing a branch as a hierarchy and reading single files.

use tracing::{debug, warn};

use crate::domain::{RepositoryRef, TreeNode};
use crate::error::SyncError;
use crate::tree;

use super::refs::resolve_branch;
use super::validate::normalize_path;
use super::GitRemote;

/// The branch's files as a sorted hierarchy.
///
/// An empty repository yields an empty list.
pub async fn fetch_tree<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
) -> Result<Vec<TreeNode>, SyncError> {
    let resolved = resolve_branch(remote, repo).await?;
    let Some(tree_id) = resolved.base_tree else {
        return Ok(Vec::new());
    };

    let listing = remote.list_tree(repo, &tree_id).await?;
    if listing.truncated {
        warn!(
            "Listing of {}@{} was truncated after {} entries; the tree is partial",
            repo,
            resolved.branch,
            listing.records.len()
        );
    }
    debug!("Building tree from {} records", listing.records.len());

    Ok(tree::build(&listing.records)?)
}

/// Raw bytes of one file on the branch.
pub async fn fetch_file_content<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    path: &str,
) -> Result<Vec<u8>, SyncError> {
    let path = normalize_path(path)?;
    let resolved = resolve_branch(remote, repo).await?;
    let Some(head) = resolved.head else {
        return Err(SyncError::NotFound(format!(
            "{} in {} (repository has no commits)",
            path, repo
        )));
    };

    remote.file_content(repo, &head, &path).await
}
