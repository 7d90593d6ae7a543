use std::future::Future;

use crate::domain::{
    CommitId, CommitRef, ObjectId, PathRecord, RepositoryRef, TreeId, TreeOverlayEntry,
};
use crate::error::SyncError;

/// What a branch lookup found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchLookup {
    /// The branch exists and points at this commit.
    Found(CommitId),
    /// The repository has commits, but not on this branch.
    Missing,
    /// The repository has no commits at all.
    RepositoryEmpty,
}

/// Flat recursive listing of a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeListing {
    pub records: Vec<PathRecord>,
    /// The remote stopped listing before the end.
    pub truncated: bool,
}

/// The content-addressed object store behind a repository.
///
/// Every engine operation takes its remote as an argument; nothing reaches
/// for a shared client. All methods are single remote round trips.
pub trait GitRemote: Send + Sync {
    /// Name of the branch the repository is configured to default to.
    fn default_branch(
        &self,
        repo: &RepositoryRef,
    ) -> impl Future<Output = Result<String, SyncError>> + Send;

    /// Head commit of `branch`.
    fn branch_head(
        &self,
        repo: &RepositoryRef,
        branch: &str,
    ) -> impl Future<Output = Result<BranchLookup, SyncError>> + Send;

    /// Root tree of a commit.
    fn commit_tree(
        &self,
        repo: &RepositoryRef,
        commit: &CommitId,
    ) -> impl Future<Output = Result<TreeId, SyncError>> + Send;

    /// Give a repository without commits a placeholder first commit on
    /// `branch` and return it.
    ///
    /// An empty repository refuses blob, tree and commit writes until
    /// something has been committed through another route. Fails with
    /// [`SyncError::Conflict`] if the repository turned out to have history.
    fn initialize(
        &self,
        repo: &RepositoryRef,
        branch: &str,
    ) -> impl Future<Output = Result<CommitId, SyncError>> + Send;

    /// Store one payload. Identical bytes yield the same id.
    fn create_blob(
        &self,
        repo: &RepositoryRef,
        content: &[u8],
    ) -> impl Future<Output = Result<ObjectId, SyncError>> + Send;

    /// `base` with exactly `entries` overlaid; everything else preserved.
    fn create_tree(
        &self,
        repo: &RepositoryRef,
        base: Option<&TreeId>,
        entries: &[TreeOverlayEntry],
    ) -> impl Future<Output = Result<TreeId, SyncError>> + Send;

    fn create_commit(
        &self,
        repo: &RepositoryRef,
        tree: &TreeId,
        parent: Option<&CommitId>,
        message: &str,
    ) -> impl Future<Output = Result<CommitRef, SyncError>> + Send;

    /// Fast-forward an existing branch from `previous` to `commit`.
    ///
    /// Fails with [`SyncError::Conflict`] when the branch no longer points
    /// at `previous`.
    fn move_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
        previous: &CommitId,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Point `branch` at `commit` even when `commit` does not descend from
    /// `previous`. Used once per repository, to drop the placeholder commit
    /// left by [`initialize`](Self::initialize).
    ///
    /// Fails with [`SyncError::Conflict`] when the branch no longer points
    /// at `previous`.
    fn replace_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
        previous: &CommitId,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Create a branch. Fails with [`SyncError::Conflict`] if it already exists.
    fn create_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    fn list_tree(
        &self,
        repo: &RepositoryRef,
        tree: &TreeId,
    ) -> impl Future<Output = Result<TreeListing, SyncError>> + Send;

    /// Bytes of the file at `path` as of `commit`. Directories are `NotFound`.
    fn file_content(
        &self,
        repo: &RepositoryRef,
        commit: &CommitId,
        path: &str,
    ) -> impl Future<Output = Result<Vec<u8>, SyncError>> + Send;
}
