//! Branch resolution and ref updates.
//!
//! Resolution is a small state machine: the requested branch, else the
//! repository's default branch, else an empty repository. The result is
//! captured once per operation; ref updates compare against it.

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{CommitId, RepositoryRef, TreeId};
use crate::error::SyncError;

use super::{BranchLookup, GitRemote};

/// How the branch in a [`ResolvedBranch`] was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BranchState {
    /// The requested branch exists.
    Named,
    /// The requested branch does not exist; the default branch was used.
    Fallback { requested: String },
    /// The repository has no commits.
    Empty,
}

/// Branch a write will land on, with its head as seen at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBranch {
    pub branch: String,
    pub head: Option<CommitId>,
    pub base_tree: Option<TreeId>,
    pub state: BranchState,
}

impl ResolvedBranch {
    fn empty(branch: &str) -> Self {
        Self {
            branch: branch.to_string(),
            head: None,
            base_tree: None,
            state: BranchState::Empty,
        }
    }
}

/// Resolve `repo.branch` to a head commit and its tree.
pub async fn resolve_branch<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
) -> Result<ResolvedBranch, SyncError> {
    let requested = repo.branch.as_str();

    let (branch, head, state) = match remote.branch_head(repo, requested).await? {
        BranchLookup::Found(head) => (requested.to_string(), head, BranchState::Named),
        BranchLookup::RepositoryEmpty => {
            info!("{} has no commits yet", repo);
            return Ok(ResolvedBranch::empty(requested));
        }
        BranchLookup::Missing => {
            let default = remote.default_branch(repo).await?;
            if default == requested {
                return Err(SyncError::NotFound(format!(
                    "branch {} of {}",
                    requested, repo
                )));
            }

            match remote.branch_head(repo, &default).await? {
                BranchLookup::Found(head) => {
                    info!(
                        "Branch {} not found in {}, falling back to {}",
                        requested, repo, default
                    );
                    let state = BranchState::Fallback {
                        requested: requested.to_string(),
                    };
                    (default, head, state)
                }
                BranchLookup::RepositoryEmpty => return Ok(ResolvedBranch::empty(requested)),
                BranchLookup::Missing => {
                    return Err(SyncError::NotFound(format!(
                        "neither {} nor default branch {} exist in {}",
                        requested, default, repo
                    )))
                }
            }
        }
    };

    let base_tree = remote.commit_tree(repo, &head).await?;
    debug!("Resolved {}@{} -> {} (tree {})", repo, branch, head, base_tree);

    Ok(ResolvedBranch {
        branch,
        head: Some(head),
        base_tree: Some(base_tree),
        state,
    })
}

/// Point `branch` at `commit`.
///
/// With a `previous` head the existing ref is fast-forwarded and the move
/// is rejected if the branch no longer points there; without one the ref
/// is created.
pub async fn update_branch<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    branch: &str,
    commit: &CommitId,
    previous: Option<&CommitId>,
) -> Result<(), SyncError> {
    match previous {
        Some(previous) => remote.move_ref(repo, branch, commit, previous).await?,
        None => remote.create_ref(repo, branch, commit).await?,
    }
    info!("🔀 {}@{} -> {}", repo, branch, commit);
    Ok(())
}

/// Commit a placeholder on `branch` so an empty repository accepts objects.
pub async fn initialize_branch<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    branch: &str,
) -> Result<CommitId, SyncError> {
    let placeholder = remote.initialize(repo, branch).await?;
    info!("🌱 Initialized {}@{} with placeholder {}", repo, branch, placeholder);
    Ok(placeholder)
}

/// Point `branch` at a first commit in place of its placeholder.
///
/// Fails with [`SyncError::Conflict`] if anything moved the branch off the
/// placeholder in the meantime.
pub async fn replace_placeholder<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    branch: &str,
    commit: &CommitId,
    placeholder: &CommitId,
) -> Result<(), SyncError> {
    remote.replace_ref(repo, branch, commit, placeholder).await?;
    info!("🔀 {}@{} -> {} (first commit)", repo, branch, commit);
    Ok(())
}
