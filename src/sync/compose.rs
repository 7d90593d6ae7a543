//! Tree and commit composition.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::domain::{
    BlobRef, ChangeSet, CommitId, CommitRef, FileChange, RepositoryRef, TreeId, TreeOverlayEntry,
};
use crate::error::{SyncError, ValidationError};

use super::GitRemote;

/// One overlay entry per change, in change-set order.
pub fn overlay_entries(
    changes: &ChangeSet,
    blobs: &[BlobRef],
) -> Result<Vec<TreeOverlayEntry>, SyncError> {
    let by_path: HashMap<&str, &BlobRef> = blobs.iter().map(|b| (b.path.as_str(), b)).collect();

    changes
        .iter()
        .map(|change| match change {
            FileChange::Delete { path } => Ok(TreeOverlayEntry::delete(path.as_str())),
            FileChange::Create { path, .. } | FileChange::Update { path, .. } => by_path
                .get(path.as_str())
                .map(|blob| TreeOverlayEntry::upsert(path.as_str(), blob.object_id.clone()))
                .ok_or_else(|| SyncError::NotFound(format!("no blob uploaded for {}", path))),
        })
        .collect()
}

/// Create the tree `base` becomes after applying `changes`.
///
/// Exactly one remote call; paths not named in `changes` keep whatever
/// `base` had for them.
pub async fn compose_tree<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    base: Option<&TreeId>,
    changes: &ChangeSet,
    blobs: &[BlobRef],
) -> Result<TreeId, SyncError> {
    if base.is_none() {
        if let Some(path) = changes.deletions().next() {
            return Err(SyncError::NotFound(format!(
                "cannot delete {} from a repository without commits",
                path
            )));
        }
    }

    let entries = overlay_entries(changes, blobs)?;
    debug!(
        "Composing tree on {} with {} entries",
        base.map(TreeId::as_str).unwrap_or("<none>"),
        entries.len()
    );

    let tree = remote.create_tree(repo, base, &entries).await?;
    info!("🌳 Created tree {}", tree);
    Ok(tree)
}

/// Record `tree` as a new commit on top of `parent`.
pub async fn compose_commit<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    tree: &TreeId,
    parent: Option<&CommitId>,
    message: &str,
) -> Result<CommitRef, SyncError> {
    if message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage.into());
    }

    let commit = remote.create_commit(repo, tree, parent, message).await?;
    info!(
        "📝 Created commit {} (parent: {})",
        commit.id,
        parent.map(CommitId::as_str).unwrap_or("none")
    );
    Ok(commit)
}
