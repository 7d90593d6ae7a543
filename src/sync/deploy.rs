//! Change-set deployment.
//!
//! One deploy is one commit:
//! 1. Validate the change-set and message (no remote calls)
//! 2. Resolve the target branch once; an empty repository gets a
//!    placeholder commit so it accepts objects
//! 3. Upload blobs (the only parallel stage)
//! 4. Compose one tree and one commit
//! 5. Move the branch ref (or swap out the placeholder)
//!
//! The branch only moves in the last step, so dropping the future or
//! failing earlier leaves the repository unchanged apart from unreferenced
//! objects.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{timeout_at, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::{CommitId, RawChange, RepositoryRef};
use crate::error::{DeployError, Stage, SyncError, ValidationError};

use super::blobs::{create_blobs, DEFAULT_BLOB_CONCURRENCY};
use super::compose::{compose_commit, compose_tree};
use super::refs::{
    initialize_branch, replace_placeholder, resolve_branch, update_branch, BranchState,
};
use super::validate::normalize;
use super::GitRemote;

/// Tuning for a single deploy.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Maximum blob uploads in flight.
    pub concurrency: usize,
    /// Deadline for the whole deploy, measured from the call.
    pub timeout: Option<Duration>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_BLOB_CONCURRENCY,
            timeout: None,
        }
    }
}

/// A deploy that landed.
#[derive(Debug, Clone, Serialize)]
pub struct DeployOutcome {
    pub commit_id: CommitId,
    pub commit_url: String,
    /// Branch that moved. Differs from the requested one after a fallback.
    pub branch: String,
    pub branch_state: BranchState,
    pub parent: Option<CommitId>,
    pub files_changed: usize,
    /// Distinct blobs created; identical payloads count once.
    pub blobs_uploaded: usize,
    pub completed_at: DateTime<Utc>,
}

/// Await one stage under the deploy deadline, tagging any failure with it.
async fn run_stage<T, F>(stage: Stage, deadline: Option<Instant>, fut: F) -> Result<T, DeployError>
where
    F: Future<Output = Result<T, SyncError>>,
{
    let result = match deadline {
        Some(deadline) => match timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout { stage }),
        },
        None => fut.await,
    };
    result.map_err(|e| DeployError::new(stage, e))
}

/// Apply `changes` to `repo` as a single commit with `message`.
pub async fn deploy<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    changes: &[RawChange],
    message: &str,
    options: &DeployOptions,
) -> Result<DeployOutcome, DeployError> {
    let span = info_span!(
        "deploy",
        id = %Uuid::new_v4(),
        repo = %repo,
        branch = %repo.branch
    );
    deploy_inner(remote, repo, changes, message, options)
        .instrument(span)
        .await
}

async fn deploy_inner<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    changes: &[RawChange],
    message: &str,
    options: &DeployOptions,
) -> Result<DeployOutcome, DeployError> {
    let deadline = options.timeout.map(|t| Instant::now() + t);

    let changes = normalize(changes).map_err(|e| DeployError::new(Stage::Validate, e))?;
    if message.trim().is_empty() {
        return Err(DeployError::new(Stage::Validate, ValidationError::EmptyMessage));
    }
    info!("🚀 Deploying {} change(s) to {}", changes.len(), repo);

    let resolved = run_stage(Stage::ResolveRef, deadline, resolve_branch(remote, repo)).await?;
    let placeholder = match &resolved.state {
        BranchState::Named => None,
        BranchState::Fallback { requested } => {
            warn!(
                "Branch {} does not exist, committing to {} instead",
                requested, resolved.branch
            );
            None
        }
        BranchState::Empty => {
            if let Some(path) = changes.deletions().next() {
                return Err(DeployError::new(
                    Stage::ResolveRef,
                    SyncError::NotFound(format!(
                        "cannot delete {} from a repository without commits",
                        path
                    )),
                ));
            }
            let placeholder = run_stage(
                Stage::ResolveRef,
                deadline,
                initialize_branch(remote, repo, &resolved.branch),
            )
            .await?;
            Some(placeholder)
        }
    };

    let blobs = run_stage(
        Stage::CreateBlobs,
        deadline,
        create_blobs(remote, repo, &changes, options.concurrency),
    )
    .await?;
    let blobs_uploaded = blobs
        .iter()
        .map(|b| &b.object_id)
        .collect::<HashSet<_>>()
        .len();

    // From here on, a failure leaves the uploaded objects unreferenced.
    let orphaned = |error: DeployError| {
        warn!(
            "Deploy stopped at {} after creating {} blob(s); they stay unreferenced",
            error.stage, blobs_uploaded
        );
        if let Some(placeholder) = &placeholder {
            warn!(
                "{} still points at placeholder commit {}",
                resolved.branch, placeholder
            );
        }
        error
    };

    let tree = run_stage(
        Stage::ComposeTree,
        deadline,
        compose_tree(
            remote,
            repo,
            resolved.base_tree.as_ref(),
            &changes,
            &blobs,
        ),
    )
    .await
    .map_err(orphaned)?;

    let commit = run_stage(
        Stage::ComposeCommit,
        deadline,
        compose_commit(remote, repo, &tree, resolved.head.as_ref(), message),
    )
    .await
    .map_err(orphaned)?;

    let ref_update = async {
        match &placeholder {
            Some(placeholder) => {
                replace_placeholder(remote, repo, &resolved.branch, &commit.id, placeholder).await
            }
            None => {
                update_branch(
                    remote,
                    repo,
                    &resolved.branch,
                    &commit.id,
                    resolved.head.as_ref(),
                )
                .await
            }
        }
    };
    run_stage(Stage::UpdateRef, deadline, ref_update)
        .await
        .map_err(|e| {
            warn!("Commit {} was created but {} did not move", commit.id, resolved.branch);
            orphaned(e)
        })?;

    info!(
        "✅ Deployed {} to {}@{}",
        commit.id, repo, resolved.branch
    );

    Ok(DeployOutcome {
        commit_id: commit.id,
        commit_url: commit.url,
        branch: resolved.branch,
        branch_state: resolved.state,
        parent: resolved.head,
        files_changed: changes.len(),
        blobs_uploaded,
        completed_at: Utc::now(),
    })
}
