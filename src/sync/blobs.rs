//! Blob upload for a validated change-set.
//!
//! - Payloads are grouped by a local SHA-256 so identical bytes upload once
//! - Uploads run as a bounded fan-out
//! - Every failure is collected; a partial result is never returned

use std::collections::HashMap;

use futures_util::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::domain::{BlobRef, ChangeSet, ObjectId, RepositoryRef};
use crate::error::{BlobFailure, SyncError};

use super::GitRemote;

/// Maximum number of blob uploads in flight per deploy.
pub const DEFAULT_BLOB_CONCURRENCY: usize = 8;

/// Paths sharing one payload.
struct ContentGroup<'a> {
    content: &'a [u8],
    paths: Vec<&'a str>,
}

fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Group create/update entries by payload, in order of first appearance.
fn group_by_content(changes: &ChangeSet) -> Vec<ContentGroup<'_>> {
    let mut groups: Vec<ContentGroup<'_>> = Vec::new();
    let mut by_digest: HashMap<String, usize> = HashMap::new();

    for (path, content) in changes.upserts() {
        let digest = content_digest(content.as_bytes());
        match by_digest.get(&digest) {
            Some(&index) => groups[index].paths.push(path),
            None => {
                by_digest.insert(digest, groups.len());
                groups.push(ContentGroup {
                    content: content.as_bytes(),
                    paths: vec![path],
                });
            }
        }
    }

    groups
}

/// Upload one blob per distinct payload of the change-set.
///
/// Returns one [`BlobRef`] per create/update entry, in change-set order.
/// Deletions are skipped.
pub async fn create_blobs<R: GitRemote>(
    remote: &R,
    repo: &RepositoryRef,
    changes: &ChangeSet,
    concurrency: usize,
) -> Result<Vec<BlobRef>, SyncError> {
    let groups = group_by_content(changes);
    if groups.is_empty() {
        debug!("No blobs to upload");
        return Ok(Vec::new());
    }

    let upserts = changes.upserts().count();
    info!(
        "📤 Uploading {} blob(s) for {} file(s)...",
        groups.len(),
        upserts
    );

    let results: Vec<_> = stream::iter(groups)
        .map(|group| async move {
            let result = remote.create_blob(repo, group.content).await;
            (group.paths, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut ids: HashMap<&str, ObjectId> = HashMap::with_capacity(upserts);
    let mut failures = Vec::new();

    for (paths, result) in results {
        match result {
            Ok(id) => {
                debug!("Blob {} <- {}", id, paths.join(", "));
                for path in paths {
                    ids.insert(path, id.clone());
                }
            }
            Err(error) => {
                warn!("Blob upload failed for {}: {}", paths.join(", "), error);
                failures.push(BlobFailure {
                    paths: paths.into_iter().map(str::to_string).collect(),
                    error,
                });
            }
        }
    }

    if !failures.is_empty() {
        failures.sort_by(|a, b| a.paths.cmp(&b.paths));
        return Err(SyncError::BlobUploads { failures });
    }

    changes
        .upserts()
        .map(|(path, _)| {
            ids.remove(path)
                .map(|object_id| BlobRef {
                    path: path.to_string(),
                    object_id,
                })
                .ok_or_else(|| SyncError::NotFound(format!("blob for {}", path)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawChange;
    use crate::sync::memory::MemoryRemote;
    use crate::sync::normalize;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("octo", "site", "main")
    }

    fn remote() -> MemoryRemote {
        let remote = MemoryRemote::new();
        remote.seed_branch(&repo(), "main", &[("README.md", "hello")]);
        remote
    }

    #[tokio::test]
    async fn test_identical_content_shares_object_id() {
        let remote = remote();
        let changes = normalize(&[
            RawChange::create("a.txt", "same"),
            RawChange::delete("gone.txt"),
            RawChange::create("b/c.txt", "same"),
            RawChange::update("d.txt", "other"),
        ])
        .unwrap();

        let blobs = create_blobs(&remote, &repo(), &changes, 4).await.unwrap();

        let paths: Vec<_> = blobs.iter().map(|b| b.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b/c.txt", "d.txt"]);
        assert_eq!(blobs[0].object_id, blobs[1].object_id);
        assert_ne!(blobs[0].object_id, blobs[2].object_id);
        assert_eq!(remote.calls().create_blob, 2);
    }

    #[tokio::test]
    async fn test_only_deletions_upload_nothing() {
        let remote = MemoryRemote::new();
        let changes = normalize(&[RawChange::delete("a.txt")]).unwrap();

        let blobs = create_blobs(&remote, &repo(), &changes, 4).await.unwrap();
        assert!(blobs.is_empty());
        assert_eq!(remote.calls().create_blob, 0);
    }

    #[tokio::test]
    async fn test_every_failure_is_reported() {
        let remote = remote();
        remote.fail_blob("bad one");
        remote.fail_blob("bad two");

        let changes = normalize(&[
            RawChange::create("ok.txt", "fine"),
            RawChange::create("x.txt", "bad one"),
            RawChange::create("y.txt", "bad two"),
            RawChange::create("z.txt", "bad one"),
        ])
        .unwrap();

        let err = create_blobs(&remote, &repo(), &changes, 2)
            .await
            .unwrap_err();
        let SyncError::BlobUploads { failures } = err else {
            panic!("expected BlobUploads, got {err:?}");
        };
        let paths: Vec<_> = failures.iter().map(|f| f.paths.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec!["x.txt".to_string(), "z.txt".to_string()],
                vec!["y.txt".to_string()],
            ]
        );
    }

    #[test]
    fn test_content_digest_is_stable() {
        assert_eq!(content_digest(b"hello"), content_digest(b"hello"));
        assert_eq!(content_digest(b"").len(), 64);
    }
}
