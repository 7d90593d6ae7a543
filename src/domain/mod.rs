//! Domain types shared across modules.
//!
//! This module contains the value types that flow between the GitHub API
//! layer, the tree builder and the sync engine. Keeping them here avoids
//! circular dependencies between `api` and `sync`.

mod change;
mod ids;
mod node;
mod path;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use change::{ChangeKind, ChangeSet, FileChange, RawChange};
pub use ids::{CommitId, ObjectId, TreeId};
pub use node::{NodeKind, PathRecord, TreeNode};
pub(crate) use path::split_segments;

/// Default branch name used when the caller does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Regular (non-executable) file mode. The only mode this crate writes.
pub const FILE_MODE: &str = "100644";

/// File committed to make an empty repository writable. The first deploy
/// replaces that commit, so the file never appears in history.
pub const PLACEHOLDER_PATH: &str = ".gitkeep";
pub const PLACEHOLDER_MESSAGE: &str = "Initialize repository";

/// Target repository and branch.
///
/// `branch` is only a request: it is not assumed to exist on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub branch: String,
}

impl RepositoryRef {
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: branch.into(),
        }
    }

    /// Parse `owner/name` or `owner/name@branch`.
    pub fn parse(input: &str, default_branch: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidRepository(input.to_string());

        let (slug, branch) = match input.split_once('@') {
            Some((slug, branch)) if !branch.is_empty() => (slug, branch),
            Some(_) => return Err(invalid()),
            None => (input, default_branch),
        };

        let (owner, name) = slug.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self::new(owner, name, branch))
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A path and the blob id its new content was stored under.
///
/// Several paths may carry the same `object_id` when their bytes match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobRef {
    pub path: String,
    pub object_id: ObjectId,
}

/// A newly created commit and where a human can look at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRef {
    pub id: CommitId,
    pub url: String,
}

/// One path of a tree overlay. `object: None` removes the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeOverlayEntry {
    pub path: String,
    pub object: Option<ObjectId>,
}

impl TreeOverlayEntry {
    pub fn upsert(path: impl Into<String>, object: ObjectId) -> Self {
        Self {
            path: path.into(),
            object: Some(object),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            object: None,
        }
    }
}
