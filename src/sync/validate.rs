//! Change-set validation.
//!
//! The only way to obtain a [`ChangeSet`]: every rule below holds for the
//! result, and nothing is sent to the remote before this has passed.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{split_segments, ChangeKind, ChangeSet, FileChange, RawChange};
use crate::error::ValidationError;

/// Normalize a repository-relative path.
///
/// Leading slashes are stripped; anything else unusual is an error.
pub fn normalize_path(path: &str) -> Result<String, ValidationError> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyPath);
    }

    for segment in split_segments(trimmed)? {
        match segment {
            ".." => return Err(ValidationError::PathTraversal(path.to_string())),
            "." => {
                return Err(ValidationError::MalformedPath {
                    path: path.to_string(),
                    reason: "`.` segment",
                })
            }
            _ => {}
        }
    }

    Ok(trimmed.to_string())
}

/// Turn untrusted changes into a validated, order-preserving [`ChangeSet`].
pub fn normalize(raw: &[RawChange]) -> Result<ChangeSet, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::EmptyChangeSet);
    }

    let mut seen = HashSet::with_capacity(raw.len());
    let mut changes = Vec::with_capacity(raw.len());

    for change in raw {
        let path = normalize_path(&change.path)?;
        if !seen.insert(path.clone()) {
            return Err(ValidationError::DuplicatePath(path));
        }

        let content = change.content.clone();
        let validated = match (change.change_kind, content) {
            (Some(ChangeKind::Delete), Some(_)) => {
                return Err(ValidationError::ContentOnDelete(path))
            }
            (Some(ChangeKind::Delete), None) => FileChange::Delete { path },
            (Some(ChangeKind::Create), Some(content)) => FileChange::Create { path, content },
            // An omitted kind with content is an upsert.
            (Some(ChangeKind::Update) | None, Some(content)) => FileChange::Update { path, content },
            (Some(ChangeKind::Create | ChangeKind::Update) | None, None) => {
                return Err(ValidationError::MissingContent(path))
            }
        };
        changes.push(validated);
    }

    debug!("Validated {} change(s)", changes.len());
    Ok(ChangeSet::from_validated(changes))
}
