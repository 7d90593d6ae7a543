use serde::{Deserialize, Serialize};

/// What a proposed change does to its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

/// A proposed change exactly as an external producer sent it.
///
/// Nothing about it is trusted; `sync::normalize` turns a list of these into
/// a [`ChangeSet`] or rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChange {
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "change_kind", alias = "kind", alias = "action")]
    pub change_kind: Option<ChangeKind>,
}

// Constructors for producers that build changes in code rather than JSON.
#[allow(dead_code)]
impl RawChange {
    pub fn create(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
            change_kind: Some(ChangeKind::Create),
        }
    }

    pub fn update(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
            change_kind: Some(ChangeKind::Update),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            change_kind: Some(ChangeKind::Delete),
        }
    }
}

/// A validated change. Deletions cannot carry content by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "changeKind", rename_all = "lowercase")]
pub enum FileChange {
    Create { path: String, content: String },
    Update { path: String, content: String },
    Delete { path: String },
}

impl FileChange {
    pub fn path(&self) -> &str {
        match self {
            FileChange::Create { path, .. }
            | FileChange::Update { path, .. }
            | FileChange::Delete { path } => path,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            FileChange::Create { content, .. } | FileChange::Update { content, .. } => {
                Some(content)
            }
            FileChange::Delete { .. } => None,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            FileChange::Create { .. } => ChangeKind::Create,
            FileChange::Update { .. } => ChangeKind::Update,
            FileChange::Delete { .. } => ChangeKind::Delete,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, FileChange::Delete { .. })
    }
}

/// Ordered, path-unique list of validated changes for one deploy.
///
/// Only the validator builds these, so holding one means the invariants
/// already hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<FileChange>,
}

impl ChangeSet {
    pub(crate) fn from_validated(changes: Vec<FileChange>) -> Self {
        Self { changes }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileChange> {
        self.changes.iter()
    }

    /// `(path, content)` for every create/update, in order.
    pub fn upserts(&self) -> impl Iterator<Item = (&str, &str)> {
        self.changes
            .iter()
            .filter_map(|c| c.content().map(|content| (c.path(), content)))
    }

    /// Paths of every delete, in order.
    pub fn deletions(&self) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(|c| c.is_delete())
            .map(FileChange::path)
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a FileChange;
    type IntoIter = std::slice::Iter<'a, FileChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_change_accepts_producer_json() {
        let raw: Vec<RawChange> = serde_json::from_str(
            r#"[
                {"path": "src/a.ts", "content": "x", "changeKind": "create"},
                {"path": "src/b.ts", "content": "", "change_kind": "update"},
                {"path": "old.md", "action": "delete"},
                {"path": "c.ts", "content": "y"}
            ]"#,
        )
        .unwrap();

        assert_eq!(raw[0], RawChange::create("src/a.ts", "x"));
        assert_eq!(raw[1].content.as_deref(), Some(""));
        assert_eq!(raw[2], RawChange::delete("old.md"));
        assert_eq!(raw[3].change_kind, None);
    }

    #[test]
    fn test_raw_change_rejects_unknown_kind() {
        let parsed: Result<RawChange, _> =
            serde_json::from_str(r#"{"path": "a", "changeKind": "rename"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_file_change_serializes_tagged() {
        let change = FileChange::Delete {
            path: "docs/old.md".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            serde_json::json!({"changeKind": "delete", "path": "docs/old.md"})
        );
    }

    #[test]
    fn test_change_set_partitions() {
        let set = ChangeSet::from_validated(vec![
            FileChange::Create {
                path: "a".into(),
                content: "1".into(),
            },
            FileChange::Delete { path: "b".into() },
            FileChange::Update {
                path: "c".into(),
                content: "".into(),
            },
        ]);

        assert_eq!(set.upserts().collect::<Vec<_>>(), vec![("a", "1"), ("c", "")]);
        assert_eq!(set.deletions().collect::<Vec<_>>(), vec!["b"]);
    }
}
