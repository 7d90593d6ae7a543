use std::collections::{HashMap, HashSet};

use crate::domain::{split_segments, NodeKind, PathRecord, TreeNode};
use crate::error::ValidationError;

/// Nodes of one directory level while the listing is being walked.
#[derive(Default)]
struct Level {
    dirs: Vec<PendingDir>,
    dir_index: HashMap<String, usize>,
    files: Vec<TreeNode>,
    file_names: HashSet<String>,
}

struct PendingDir {
    name: String,
    path: String,
    contents: Level,
}

impl Level {
    /// Directory `name` at this level, created on first use.
    fn subdir(&mut self, name: &str, path: &str) -> Result<&mut Level, ValidationError> {
        if self.file_names.contains(name) {
            return Err(ValidationError::KindConflict(path.to_string()));
        }

        let index = match self.dir_index.get(name) {
            Some(&index) => index,
            None => {
                self.dirs.push(PendingDir {
                    name: name.to_string(),
                    path: path.to_string(),
                    contents: Level::default(),
                });
                let index = self.dirs.len() - 1;
                self.dir_index.insert(name.to_string(), index);
                index
            }
        };

        Ok(&mut self.dirs[index].contents)
    }

    fn add_file(&mut self, name: &str, path: &str, size: Option<u64>) -> Result<(), ValidationError> {
        if self.dir_index.contains_key(name) {
            return Err(ValidationError::KindConflict(path.to_string()));
        }
        if !self.file_names.insert(name.to_string()) {
            return Err(ValidationError::DuplicatePath(path.to_string()));
        }
        self.files.push(TreeNode::file(name, path, size));
        Ok(())
    }

    fn finish(self) -> Vec<TreeNode> {
        let mut nodes: Vec<TreeNode> = self
            .dirs
            .into_iter()
            .map(|dir| TreeNode::directory(dir.name, dir.path, dir.contents.finish()))
            .collect();
        nodes.extend(self.files);

        // Stable: names differing only by case keep listing order.
        nodes.sort_by_cached_key(|node| (!node.is_dir(), node.name.to_lowercase()));
        nodes
    }
}

/// Build the nested hierarchy for a flat listing.
///
/// Records without a kind are files; every intermediate segment becomes a
/// directory node, created once per prefix no matter how many files sit
/// below it. Explicit directory records may be empty.
pub fn build(records: &[PathRecord]) -> Result<Vec<TreeNode>, ValidationError> {
    let mut root = Level::default();

    for record in records {
        let segments = split_segments(&record.path)?;
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(ValidationError::EmptyPath);
        };

        let mut level = &mut root;
        let mut prefix_end = 0;
        for segment in parents {
            prefix_end += segment.len();
            level = level.subdir(segment, &record.path[..prefix_end])?;
            prefix_end += 1;
        }

        match record.kind.unwrap_or(NodeKind::File) {
            NodeKind::File => level.add_file(leaf, &record.path, record.size)?,
            NodeKind::Directory => {
                level.subdir(leaf, &record.path)?;
            }
        }
    }

    Ok(root.finish())
}
