//! In-memory `GitRemote` for tests.
//!
//! Objects are content-addressed with SHA-256 and shared by all
//! repositories; refs and default branches are per repository. Trees are
//! stored flat as `path -> blob`. Like GitHub, a repository without refs
//! refuses object writes until it is initialized.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::api::ApiError;
use crate::domain::{
    CommitId, CommitRef, ObjectId, PathRecord, RepositoryRef, TreeId, TreeOverlayEntry,
    DEFAULT_BRANCH, PLACEHOLDER_MESSAGE, PLACEHOLDER_PATH,
};
use crate::error::SyncError;

use super::{BranchLookup, GitRemote, TreeListing};

/// Number of calls made per remote operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub default_branch: usize,
    pub branch_head: usize,
    pub commit_tree: usize,
    pub initialize: usize,
    pub create_blob: usize,
    pub create_tree: usize,
    pub create_commit: usize,
    pub move_ref: usize,
    pub replace_ref: usize,
    pub create_ref: usize,
    pub list_tree: usize,
    pub file_content: usize,
}

#[derive(Debug, Clone)]
pub struct StoredCommit {
    pub tree: TreeId,
    pub parent: Option<CommitId>,
    pub message: String,
}

#[derive(Default)]
struct RepoRefs {
    refs: BTreeMap<String, CommitId>,
    default_branch: Option<String>,
}

#[derive(Default)]
struct State {
    blobs: HashMap<ObjectId, Vec<u8>>,
    trees: HashMap<TreeId, BTreeMap<String, ObjectId>>,
    commits: HashMap<CommitId, StoredCommit>,
    repos: HashMap<String, RepoRefs>,
    commit_seq: u64,
    calls: CallCounts,
    failing_blobs: HashSet<Vec<u8>>,
    fail_tree: bool,
    race_branch: Option<String>,
}

fn digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

fn unavailable(what: &str) -> SyncError {
    ApiError::from_http_response(503, format!("{} unavailable", what), None, false).into()
}

fn repository_empty() -> SyncError {
    ApiError::from_http_response(
        409,
        r#"{"message":"Git Repository is empty."}"#.to_string(),
        None,
        false,
    )
    .into()
}

/// Artificial latency per operation.
#[derive(Debug, Clone, Copy, Default)]
struct Delays {
    blob: Option<Duration>,
    tree: Option<Duration>,
    commit: Option<Duration>,
}

impl State {
    fn repo(&mut self, repo: &RepositoryRef) -> &mut RepoRefs {
        self.repos.entry(repo.to_string()).or_default()
    }

    fn ensure_writable(&mut self, repo: &RepositoryRef) -> Result<(), SyncError> {
        if self.repo(repo).refs.is_empty() {
            return Err(repository_empty());
        }
        Ok(())
    }

    /// Compare-and-swap of `branch` from `previous` to `commit`.
    fn swap_ref(
        &mut self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
        previous: &CommitId,
    ) -> Result<(), SyncError> {
        self.run_race(repo, branch);

        let refs = &mut self.repo(repo).refs;
        if refs.get(branch) != Some(previous) {
            return Err(SyncError::Conflict {
                branch: branch.to_string(),
            });
        }
        refs.insert(branch.to_string(), commit.clone());
        Ok(())
    }

    fn put_blob(&mut self, content: &[u8]) -> ObjectId {
        let id = ObjectId::new(digest(&[b"blob", content]));
        self.blobs.insert(id.clone(), content.to_vec());
        id
    }

    fn put_tree(&mut self, files: BTreeMap<String, ObjectId>) -> TreeId {
        let mut hasher = Sha256::new();
        for (path, id) in &files {
            hasher.update(path.as_bytes());
            hasher.update([0u8]);
            hasher.update(id.as_str().as_bytes());
            hasher.update(b"\n");
        }
        let id = TreeId::new(format!("{:x}", hasher.finalize()));
        self.trees.insert(id.clone(), files);
        id
    }

    fn put_commit(&mut self, tree: TreeId, parent: Option<CommitId>, message: &str) -> CommitId {
        self.commit_seq += 1;
        let seq = self.commit_seq.to_string();
        let parent_id = parent.as_ref().map(CommitId::as_str).unwrap_or("");
        let id = CommitId::new(digest(&[
            tree.as_str().as_bytes(),
            parent_id.as_bytes(),
            message.as_bytes(),
            seq.as_bytes(),
        ]));
        self.commits.insert(
            id.clone(),
            StoredCommit {
                tree,
                parent,
                message: message.to_string(),
            },
        );
        id
    }

    /// A concurrent writer moves `branch` before our ref update lands.
    fn run_race(&mut self, repo: &RepositoryRef, branch: &str) {
        if self.race_branch.as_deref() != Some(branch) {
            return;
        }
        self.race_branch = None;

        let head = self.repo(repo).refs.get(branch).cloned();
        let tree = match &head {
            Some(head) => self.commits[head].tree.clone(),
            None => self.put_tree(BTreeMap::new()),
        };
        let theirs = self.put_commit(tree, head, "concurrent edit");
        self.repo(repo).refs.insert(branch.to_string(), theirs);
    }
}

/// In-memory remote with failure injection and call counting.
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
    delays: Mutex<Delays>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().unwrap().calls
    }

    /// Commit `files` as a complete snapshot without moving any ref.
    pub fn seed_commit(
        &self,
        _repo: &RepositoryRef,
        files: &[(&str, &str)],
        parent: Option<&CommitId>,
    ) -> CommitId {
        let mut state = self.state.lock().unwrap();
        let mut tree = BTreeMap::new();
        for (path, content) in files {
            let id = state.put_blob(content.as_bytes());
            tree.insert(path.to_string(), id);
        }
        let tree = state.put_tree(tree);
        state.put_commit(tree, parent.cloned(), "seed")
    }

    /// Commit `files` on top of `branch` and move the branch there.
    pub fn seed_branch(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        files: &[(&str, &str)],
    ) -> CommitId {
        let parent = self.head(repo, branch);
        let commit = self.seed_commit(repo, files, parent.as_ref());
        self.state
            .lock()
            .unwrap()
            .repo(repo)
            .refs
            .insert(branch.to_string(), commit.clone());
        commit
    }

    pub fn set_default_branch(&self, repo: &RepositoryRef, branch: &str) {
        self.state.lock().unwrap().repo(repo).default_branch = Some(branch.to_string());
    }

    pub fn head(&self, repo: &RepositoryRef, branch: &str) -> Option<CommitId> {
        self.state.lock().unwrap().repo(repo).refs.get(branch).cloned()
    }

    pub fn commit(&self, id: &CommitId) -> StoredCommit {
        self.state.lock().unwrap().commits[id].clone()
    }

    pub fn tree_of(&self, commit: &CommitId) -> TreeId {
        self.commit(commit).tree
    }

    /// `(path, content)` of every file in `tree`, sorted by path.
    pub fn tree_files(&self, tree: &TreeId) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        state.trees[tree]
            .iter()
            .map(|(path, id)| {
                let content = String::from_utf8_lossy(&state.blobs[id]).into_owned();
                (path.clone(), content)
            })
            .collect()
    }

    /// Number of commits stored, referenced or not.
    pub fn commit_count(&self) -> usize {
        self.state.lock().unwrap().commits.len()
    }

    /// Make every upload of exactly `content` fail with a 503.
    pub fn fail_blob(&self, content: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_blobs
            .insert(content.as_bytes().to_vec());
    }

    pub fn fail_tree_creation(&self) {
        self.state.lock().unwrap().fail_tree = true;
    }

    /// Move `branch` to a competing commit right before the next ref write.
    pub fn race_on_ref_update(&self, branch: &str) {
        self.state.lock().unwrap().race_branch = Some(branch.to_string());
    }

    pub fn delay_blobs(&self, delay: Duration) {
        self.delays.lock().unwrap().blob = Some(delay);
    }

    pub fn delay_trees(&self, delay: Duration) {
        self.delays.lock().unwrap().tree = Some(delay);
    }

    pub fn delay_commits(&self, delay: Duration) {
        self.delays.lock().unwrap().commit = Some(delay);
    }

    async fn pause(&self, pick: fn(&Delays) -> Option<Duration>) {
        let delay = pick(&self.delays.lock().unwrap());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl GitRemote for MemoryRemote {
    async fn default_branch(&self, repo: &RepositoryRef) -> Result<String, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.default_branch += 1;
        Ok(state
            .repo(repo)
            .default_branch
            .clone()
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string()))
    }

    async fn branch_head(
        &self,
        repo: &RepositoryRef,
        branch: &str,
    ) -> Result<BranchLookup, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.branch_head += 1;
        let refs = &state.repo(repo).refs;
        if refs.is_empty() {
            return Ok(BranchLookup::RepositoryEmpty);
        }
        Ok(refs
            .get(branch)
            .cloned()
            .map_or(BranchLookup::Missing, BranchLookup::Found))
    }

    async fn commit_tree(
        &self,
        _repo: &RepositoryRef,
        commit: &CommitId,
    ) -> Result<TreeId, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.commit_tree += 1;
        state
            .commits
            .get(commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| SyncError::NotFound(format!("commit {}", commit)))
    }

    async fn initialize(&self, repo: &RepositoryRef, branch: &str) -> Result<CommitId, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.initialize += 1;
        if !state.repo(repo).refs.is_empty() {
            return Err(SyncError::Conflict {
                branch: branch.to_string(),
            });
        }

        let placeholder = state.put_blob(b"");
        let tree = state.put_tree(BTreeMap::from([(PLACEHOLDER_PATH.to_string(), placeholder)]));
        let commit = state.put_commit(tree, None, PLACEHOLDER_MESSAGE);
        state
            .repo(repo)
            .refs
            .insert(branch.to_string(), commit.clone());
        Ok(commit)
    }

    async fn create_blob(
        &self,
        repo: &RepositoryRef,
        content: &[u8],
    ) -> Result<ObjectId, SyncError> {
        self.pause(|d| d.blob).await;

        let mut state = self.state.lock().unwrap();
        state.calls.create_blob += 1;
        state.ensure_writable(repo)?;
        if state.failing_blobs.contains(content) {
            return Err(unavailable("blob storage"));
        }
        Ok(state.put_blob(content))
    }

    async fn create_tree(
        &self,
        repo: &RepositoryRef,
        base: Option<&TreeId>,
        entries: &[TreeOverlayEntry],
    ) -> Result<TreeId, SyncError> {
        self.pause(|d| d.tree).await;

        let mut state = self.state.lock().unwrap();
        state.calls.create_tree += 1;
        state.ensure_writable(repo)?;
        if state.fail_tree {
            return Err(unavailable("tree storage"));
        }

        let mut files = match base {
            Some(base) => state
                .trees
                .get(base)
                .cloned()
                .ok_or_else(|| SyncError::NotFound(format!("tree {}", base)))?,
            None => BTreeMap::new(),
        };

        for entry in entries {
            match &entry.object {
                Some(id) if state.blobs.contains_key(id) => {
                    files.insert(entry.path.clone(), id.clone());
                }
                Some(id) => return Err(SyncError::NotFound(format!("blob {}", id))),
                None => {
                    files.remove(&entry.path);
                }
            }
        }

        Ok(state.put_tree(files))
    }

    async fn create_commit(
        &self,
        repo: &RepositoryRef,
        tree: &TreeId,
        parent: Option<&CommitId>,
        message: &str,
    ) -> Result<CommitRef, SyncError> {
        self.pause(|d| d.commit).await;

        let mut state = self.state.lock().unwrap();
        state.calls.create_commit += 1;
        state.ensure_writable(repo)?;
        if !state.trees.contains_key(tree) {
            return Err(SyncError::NotFound(format!("tree {}", tree)));
        }
        if let Some(parent) = parent {
            if !state.commits.contains_key(parent) {
                return Err(SyncError::NotFound(format!("commit {}", parent)));
            }
        }

        let id = state.put_commit(tree.clone(), parent.cloned(), message);
        Ok(CommitRef {
            url: format!("https://github.test/{}/commit/{}", repo, id),
            id,
        })
    }

    async fn move_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
        previous: &CommitId,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.move_ref += 1;
        state.swap_ref(repo, branch, commit, previous)
    }

    async fn replace_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
        previous: &CommitId,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.replace_ref += 1;
        state.swap_ref(repo, branch, commit, previous)
    }

    async fn create_ref(
        &self,
        repo: &RepositoryRef,
        branch: &str,
        commit: &CommitId,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.create_ref += 1;
        state.run_race(repo, branch);

        let refs = &mut state.repo(repo).refs;
        if refs.contains_key(branch) {
            return Err(SyncError::Conflict {
                branch: branch.to_string(),
            });
        }
        refs.insert(branch.to_string(), commit.clone());
        Ok(())
    }

    async fn list_tree(
        &self,
        _repo: &RepositoryRef,
        tree: &TreeId,
    ) -> Result<TreeListing, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.list_tree += 1;
        let files = state
            .trees
            .get(tree)
            .ok_or_else(|| SyncError::NotFound(format!("tree {}", tree)))?;

        // Like GitHub: every directory gets its own entry before its contents.
        let mut seen_dirs = BTreeSet::new();
        let mut records = Vec::new();
        for (path, id) in files {
            for (end, _) in path.match_indices('/') {
                let dir = &path[..end];
                if seen_dirs.insert(dir.to_string()) {
                    records.push(PathRecord::directory(dir));
                }
            }
            let size = state.blobs[id].len() as u64;
            records.push(PathRecord::file(path.as_str(), Some(size)));
        }

        Ok(TreeListing {
            records,
            truncated: false,
        })
    }

    async fn file_content(
        &self,
        _repo: &RepositoryRef,
        commit: &CommitId,
        path: &str,
    ) -> Result<Vec<u8>, SyncError> {
        let mut state = self.state.lock().unwrap();
        state.calls.file_content += 1;
        let tree = state
            .commits
            .get(commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| SyncError::NotFound(format!("commit {}", commit)))?;

        state.trees[&tree]
            .get(path)
            .map(|id| state.blobs[id].clone())
            .ok_or_else(|| SyncError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryRef {
        RepositoryRef::new("octo", "site", "main")
    }

    #[tokio::test]
    async fn test_blobs_are_content_addressed() {
        let remote = MemoryRemote::new();
        remote.seed_branch(&repo(), "main", &[("README.md", "hi")]);
        let a = remote.create_blob(&repo(), b"same").await.unwrap();
        let b = remote.create_blob(&repo(), b"same").await.unwrap();
        let c = remote.create_blob(&repo(), b"other").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_empty_repository_needs_initializing() {
        let remote = MemoryRemote::new();
        let err = remote.create_blob(&repo(), b"early").await.unwrap_err();
        assert!(matches!(err, SyncError::Remote(ref e) if e.http_status == Some(409)));

        let placeholder = remote.initialize(&repo(), "main").await.unwrap();
        assert_eq!(remote.head(&repo(), "main"), Some(placeholder.clone()));
        assert_eq!(
            remote.tree_files(&remote.tree_of(&placeholder)),
            vec![(PLACEHOLDER_PATH.to_string(), String::new())]
        );
        assert!(remote.create_blob(&repo(), b"now").await.is_ok());

        let again = remote.initialize(&repo(), "main").await.unwrap_err();
        assert!(matches!(again, SyncError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_listing_includes_directories() {
        let remote = MemoryRemote::new();
        let head = remote.seed_branch(&repo(), "main", &[("a/b/c.txt", "x"), ("a/d.txt", "yy")]);
        let listing = remote.list_tree(&repo(), &remote.tree_of(&head)).await.unwrap();

        let paths: Vec<_> = listing.records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a/b", "a/b/c.txt", "a/d.txt"]);
        assert_eq!(listing.records[3].size, Some(2));
    }
}
