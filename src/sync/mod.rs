//! Repository synchronization engine.
//!
//! Every operation takes the remote it talks to as an argument:
//! - `normalize`: untrusted changes -> validated `ChangeSet`
//! - `create_blobs`, `compose_tree`, `compose_commit`: object creation
//! - `resolve_branch`: branch resolution; ref updates stay inside `deploy`
//! - `deploy`: all of the above as one commit
//! - `fetch_tree`, `fetch_file_content`: read path

mod blobs;
mod browse;
mod compose;
mod deploy;
#[cfg(test)]
pub(crate) mod memory;
mod refs;
mod remote;
mod validate;

pub use blobs::{create_blobs, DEFAULT_BLOB_CONCURRENCY};
pub use browse::{fetch_file_content, fetch_tree};
pub use compose::{compose_commit, compose_tree, overlay_entries};
pub use deploy::{deploy, DeployOptions, DeployOutcome};
pub use refs::{resolve_branch, BranchState};
pub use remote::{BranchLookup, GitRemote, TreeListing};
pub use validate::normalize;
