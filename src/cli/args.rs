use clap::{Parser, Subcommand};

use crate::domain::DEFAULT_BRANCH;
use crate::sync::DEFAULT_BLOB_CONCURRENCY;

/// reposync - atomic multi-file commits and tree browsing for GitHub repositories
#[derive(Parser)]
#[command(name = "reposync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// GitHub API root (GitHub Enterprise: https://HOST/api/v3/)
    #[arg(long, env = "REPOSYNC_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Branch used when a repository is given without `@branch`
    #[arg(long, env = "REPOSYNC_DEFAULT_BRANCH", default_value = DEFAULT_BRANCH, global = true)]
    pub default_branch: String,

    /// Maximum blob uploads in flight during a deploy
    #[arg(long, env = "REPOSYNC_BLOB_CONCURRENCY", default_value_t = DEFAULT_BLOB_CONCURRENCY, global = true)]
    pub concurrency: usize,

    /// Give up on a deploy after this many seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Directory to store reposync files (session data). Defaults to ~/.reposync
    #[arg(long, global = true)]
    pub cache_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a GitHub token after checking it against the API
    Login {
        /// Personal access token or fine-grained token
        #[arg(long)]
        token: String,
    },
    /// Remove the stored session
    Logout,
    /// Show current session status
    Status,
    /// Print the files of a branch as a tree
    Tree {
        /// owner/name[@branch]
        repository: String,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write one file of a branch to stdout
    Cat {
        /// owner/name[@branch]
        repository: String,

        /// Path inside the repository
        path: String,
    },
    /// Commit a set of file changes as a single commit
    Deploy {
        /// owner/name[@branch]
        repository: String,

        /// JSON array of changes (`-` reads stdin)
        #[arg(long)]
        changes: String,

        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Validate and print the change-set without touching the repository
        #[arg(long)]
        dry_run: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
}
