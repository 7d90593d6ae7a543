//! API client for GitHub.
//!
//! This module provides the HTTP client for the GitHub REST API (Git Data,
//! Contents and Repository endpoints) and the `AuthenticatedClient` that
//! implements the sync engine's `GitRemote` seam on top of it.

mod authenticated;
mod client;
mod contents;
mod git;
mod http;
mod types;
mod user;

pub use authenticated::AuthenticatedClient;
pub use client::DEFAULT_API_URL;
pub use types::{ApiError, ApiStatus};
