use anyhow::{Context, Result};
use std::io::Write;

use crate::domain::RepositoryRef;
use crate::sync::fetch_file_content;

pub async fn run_cat(
    repository: &str,
    path: &str,
    default_branch: &str,
    api_url: Option<&str>,
    cache_dir: Option<String>,
) -> Result<()> {
    let repo = RepositoryRef::parse(repository, default_branch)?;
    let client = super::connect(cache_dir, api_url)?;

    let content = fetch_file_content(&client, &repo, path)
        .await
        .with_context(|| format!("Failed to read {} from {}@{}", path, repo, repo.branch))?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&content)?;
    stdout.flush()?;

    Ok(())
}
