use anyhow::{Context, Result};

use crate::domain::RepositoryRef;
use crate::sync::fetch_tree;
use crate::tree::render;

pub async fn run_tree(
    repository: &str,
    json: bool,
    default_branch: &str,
    api_url: Option<&str>,
    cache_dir: Option<String>,
) -> Result<()> {
    let repo = RepositoryRef::parse(repository, default_branch)?;
    let client = super::connect(cache_dir, api_url)?;

    let nodes = fetch_tree(&client, &repo)
        .await
        .with_context(|| format!("Failed to list {}@{}", repo, repo.branch))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
    } else if nodes.is_empty() {
        println!("{} has no files yet.", repo);
    } else {
        print!("{}", render(&nodes));
    }

    Ok(())
}
