use anyhow::{Context, Result};
use std::io::Read;
use std::time::Duration;

use crate::domain::{RawChange, RepositoryRef};
use crate::sync::{deploy, normalize, DeployOptions};

/// Settings shared by every deploy invocation.
pub struct DeployArgs<'a> {
    pub repository: &'a str,
    pub changes: &'a str,
    pub message: &'a str,
    pub dry_run: bool,
    pub json: bool,
    pub default_branch: &'a str,
    pub concurrency: usize,
    pub timeout_secs: Option<u64>,
}

fn read_changes(source: &str) -> Result<Vec<RawChange>> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read changes from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read changes file: {}", source))?
    };

    serde_json::from_str(&raw).context("Changes must be a JSON array of {path, content, changeKind}")
}

pub async fn run_deploy(
    args: DeployArgs<'_>,
    api_url: Option<&str>,
    cache_dir: Option<String>,
) -> Result<()> {
    let repo = RepositoryRef::parse(args.repository, args.default_branch)?;
    let changes = read_changes(args.changes)?;

    if args.dry_run {
        let change_set = match normalize(&changes) {
            Ok(change_set) => change_set,
            Err(e) => match e.path() {
                Some(path) => anyhow::bail!("Invalid change for {}: {}", path, e),
                None => return Err(e.into()),
            },
        };
        if args.message.trim().is_empty() {
            anyhow::bail!("Commit message is empty");
        }
        println!(
            "Dry run: {} change(s) for {}@{}",
            change_set.len(),
            repo,
            repo.branch
        );
        for change in &change_set {
            match change.content() {
                Some(content) => println!(
                    "  {:<6}  {} ({} B)",
                    change.kind().as_str(),
                    change.path(),
                    content.len()
                ),
                None => println!("  {:<6}  {}", change.kind().as_str(), change.path()),
            }
        }
        return Ok(());
    }

    let client = super::connect(cache_dir, api_url)?;
    let options = DeployOptions {
        concurrency: args.concurrency,
        timeout: args.timeout_secs.map(Duration::from_secs),
    };

    let outcome = match deploy(&client, &repo, &changes, args.message, &options).await {
        Ok(outcome) => outcome,
        Err(e) if e.source.is_retryable() => {
            anyhow::bail!("{}\nNothing was committed; the deploy can be re-run.", e)
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        let rendered =
            serde_json::to_string_pretty(&outcome).context("Failed to serialize deploy outcome")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("✅ Committed {} file(s) to {}@{}", outcome.files_changed, repo, outcome.branch);
    if outcome.branch != repo.branch {
        println!("   (branch {} does not exist; used {})", repo.branch, outcome.branch);
    }
    println!("   Commit: {}", outcome.commit_id);
    println!("   URL: {}", outcome.commit_url);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_changes_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("changes.json");
        std::fs::write(
            &path,
            r##"[{"path":"a.md","content":"# A","changeKind":"create"},{"path":"b.md","changeKind":"delete"}]"##,
        )
        .unwrap();

        let changes = read_changes(path.to_str().unwrap()).unwrap();
        assert_eq!(changes, vec![RawChange::create("a.md", "# A"), RawChange::delete("b.md")]);
    }

    #[test]
    fn test_read_changes_rejects_non_array() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("changes.json");
        std::fs::write(&path, r#"{"path":"a.md"}"#).unwrap();

        assert!(read_changes(path.to_str().unwrap()).is_err());
    }
}
