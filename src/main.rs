use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod cli;
mod command;
mod domain;
mod error;
mod session;
mod sync;
mod tree;

use cli::{Cli, Commands};
use command::DeployArgs;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let api_url = cli.api_url.as_deref();
    let cache_dir = cli.cache_dir.clone();

    match cli.command {
        Some(Commands::Login { token }) => {
            command::run_login(token, cli.api_url.clone(), cache_dir).await?;
        }
        Some(Commands::Logout) => {
            command::run_logout(cache_dir).await?;
        }
        Some(Commands::Status) => {
            command::run_status(cache_dir).await?;
        }
        Some(Commands::Tree { repository, json }) => {
            command::run_tree(&repository, json, &cli.default_branch, api_url, cache_dir).await?;
        }
        Some(Commands::Cat { repository, path }) => {
            command::run_cat(&repository, &path, &cli.default_branch, api_url, cache_dir).await?;
        }
        Some(Commands::Deploy {
            repository,
            changes,
            message,
            dry_run,
            json,
        }) => {
            let args = DeployArgs {
                repository: &repository,
                changes: &changes,
                message: &message,
                dry_run,
                json,
                default_branch: &cli.default_branch,
                concurrency: cli.concurrency,
                timeout_secs: cli.timeout_secs,
            };
            command::run_deploy(args, api_url, cache_dir).await?;
        }
        None => {
            // No command specified, show help
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!("Use 'reposync login --token <TOKEN>' to authenticate.");
        }
    }

    Ok(())
}
