mod cat;
mod deploy;
mod login;
mod logout;
mod status;
mod tree;

pub use cat::run_cat;
pub use deploy::{run_deploy, DeployArgs};
pub use login::run_login;
pub use logout::run_logout;
pub use status::run_status;
pub use tree::run_tree;

use anyhow::{Context, Result};

use crate::api::AuthenticatedClient;
use crate::session::AuthSessionStore;

/// Client for the stored credentials, or a hint to log in.
fn connect(cache_dir: Option<String>, api_url: Option<&str>) -> Result<AuthenticatedClient> {
    let session_store = AuthSessionStore::new(cache_dir)?;
    let (session, source) = session_store
        .get_session()?
        .context("Not logged in. Run 'reposync login --token <TOKEN>' or set GITHUB_TOKEN.")?;
    tracing::debug!("Using credentials from {}", source);
    session.client(api_url)
}
