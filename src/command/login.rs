use anyhow::{Context, Result};
use url::Url;

use crate::api::{AuthenticatedClient, DEFAULT_API_URL};
use crate::session::AuthSessionStore;

pub async fn run_login(
    token: String,
    api_url: Option<String>,
    cache_dir: Option<String>,
) -> Result<()> {
    let api_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let parsed = Url::parse(&api_url).with_context(|| format!("Invalid API URL: {}", api_url))?;

    let session_store = AuthSessionStore::new(cache_dir)?;
    if session_store.has_session_file() {
        println!("⚠️  Replacing the existing session.");
    }

    println!("🔐 Checking token against {}...", api_url);
    let client = AuthenticatedClient::new(parsed, token.trim().to_string());
    let user = match client.current_user().await {
        Ok(user) => user,
        Err(e) => {
            anyhow::bail!("{}\n{}", e, e.user_hint());
        }
    };

    session_store.save_session(client.access_token(), &api_url, &user.login)?;

    println!("\n✅ Logged in to {} as {}", api_url, user.login);

    Ok(())
}
