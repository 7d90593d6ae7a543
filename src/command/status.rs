use anyhow::Result;

use crate::session::AuthSessionStore;

pub async fn run_status(cache_dir: Option<String>) -> Result<()> {
    let session_store = AuthSessionStore::new(cache_dir)?;

    match session_store.get_session()? {
        Some((session, source)) => {
            println!("✅ Credentials available");
            println!("   Source: {}", source);
            println!("   API URL: {}", session.api_url);
            if let Some(login) = &session.login {
                println!("   Account: {}", login);
            }
            if let Some(saved_at) = session.saved_at {
                println!("   Saved: {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        None => {
            println!("❌ Not logged in");
            println!("   Run 'reposync login --token <TOKEN>' or set GITHUB_TOKEN.");
        }
    }

    Ok(())
}
