use anyhow::Result;

use crate::session::AuthSessionStore;

pub async fn run_logout(cache_dir: Option<String>) -> Result<()> {
    let session_store = AuthSessionStore::new(cache_dir)?;

    if !session_store.has_session_file() {
        println!("You are not logged in.");
        return Ok(());
    }

    session_store.remove_session()?;
    println!("✅ Successfully logged out.");

    Ok(())
}
