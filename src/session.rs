//! Credential storage.
//!
//! Credentials come from, in order:
//! 1. `REPOSYNC_SESSION_AUTH` (session JSON)
//! 2. `GITHUB_TOKEN`, with `REPOSYNC_API_URL` or the public API root
//! 3. `session.json` in the cache directory (`~/.reposync` by default)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::api::{AuthenticatedClient, DEFAULT_API_URL};

pub const SESSION_AUTH_ENV: &str = "REPOSYNC_SESSION_AUTH";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const API_URL_ENV: &str = "REPOSYNC_API_URL";

/// Session data structure stored in session.json
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub access_token: String,
    #[serde(alias = "apiURL")]
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SessionData {
    /// Client for this session, optionally against a different API root.
    pub fn client(&self, api_url_override: Option<&str>) -> Result<AuthenticatedClient> {
        let raw = api_url_override.unwrap_or(&self.api_url);
        let api_url = Url::parse(raw).with_context(|| format!("Invalid API URL: {}", raw))?;
        Ok(AuthenticatedClient::new(api_url, self.access_token.clone()))
    }
}

impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("access_token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("login", &self.login)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// Where the active credentials were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    SessionEnv,
    TokenEnv,
    SessionFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::SessionEnv => write!(f, "{} environment variable", SESSION_AUTH_ENV),
            CredentialSource::TokenEnv => write!(f, "{} environment variable", TOKEN_ENV),
            CredentialSource::SessionFile => write!(f, "session file"),
        }
    }
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Authentication session store
///
/// Manages session persistence in ~/.reposync/session.json (or a custom cache directory).
pub struct AuthSessionStore {
    session_path: PathBuf,
    env: EnvLookup,
}

impl AuthSessionStore {
    /// Create a new session store
    ///
    /// # Arguments
    /// * `cache_dir` - Optional custom cache directory. Defaults to ~/.reposync
    pub fn new(cache_dir: Option<String>) -> Result<Self> {
        Self::with_env(cache_dir, |name| std::env::var(name).ok())
    }

    /// Like [`new`](Self::new), reading environment variables through `env`.
    pub fn with_env<F>(cache_dir: Option<String>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let base_dir = match cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".reposync"),
        };

        // Create directory if it doesn't exist
        std::fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", base_dir))?;

        Ok(Self {
            session_path: base_dir.join("session.json"),
            env: Box::new(env),
        })
    }

    /// Get the session file path
    pub fn session_path(&self) -> &PathBuf {
        &self.session_path
    }

    fn env_var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|v| !v.is_empty())
    }

    /// Whether the session file itself holds a valid session.
    pub fn has_session_file(&self) -> bool {
        if !self.session_path.exists() {
            return false;
        }
        match std::fs::read_to_string(&self.session_path) {
            Ok(content) => parse_session(&content).is_some(),
            Err(e) => {
                error!("Failed to read session file: {}", e);
                false
            }
        }
    }

    /// Get the current credentials and where they came from.
    pub fn get_session(&self) -> Result<Option<(SessionData, CredentialSource)>> {
        if let Some(raw) = self.env_var(SESSION_AUTH_ENV) {
            if let Some(session) = parse_session(&raw) {
                debug!("Using credentials from {}", SESSION_AUTH_ENV);
                return Ok(Some((session, CredentialSource::SessionEnv)));
            }
        }

        if let Some(token) = self.env_var(TOKEN_ENV) {
            debug!("Using credentials from {}", TOKEN_ENV);
            let session = SessionData {
                access_token: token,
                api_url: self
                    .env_var(API_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                login: None,
                saved_at: None,
            };
            return Ok(Some((session, CredentialSource::TokenEnv)));
        }

        if !self.session_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.session_path)
            .with_context(|| format!("Failed to read session file: {:?}", self.session_path))?;

        if let Some(session) = parse_session(&content) {
            return Ok(Some((session, CredentialSource::SessionFile)));
        }

        warn!("Invalid session data found, removing session file");
        let _ = self.remove_session();
        Ok(None)
    }

    /// Save a new session
    pub fn save_session(&self, access_token: &str, api_url: &str, login: &str) -> Result<()> {
        let session = SessionData {
            access_token: access_token.to_string(),
            api_url: api_url.to_string(),
            login: Some(login.to_string()),
            saved_at: Some(Utc::now()),
        };

        let content =
            serde_json::to_string_pretty(&session).context("Failed to serialize session data")?;

        std::fs::write(&self.session_path, content)
            .with_context(|| format!("Failed to write session file: {:?}", self.session_path))?;

        info!("Session saved successfully");
        debug!("Session saved to {:?}", self.session_path);

        Ok(())
    }

    /// Remove the current session
    pub fn remove_session(&self) -> Result<()> {
        if self.session_path.exists() {
            std::fs::remove_file(&self.session_path).with_context(|| {
                format!("Failed to remove session file: {:?}", self.session_path)
            })?;
        }

        info!("Session removed successfully");

        Ok(())
    }
}

/// Parse and validate session JSON.
fn parse_session(raw: &str) -> Option<SessionData> {
    match serde_json::from_str::<SessionData>(raw) {
        Ok(session) => {
            if session.access_token.is_empty() || Url::parse(&session.api_url).is_err() {
                warn!("Session validation failed: missing or invalid required fields");
                return None;
            }
            Some(session)
        }
        Err(e) => {
            warn!("Failed to parse session JSON: {}", e);
            None
        }
    }
}
