use std::path::PathBuf;

use anyhow::{Result, bail};

/// Placeholder session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub session_secret: String,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_secret = get("WARBLER_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("WARBLER_SESSION_SECRET is unset or still a placeholder");
        }

        let port: u16 = get("WARBLER_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()?;

        Ok(Self {
            host: get("WARBLER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("WARBLER_DB_PATH").unwrap_or_else(|| "warbler.db".into()).into(),
            static_dir: get("WARBLER_STATIC_DIR").unwrap_or_else(|| "static".into()).into(),
            session_secret,
        })
    }
}
