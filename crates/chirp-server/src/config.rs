use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::warn;

const DEV_SECRET: &str = "dev-secret-change-me";

/// Secrets that ship in sample `.env` files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "changeme",
    "secret",
    "dev-secret-change-me",
];

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub admin_username: Option<String>,
    pub poll_interval: Duration,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = var("CHIRP_JWT_SECRET").unwrap_or_else(|| DEV_SECRET.into());
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            warn!("CHIRP_JWT_SECRET is unset or still a placeholder; tokens are forgeable");
        }

        let port = match var("CHIRP_PORT") {
            Some(p) => p.parse().with_context(|| format!("invalid CHIRP_PORT '{}'", p))?,
            None => 3000,
        };

        let poll_ms = match var("CHIRP_POLL_INTERVAL_MS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid CHIRP_POLL_INTERVAL_MS '{}'", v))?,
            None => DEFAULT_POLL_INTERVAL_MS,
        };
        if poll_ms == 0 {
            bail!("CHIRP_POLL_INTERVAL_MS must be positive");
        }

        Ok(Self {
            host: var("CHIRP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("CHIRP_DB_PATH").unwrap_or_else(|| "chirp.db".into()).into(),
            jwt_secret,
            admin_username: var("CHIRP_ADMIN_USERNAME"),
            poll_interval: Duration::from_millis(poll_ms),
        })
    }
}
