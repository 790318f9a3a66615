use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use poibox_api::Settings;
use poibox_db::DbOptions;

/// Longest accepted `POIBOX_SESSION_DAYS`.
const SESSION_DAYS_MAX: i64 = 3650;

/// Session secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub db: DbOptions,
    pub session_secret: String,
    pub settings: Settings,
}

impl Config {
    /// Reads `POIBOX_*` variables; unset ones fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let session_secret = std::env::var("POIBOX_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("POIBOX_SESSION_SECRET is unset or still a placeholder; set it in .env");
        }

        let defaults = Settings::default();
        let db_defaults = DbOptions::default();

        Ok(Self {
            host: std::env::var("POIBOX_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("POIBOX_PORT", 3000)?,
            db_path: std::env::var("POIBOX_DB_PATH")
                .unwrap_or_else(|_| "poibox.db".into())
                .into(),
            db: DbOptions {
                readers: parse_var("POIBOX_DB_READERS", db_defaults.readers)?,
                busy_timeout: Duration::from_millis(parse_var(
                    "POIBOX_DB_BUSY_TIMEOUT_MS",
                    db_defaults.busy_timeout.as_millis() as u64,
                )?),
            },
            session_secret,
            settings: Settings {
                session_days: session_days(parse_var("POIBOX_SESSION_DAYS", defaults.session_days)?)?,
                history_limit: parse_var("POIBOX_HISTORY_LIMIT", defaults.history_limit)?,
                like_reward: parse_var("POIBOX_LIKE_REWARD", defaults.like_reward)?,
            },
        })
    }
}

fn session_days(days: i64) -> Result<i64> {
    if !(1..=SESSION_DAYS_MAX).contains(&days) {
        bail!("POIBOX_SESSION_DAYS must be between 1 and {SESSION_DAYS_MAX}, got {days}");
    }
    Ok(days)
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        _ => Ok(default),
    }
}
