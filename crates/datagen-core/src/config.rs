//! Configuration module
//!
//! Client settings come from the environment (a `.env` file is loaded first).
//! Numeric values that fail to parse are reported instead of being replaced by
//! their defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const HTTP_TIMEOUT_SECS: u64 = 60;
const STAGE_TIMEOUT_SECS: u64 = 120;
const PREVIEW_ROWS: usize = 20;

/// Authentication attached by the HTTP layer. The workflow never looks at it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

/// Settings for the generation client and workflow.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub auth: Option<Auth>,
    pub http_timeout: Duration,
    /// Deadline for each network stage of a workflow run
    pub stage_timeout: Duration,
    pub download_dir: PathBuf,
    pub preview_rows: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth: None,
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            stage_timeout: Duration::from_secs(STAGE_TIMEOUT_SECS),
            download_dir: PathBuf::from("."),
            preview_rows: PREVIEW_ROWS,
        }
    }
}

impl ClientConfig {
    /// Load from the process environment: DATAGEN_API_URL (or API_URL),
    /// DATAGEN_API_TOKEN / DATAGEN_API_KEY, DATAGEN_HTTP_TIMEOUT_SECS,
    /// DATAGEN_STAGE_TIMEOUT_SECS, DATAGEN_DOWNLOAD_DIR, DATAGEN_PREVIEW_ROWS.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("DATAGEN_API_URL")
            .or_else(|| lookup("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let auth = match (lookup("DATAGEN_API_TOKEN"), lookup("DATAGEN_API_KEY")) {
            (Some(token), _) if !token.is_empty() => Some(Auth::Bearer(token)),
            (_, Some(key)) if !key.is_empty() => Some(Auth::XApiKey(key)),
            _ => None,
        };

        let http_timeout_secs: u64 =
            parse_var(&lookup, "DATAGEN_HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?;
        let stage_timeout_secs: u64 =
            parse_var(&lookup, "DATAGEN_STAGE_TIMEOUT_SECS", STAGE_TIMEOUT_SECS)?;
        let preview_rows: usize = parse_var(&lookup, "DATAGEN_PREVIEW_ROWS", PREVIEW_ROWS)?;

        let download_dir = lookup("DATAGEN_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            api_url,
            auth,
            http_timeout: Duration::from_secs(http_timeout_secs),
            stage_timeout: Duration::from_secs(stage_timeout_secs),
            download_dir,
            preview_rows,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got {:?}", key, raw)),
        None => Ok(default),
    }
}
