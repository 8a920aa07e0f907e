use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Default refinement budget when a request does not name one.
    pub max_iterations: u32,
    /// Per-call timeout for every LLM request.
    pub llm_timeout: Duration,
    pub artifact_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let anthropic_api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("Required environment variable 'ANTHROPIC_API_KEY' is not set")?;

        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let max_iterations = parse_or(&lookup, "MAX_ITERATIONS", 3u32)?;
        if max_iterations == 0 {
            bail!("MAX_ITERATIONS must be at least 1");
        }
        let timeout_secs = parse_or(&lookup, "LLM_TIMEOUT_SECS", 120u64)?;
        if timeout_secs == 0 {
            bail!("LLM_TIMEOUT_SECS must be at least 1");
        }

        Ok(Config {
            anthropic_api_key,
            port,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            max_iterations,
            llm_timeout: Duration::from_secs(timeout_secs),
            artifact_dir: lookup("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./artifacts")),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
    }
}
