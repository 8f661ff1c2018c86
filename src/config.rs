use anyhow::{anyhow, Context, Result};
use std::env;

use crate::client::DEFAULT_BASE_URL;

pub const DEFAULT_MARKETS: [i64; 7] = [1, 12, 976105, 976334, 976316, 136703818, 136830811];
pub const DEFAULT_BOOKMAKERS: [i64; 7] = [2, 9, 15, 187, 27802, 271057011, 271057013];

/// Configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub timezone: String,
    pub database_url: String,
    /// Stream publication is skipped when unset
    pub redis_url: Option<String>,
    pub league_ids: Vec<i64>,
    pub market_ids: Vec<i64>,
    pub bookmaker_ids: Vec<i64>,
    /// Fixtures are fetched from today to today + `lookahead_days`
    pub lookahead_days: u32,
    pub requests_per_minute: u32,
    pub poll_interval_seconds: u64,
    pub health_port: u16,
    /// If true, run once and exit (no polling loop)
    pub run_once: bool,
    pub sync_reference: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from any variable lookup; secrets fall back to Docker secret files.
    pub fn from_source<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // API key
        let api_key = match var("SPORTMONKS_KEY") {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            Some(_) => return Err(anyhow!("SPORTMONKS_KEY is set but empty")),
            None => read_secret_file("/run/secrets/sportmonks_key", "sportmonks_key")?,
        };

        // Prevent accidental use of sample/placeholder keys
        let key_lower = api_key.to_lowercase();
        if key_lower.contains("change_me")
            || key_lower.contains("your_")
            || key_lower.starts_with("sample")
        {
            return Err(anyhow!(
                "SPORTMONKS_KEY appears to be a placeholder value; replace with your real key"
            ));
        }

        let database_url = match var("DATABASE_URL") {
            Some(v) if !v.trim().is_empty() => v,
            Some(_) => return Err(anyhow!("DATABASE_URL is set but empty")),
            None => {
                let db_user = var("DB_USER").unwrap_or_else(|| "postgres".to_string());
                let db_name = var("DB_NAME").unwrap_or_else(|| "sportmonks".to_string());
                let db_host = var("DB_HOST").unwrap_or_else(|| "postgres".to_string());
                let db_port = var("DB_PORT").unwrap_or_else(|| "5432".to_string());
                let db_password = read_secret_file("/run/secrets/db_password", "db_password")?;
                format!(
                    "postgresql://{}:{}@{}:{}/{}",
                    db_user, db_password, db_host, db_port, db_name
                )
            }
        };

        let redis_url = var("REDIS_URL").filter(|v| !v.trim().is_empty());

        Ok(Self {
            api_key,
            base_url: var("SPORTMONKS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timezone: var("SPORTMONKS_TZ").unwrap_or_else(|| "UTC".to_string()),
            database_url,
            redis_url,
            league_ids: id_list(&var, "LEAGUE_IDS", &[])?,
            market_ids: id_list(&var, "MARKET_IDS", &DEFAULT_MARKETS)?,
            bookmaker_ids: id_list(&var, "BOOKMAKER_IDS", &DEFAULT_BOOKMAKERS)?,
            lookahead_days: var("LOOKAHEAD_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            requests_per_minute: var("REQUESTS_PER_MINUTE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            poll_interval_seconds: var("POLL_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            health_port: var("HEALTH_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8084),
            run_once: flag(&var, "RUN_ONCE", false),
            sync_reference: flag(&var, "SYNC_REFERENCE", true),
        })
    }
}

fn flag<F: Fn(&str) -> Option<String>>(var: &F, key: &str, default: bool) -> bool {
    var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn id_list<F: Fn(&str) -> Option<String>>(var: &F, key: &str, default: &[i64]) -> Result<Vec<i64>> {
    match var(key) {
        None => Ok(default.to_vec()),
        Some(raw) => parse_id_list(&raw).with_context(|| format!("invalid {}: {:?}", key, raw)),
    }
}

/// Parse a comma-separated list of ids; blanks are ignored.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().with_context(|| format!("not an id: {}", s)))
        .collect()
}

/// Read a secret from Docker secret file
fn read_secret_file(file_path: &str, secret_name: &str) -> Result<String> {
    std::fs::read_to_string(file_path)
        .map(|s| s.trim().to_string())
        .context(format!(
            "Secret not provided: set the environment variable or mount {} ({})",
            file_path, secret_name
        ))
}
