//! Process-wide configuration (spec §6 "Configuration"), loaded the way the
//! teacher's `models::Config::from_env` does: `dotenv` first, then env vars
//! with fallbacks.

use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    /// `"<key>:<iv>"` for the opaque id codec (spec §4.4, §6).
    pub codec_key: String,
    /// If true, non-test requests never receive a bid (spec §4.5, §6).
    pub test_only: bool,
    pub catalog_db_path: String,
    pub recall_db_path: String,
    pub catalog_reload_interval: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let codec_key = std::env::var("CODEC_KEY")
            .context("CODEC_KEY must be set to \"<16-byte key>:<16-byte iv>\"")?;

        let test_only = std::env::var("TEST_ONLY")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let catalog_db_path = std::env::var("CATALOG_DB_PATH").unwrap_or_else(|_| "./catalog.db".to_string());
        let recall_db_path = std::env::var("RECALL_DB_PATH").unwrap_or_else(|_| "./recalls.db".to_string());

        let catalog_reload_interval = std::env::var("CATALOG_RELOAD_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        Ok(Self {
            bind_addr,
            codec_key,
            test_only,
            catalog_db_path,
            recall_db_path,
            catalog_reload_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_parses_truthy_variants() {
        for value in ["1", "true", "TRUE", "on", "ON"] {
            std::env::set_var("TEST_ONLY", value);
            std::env::set_var("CODEC_KEY", "0123456789abcdef:fedcba9876543210");
            let config = Config::from_env().unwrap();
            assert!(config.test_only, "expected {value} to parse as true");
        }
        std::env::remove_var("TEST_ONLY");
        std::env::remove_var("CODEC_KEY");
    }
}
