use anyhow::Result;
use figment::{Figment, providers::{Format, Toml, Env, Serialized}};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::api::LatencySettings;

/// Longest wallet session a restore will honor.
pub const MAX_SESSION_AGE_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_path: String,
    pub session_max_age_hours: i64,
    pub exit_fee_bps: u32,
    pub default_reinvestment_percentage: u8,
    pub refresh_interval_ms: u64,
    pub rng_seed: Option<u64>,
    pub latency: LatencySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: "tsrt_storage.json".to_string(),
            session_max_age_hours: 24,
            exit_fee_bps: 50,
            default_reinvestment_percentage: 70,
            refresh_interval_ms: 5000,
            rng_seed: None,
            latency: LatencySettings::default(),
        }
    }
}

impl Config {
    /// Defaults with every simulated delay removed.
    pub fn without_latency() -> Self {
        Self {
            latency: LatencySettings::zero(),
            ..Self::default()
        }
    }

    pub fn exit_fee(&self) -> Decimal {
        Decimal::new(self.exit_fee_bps as i64, 4)
    }
}

pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_file = config_path.unwrap_or("config.toml");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_file))
        .merge(Env::prefixed("TSRT_"))
        .extract()?;

    validate_config(&config)?;

    Ok(config)
}

pub fn generate_sample_config() -> Result<()> {
    let config = Config::default();
    let toml_content = toml::to_string_pretty(&config)?;

    fs::write("config.toml", toml_content)?;

    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.storage_path.trim().is_empty() {
        return Err(anyhow::anyhow!("storage_path must not be empty"));
    }

    if config.session_max_age_hours <= 0 {
        return Err(anyhow::anyhow!("session_max_age_hours must be positive"));
    }

    if config.session_max_age_hours > MAX_SESSION_AGE_HOURS {
        return Err(anyhow::anyhow!(
            "session_max_age_hours must be at most {}",
            MAX_SESSION_AGE_HOURS
        ));
    }

    if config.exit_fee_bps >= 10_000 {
        return Err(anyhow::anyhow!("exit_fee_bps must be below 10000"));
    }

    if config.default_reinvestment_percentage > 100 {
        return Err(anyhow::anyhow!("default_reinvestment_percentage must be at most 100"));
    }

    if config.refresh_interval_ms < 100 {
        return Err(anyhow::anyhow!("refresh_interval_ms must be at least 100ms"));
    }

    Ok(())
}
