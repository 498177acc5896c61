// ⚙️ Configuration
//
// Layers, later wins:
// 1. Built-in defaults
// 2. TOML file (`hisaab.toml` in the working directory, or an explicit path)
// 3. Environment variables prefixed with HISAAB_ (e.g. HISAAB_ACTIVITY_LIMIT=10)

use crate::activity::{
    ActivityMerger, DEFAULT_ACTIVITY_LIMIT, DEFAULT_SOURCE_CURRENCY, DEFAULT_TARGET_CURRENCY,
};
use anyhow::{Context, Result};
use chrono::Local;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "hisaab";
pub const DEFAULT_DATABASE_PATH: &str = "hisaab.db";
pub const DEFAULT_LOG_FILTER: &str = "hisaab=info";
const ENV_PREFIX: &str = "HISAAB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// SQLite database backing the store
    pub database_path: PathBuf,

    /// Number of items kept in the activity feed
    pub activity_limit: usize,

    /// Currency of special balances and bank ledgers
    pub source_currency: String,

    /// Currency foreign transfers are converted into
    pub target_currency: String,

    /// tracing filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
            source_currency: DEFAULT_SOURCE_CURRENCY.to_string(),
            target_currency: DEFAULT_TARGET_CURRENCY.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load defaults → file → environment.
    ///
    /// An explicit `path` must exist; the default `hisaab.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with(path: Option<&Path>, environment: Environment) -> Result<Self> {
        let defaults = EngineConfig::default();

        let mut builder = Config::builder()
            .set_default(
                "database_path",
                defaults.database_path.to_string_lossy().to_string(),
            )?
            .set_default("activity_limit", defaults.activity_limit as i64)?
            .set_default("source_currency", defaults.source_currency)?
            .set_default("target_currency", defaults.target_currency)?
            .set_default("log_filter", defaults.log_filter)?;

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings = builder
            .add_source(environment.try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        let config: EngineConfig = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Activity merger in the local time zone with the configured currencies.
    pub fn activity_merger(&self) -> ActivityMerger<Local> {
        ActivityMerger::local().with_currencies(&self.source_currency, &self.target_currency)
    }
}
