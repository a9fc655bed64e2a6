use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::cache::ReferenceCache;
use crate::error::KeggError;
use crate::reference::DEFAULT_REFERENCE_BASE_URL;

pub const DEFAULT_CONFIG_FILE: &str = "kegg-analyzer.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub reference_base_url: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub reference_base_url: String,
    pub cache_dir: Utf8PathBuf,
    pub timeout: Duration,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, KeggError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| KeggError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| KeggError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, KeggError> {
        let cache_dir = match config.cache_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => ReferenceCache::default_root()?,
        };
        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(KeggError::ConfigParse(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(ResolvedConfig {
            reference_base_url: config
                .reference_base_url
                .unwrap_or_else(|| DEFAULT_REFERENCE_BASE_URL.to_string()),
            cache_dir,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
