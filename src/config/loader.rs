use std::path::PathBuf;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub inputs: InputPaths,
    pub outputs: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputPaths {
    /// Directory the quote feed drops its daily files into
    pub quote_dir: PathBuf,
    /// The most recently modified file with this prefix is priced
    #[serde(default = "default_quote_prefix")]
    pub quote_prefix: String,
    pub prior_day_file: PathBuf,
    pub hierarchy_file: PathBuf,
    pub factor_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default = "enabled")]
    pub write_filter_file: bool,
    #[serde(default = "enabled")]
    pub write_counters: bool,
    #[serde(default = "enabled")]
    pub write_manifest: bool,
    #[serde(default)]
    pub write_metrics: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "enabled")]
    pub parallel: bool,
    /// Worker threads for per-instrument selection; rayon's default when unset
    pub threads: Option<usize>,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            parallel: true,
            threads: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_quote_prefix() -> String {
    "mw-set".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn enabled() -> bool {
    true
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("LOANPX").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Build from an in-memory TOML document; used by tests and tooling.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))
    }
}
