use crate::fetcher::FetchOptions;
use crate::manifest::{self, Manifest};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration loaded from `~/.config/zkparams/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    /// Prefix for manifest entries without an explicit `url`.
    pub base_url: String,
    /// Destination directory; the per-OS default when unset.
    pub dest_dir: Option<PathBuf>,
    /// TOML manifest replacing the built-in Sapling table.
    pub manifest_path: Option<PathBuf>,
    /// Entries processed concurrently.
    pub max_parallel: usize,
    /// Transport receive buffer in bytes (minimum 1024).
    pub buffer_size: usize,
    pub connect_timeout_secs: u64,
    /// Bytes/sec below which a transfer counts as stalled.
    pub low_speed_limit: u32,
    /// Seconds a transfer may stay stalled before it is aborted.
    pub low_speed_time_secs: u64,
    /// Hard cap on a single transfer in seconds.
    pub timeout_secs: u64,
    /// Consecutive empty reads tolerated before a fetch fails.
    pub max_empty_chunks: u32,
    /// Accept `http://` locators (local mirrors only).
    pub allow_plain_http: bool,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        let fetch = FetchOptions::default();
        Self {
            base_url: manifest::DEFAULT_BASE_URL.to_string(),
            dest_dir: None,
            manifest_path: None,
            max_parallel: 1,
            buffer_size: fetch.buffer_size,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            low_speed_limit: fetch.low_speed_limit,
            low_speed_time_secs: fetch.low_speed_time.as_secs(),
            timeout_secs: fetch.timeout.as_secs(),
            max_empty_chunks: fetch.max_empty_chunks,
            allow_plain_http: fetch.allow_plain_http,
        }
    }
}

impl ParamsConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            buffer_size: self.buffer_size,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            max_empty_chunks: self.max_empty_chunks,
            allow_plain_http: self.allow_plain_http,
        }
    }

    /// The configured manifest file, or the built-in Sapling table.
    pub fn load_manifest(&self) -> Result<Manifest> {
        match &self.manifest_path {
            Some(path) => Manifest::load(path, &self.base_url),
            None => Manifest::sapling(&self.base_url).context("built-in manifest"),
        }
    }

    /// Destination directory from config, else the platform default.
    pub fn resolve_dest_dir(&self) -> Result<PathBuf> {
        match &self.dest_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::paths::default_params_dir(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("zkparams")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ParamsConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<ParamsConfig> {
    if !path.exists() {
        let default_cfg = ParamsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ParamsConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
