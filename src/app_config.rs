//! Application configuration loading for CLI defaults.

use std::env;
use std::fmt::Display;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use formscan_core::batch::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use formscan_core::db::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_MAX_CONNECTIONS};
use formscan_core::fetch::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_COURTESY_MAX_MS, DEFAULT_COURTESY_MIN_MS, FETCH_TIMEOUT_SECS,
};
use formscan_core::{BatchOptions, CourtesyDelay, DEFAULT_CONCURRENCY, DbOptions, FetcherOptions};
use serde::Deserialize;

/// Database file used when neither the config nor `--database` names one.
pub const DEFAULT_DATABASE_FILE: &str = "formscan.db";

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// SQLite database path.
    pub database_path: Option<PathBuf>,
    /// Parent directory for per-item temporary artifacts.
    pub work_dir: Option<PathBuf>,
    /// Batch worker count (1..=64).
    pub concurrency: Option<usize>,
    /// Per-document fetch timeout in seconds.
    pub fetch_timeout_secs: Option<u64>,
    /// HTTP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Lower bound of the randomized pre-request delay.
    pub courtesy_delay_min_ms: Option<u64>,
    /// Upper bound of the randomized pre-request delay.
    pub courtesy_delay_max_ms: Option<u64>,
    /// Database pool max connections (1..=20).
    pub db_max_connections: Option<u32>,
    /// Database busy timeout in milliseconds.
    pub db_busy_timeout_ms: Option<u32>,
    /// Completed batch statuses kept in memory.
    pub retained_batches: Option<usize>,
}

const TIMEOUT_SECS_RANGE: RangeInclusive<u64> = 1..=3600;
const DELAY_MS_RANGE: RangeInclusive<u64> = 0..=60_000;
const DB_CONNECTIONS_RANGE: RangeInclusive<u32> = 1..=20;
const DB_BUSY_TIMEOUT_MS_RANGE: RangeInclusive<u32> = 0..=120_000;
const RETAINED_BATCHES_RANGE: RangeInclusive<usize> = 1..=100_000;

impl FileConfig {
    /// Rejects values the batch runner, fetcher or pool would refuse.
    pub fn validate(&self) -> Result<()> {
        check_range(
            "concurrency",
            self.concurrency,
            &(MIN_CONCURRENCY..=MAX_CONCURRENCY),
        )?;
        check_range("fetch_timeout_secs", self.fetch_timeout_secs, &TIMEOUT_SECS_RANGE)?;
        check_range(
            "connect_timeout_secs",
            self.connect_timeout_secs,
            &TIMEOUT_SECS_RANGE,
        )?;
        check_range("courtesy_delay_min_ms", self.courtesy_delay_min_ms, &DELAY_MS_RANGE)?;
        check_range("courtesy_delay_max_ms", self.courtesy_delay_max_ms, &DELAY_MS_RANGE)?;

        if let (Some(min), Some(max)) = (self.courtesy_delay_min_ms, self.courtesy_delay_max_ms)
            && min > max
        {
            bail!(
                "Invalid config: `courtesy_delay_min_ms` ({min}) is greater than `courtesy_delay_max_ms` ({max})"
            );
        }

        check_range("db_max_connections", self.db_max_connections, &DB_CONNECTIONS_RANGE)?;
        check_range(
            "db_busy_timeout_ms",
            self.db_busy_timeout_ms,
            &DB_BUSY_TIMEOUT_MS_RANGE,
        )?;
        check_range("retained_batches", self.retained_batches, &RETAINED_BATCHES_RANGE)?;
        Ok(())
    }
}

fn check_range<T>(field: &str, value: Option<T>, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + Display,
{
    match value {
        Some(value) if !range.contains(&value) => bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        ),
        _ => Ok(()),
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path, if one could be determined.
    pub path: Option<PathBuf>,
    /// Parsed file config; defaults when no file exists.
    pub config: FileConfig,
    /// Indicates whether configuration was loaded from disk.
    pub loaded_from_file: bool,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/formscan/config.toml`
/// 2. `$HOME/.config/formscan/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("formscan")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("formscan")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from an explicit path, or the default path if present.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config,
            loaded_from_file: true,
        });
    }

    let path = resolve_default_config_path();
    match path.as_deref() {
        Some(path_ref) if path_ref.exists() => {
            let config = load_file_config(path_ref)?;
            Ok(LoadedConfig {
                path,
                config,
                loaded_from_file: true,
            })
        }
        _ => Ok(LoadedConfig {
            path,
            ..LoadedConfig::default()
        }),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let cfg: FileConfig = toml::from_str(raw)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Effective settings after merging file config with CLI overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub database_path: PathBuf,
    pub db: DbOptions,
    pub fetcher: FetcherOptions,
    pub batch: BatchOptions,
}

impl RuntimeConfig {
    /// Merges `file` with the CLI `--database` override.
    #[must_use]
    pub fn resolve(file: &FileConfig, database_override: Option<&Path>) -> Self {
        let database_path = database_override
            .map(Path::to_path_buf)
            .or_else(|| file.database_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));

        let batch_defaults = BatchOptions::default();

        Self {
            database_path,
            db: DbOptions {
                max_connections: file.db_max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
                busy_timeout_ms: file.db_busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS),
            },
            fetcher: FetcherOptions {
                connect_timeout: Duration::from_secs(
                    file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
                ),
                courtesy: CourtesyDelay::from_millis(
                    file.courtesy_delay_min_ms
                        .unwrap_or(DEFAULT_COURTESY_MIN_MS),
                    file.courtesy_delay_max_ms
                        .unwrap_or(DEFAULT_COURTESY_MAX_MS),
                ),
            },
            batch: BatchOptions {
                concurrency: file.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
                work_dir: file.work_dir.clone().unwrap_or(batch_defaults.work_dir),
                fetch_timeout: Duration::from_secs(
                    file.fetch_timeout_secs.unwrap_or(FETCH_TIMEOUT_SECS),
                ),
                retained_batches: file
                    .retained_batches
                    .unwrap_or(batch_defaults.retained_batches),
            },
        }
    }
}
