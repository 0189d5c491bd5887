//! Provides [`FileConfig`], which represents the program's TOML config file.

use super::{Config, ConfigSource};
use crate::util::LogLevel;
use log::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The config file's top-level shape. Every field is optional so a partial file only overrides
/// what it names, leaving the rest to the environment/CLI layers or the compiled-in defaults.
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct FileConfig {
    /// `[general]` section.
    #[serde(default)]
    general: GeneralOptions,
    /// `[portal]` section.
    #[serde(default)]
    portal: PortalOptions,
    /// `[cache]` section.
    #[serde(default)]
    cache: CacheOptions,
    /// `[retry]` section.
    #[serde(default)]
    retry: RetryOptions,
}

/// `[general]`: logging and concurrency.
#[derive(Debug, Deserialize, Serialize, Default)]
struct GeneralOptions {
    /// The log level.
    log_level: Option<LogLevel>,
    /// Parallel download job count.
    jobs: Option<usize>,
    /// The Factorio `mods/` directory, overriding the platform default.
    mods_dir: Option<std::path::PathBuf>,
}

/// `[portal]`: mod portal download credentials. Never contains the publish bearer key; that's
/// sourced from `FACTORIO_API_KEY` only (§6), never persisted to a config file.
#[derive(Debug, Deserialize, Serialize, Default)]
struct PortalOptions {
    /// The mod portal download username.
    username: Option<String>,
    /// The mod portal download token.
    token: Option<String>,
}

/// `[cache]`: cache store location and TTLs.
#[derive(Debug, Deserialize, Serialize, Default)]
struct CacheOptions {
    /// The cache root directory, overriding the platform default.
    dir: Option<std::path::PathBuf>,
    /// The `api` cache's TTL in seconds.
    api_ttl: Option<u64>,
}

/// `[retry]`: retry layer backoff policy (§4.C).
#[derive(Debug, Deserialize, Serialize, Default)]
struct RetryOptions {
    /// Base backoff delay, in milliseconds.
    base_ms: Option<u64>,
    /// Backoff cap, in milliseconds.
    cap_ms: Option<u64>,
    /// Maximum retry attempts.
    max_attempts: Option<u32>,
    /// The subset of `5xx` status codes treated as transient and worth retrying.
    server_error_statuses: Option<Vec<u16>>,
}

impl FileConfig {
    /// Writes a fully-populated, commented example config file to `writer`. Used by a `config
    /// init`-style command to scaffold a starting point for the user.
    pub fn write_default_to_writer<W>(writer: &mut W) -> anyhow::Result<()>
    where
        W: std::io::Write,
    {
        let default = FileConfig::default();
        let serialised = toml::to_string(&default)?;

        debug!("Default config file:\n{}", serialised);
        write!(writer, "{}", serialised)?;
        Ok(())
    }

    /// Reads and parses a `FileConfig` from a given path. The caller is expected to have already
    /// checked the path exists; a missing file is not itself an error at this layer (an absent
    /// config file simply means "no file layer"), see [`Config::assemble`](super::Config::assemble).
    pub fn from_path<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&contents)?)
    }
}

impl ConfigSource for FileConfig {
    fn apply_to_config(self, config: Config) -> Config {
        Config {
            portal_username: self.portal.username.unwrap_or(config.portal_username),
            portal_token: self.portal.token.unwrap_or(config.portal_token),
            log_level: self.general.log_level.unwrap_or(config.log_level),
            jobs: self.general.jobs.or(config.jobs),
            mods_dir: self.general.mods_dir.unwrap_or(config.mods_dir),
            cache_dir: self.cache.dir.unwrap_or(config.cache_dir),
            api_cache_ttl: self.cache.api_ttl.unwrap_or(config.api_cache_ttl),
            retry_base_ms: self.retry.base_ms.unwrap_or(config.retry_base_ms),
            retry_cap_ms: self.retry.cap_ms.unwrap_or(config.retry_cap_ms),
            retry_max_attempts: self.retry.max_attempts.unwrap_or(config.retry_max_attempts),
            retry_server_error_statuses: self.retry.server_error_statuses.unwrap_or(config.retry_server_error_statuses),
            ..config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let file: FileConfig = toml::from_str(
            r#"
            [general]
            log_level = "debug"
            "#,
        )
        .expect("failed to parse toml");

        let config = file.apply_to_config(Config::default());
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.api_cache_ttl, Config::default().api_cache_ttl);
    }

    #[test]
    fn empty_file_changes_nothing() {
        let file: FileConfig = toml::from_str("").expect("failed to parse empty toml");
        let before = Config::default();
        let after = file.apply_to_config(Config::default());
        assert_eq!(before.api_cache_ttl, after.api_cache_ttl);
        assert_eq!(before.retry_max_attempts, after.retry_max_attempts);
    }
}
