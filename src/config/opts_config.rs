//! Provides [`OptsConfig`], used to read config values from the running program's command line
//! arguments. This is the highest-precedence layer.

use super::{Config, ConfigSource};
use crate::{opts::Opts, util::LogLevel};

/// Contains the config values sourced from the running program's command line arguments.
#[derive(Debug, Default)]
pub struct OptsConfig {
    /// Corresponds to the global `--log-level` option.
    log_level: Option<LogLevel>,
    /// Corresponds to the global `--cache-dir` option.
    cache_dir: Option<std::path::PathBuf>,
    /// Corresponds to the global `--mods-dir` option.
    mods_dir: Option<std::path::PathBuf>,
    /// Corresponds to the global `--jobs` option.
    jobs: Option<usize>,
}

impl ConfigSource for OptsConfig {
    fn apply_to_config(self, config: Config) -> Config {
        Config {
            log_level: self.log_level.unwrap_or(config.log_level),
            cache_dir: self.cache_dir.unwrap_or(config.cache_dir),
            mods_dir: self.mods_dir.unwrap_or(config.mods_dir),
            jobs: self.jobs.or(config.jobs),
            ..config
        }
    }
}

impl OptsConfig {
    /// Returns a new `OptsConfig` built from a given `Opts` object.
    pub fn from_opts(opts: &Opts) -> Self {
        Self {
            log_level: opts.log_level,
            cache_dir: opts.cache_dir.clone(),
            mods_dir: opts.mods_dir.clone(),
            jobs: opts.jobs,
        }
    }
}
