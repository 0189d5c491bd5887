//! Provides [`EnvConfig`], used to read config values from the running program's environment
//! variables.

use super::{Config, ConfigSource, APP_PREFIX};
use crate::util;
use anyhow::Context;
use serde::Deserialize;

/// Config values sourced from the running program's environment variables, each prefixed with
/// [`APP_PREFIX`]. All fields are optional since the environment layer only overrides values the
/// file layer (or compiled-in defaults) already established.
#[derive(Debug, Deserialize, Default)]
pub struct EnvConfig {
    /// `FACTORIX_PORTAL_USERNAME`.
    pub portal_username: Option<String>,
    /// `FACTORIX_PORTAL_TOKEN`.
    pub portal_token: Option<String>,
    /// `FACTORIX_LOG_LEVEL`.
    pub log_level: Option<util::LogLevel>,
    /// `FACTORIX_CACHE_DIR`.
    pub cache_dir: Option<std::path::PathBuf>,
    /// `FACTORIX_MODS_DIR`.
    pub mods_dir: Option<std::path::PathBuf>,
    /// `FACTORIX_API_CACHE_TTL`, in seconds.
    pub api_cache_ttl: Option<u64>,
    /// `FACTORIX_JOBS`.
    pub jobs: Option<usize>,
    /// Not read via `envy`; populated separately from the unprefixed `FACTORIO_API_KEY`
    /// variable, the official Factorio tooling convention rather than something this program
    /// invented.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl EnvConfig {
    /// Returns a new `EnvConfig` built from the running program's environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut env = envy::prefixed(APP_PREFIX).from_env::<Self>().with_context(|| {
            format!(
                "Failed to load config from environment variables:\n{}",
                util::env::dump_string(APP_PREFIX)
            )
        })?;
        env.api_key = std::env::var("FACTORIO_API_KEY").ok();
        Ok(env)
    }
}

impl ConfigSource for EnvConfig {
    /// Applies the contained config values to a given `Config`, returning a new `Config` with the
    /// values set.
    // clippy complains that the config parameter should be taken by reference, but if it is the
    // ..config will fail
    #[allow(clippy::needless_pass_by_value)]
    fn apply_to_config(self, config: Config) -> Config {
        Config {
            portal_username: self.portal_username.unwrap_or(config.portal_username),
            portal_token: self.portal_token.unwrap_or(config.portal_token),
            api_key: self.api_key.or(config.api_key),
            log_level: self.log_level.unwrap_or(config.log_level),
            cache_dir: self.cache_dir.unwrap_or(config.cache_dir),
            mods_dir: self.mods_dir.unwrap_or(config.mods_dir),
            api_cache_ttl: self.api_cache_ttl.unwrap_or(config.api_cache_ttl),
            jobs: self.jobs.or(config.jobs),
            ..config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazy_static::lazy_static;
    use std::sync::Mutex;

    // Tests that touch process environment variables must not run concurrently with each other;
    // see the teacher's `config.rs` `SERIAL_MUTEX` for the same pattern.
    lazy_static! {
        static ref SERIAL_MUTEX: Mutex<()> = Mutex::new(());
    }

    #[test]
    fn reads_prefixed_vars() {
        let _s = SERIAL_MUTEX.lock().expect("failed to lock serial mutex");
        std::env::set_var("FACTORIX_PORTAL_USERNAME", "someone");
        std::env::set_var("FACTORIX_JOBS", "3");

        let env = EnvConfig::from_env().expect("failed to read env config");
        assert_eq!(env.portal_username.as_deref(), Some("someone"));
        assert_eq!(env.jobs, Some(3));

        std::env::remove_var("FACTORIX_PORTAL_USERNAME");
        std::env::remove_var("FACTORIX_JOBS");
    }

    #[test]
    fn unset_fields_stay_none() {
        let _s = SERIAL_MUTEX.lock().expect("failed to lock serial mutex");
        std::env::remove_var("FACTORIX_LOG_LEVEL");
        std::env::remove_var("FACTORIO_API_KEY");

        let env = EnvConfig::from_env().expect("failed to read env config");
        assert_eq!(env.log_level, None);
        assert_eq!(env.api_key, None);
    }
}
