//! Provides the [`Config`](Config) object, the program-wide collection of configuration values,
//! assembled from three layers applied in increasing precedence: compiled-in defaults, the
//! config file, the environment, and finally the command line.

mod env_config;
mod file_config;
mod opts_config;

use crate::util::LogLevel;
pub use env_config::EnvConfig;
pub use file_config::FileConfig;
pub use opts_config::OptsConfig;
use std::path::PathBuf;

/// The prefix used with every environment variable related to the program configuration.
pub const APP_PREFIX: &str = "FACTORIX_";
/// The default location of the config file, relative to the platform config directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "factorix.toml";
/// The default API cache TTL in seconds (1 hour), per §4.A.
const DEFAULT_API_CACHE_TTL: u64 = 3600;
/// The default retry backoff base delay in milliseconds.
const DEFAULT_RETRY_BASE_MS: u64 = 1_000;
/// The default retry backoff cap in milliseconds.
const DEFAULT_RETRY_CAP_MS: u64 = 30_000;
/// The default maximum retry attempts.
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;
/// The default cap on parallel download jobs.
pub const DEFAULT_JOBS_CAP: usize = 8;
/// The default subset of `5xx` statuses the retry layer treats as transient (§4.C).
pub fn default_retry_server_error_statuses() -> Vec<u16> {
    crate::http::retry::DEFAULT_RETRYABLE_SERVER_ERRORS.to_vec()
}

/// A layer of configuration values able to merge itself into a [`Config`], overriding only the
/// fields it carries. Implemented by [`FileConfig`], [`EnvConfig`] and [`OptsConfig`], applied
/// in that order so command-line flags win over the environment, which wins over the file.
pub trait ConfigSource {
    /// Applies this layer's values onto `config`, returning the merged result.
    fn apply_to_config(self, config: Config) -> Config;
}

/// The program-wide collection of configuration values.
///
/// Built by starting from [`Config::default`] and folding each [`ConfigSource`] layer over it in
/// turn. Library code never mutates a `Config` in place; each layer produces a new value via
/// struct-update syntax (`..config`), the same pattern the teacher's `EnvConfig`/`FileConfig`/
/// `OptsConfig` use.
#[derive(Debug, Clone)]
pub struct Config {
    /// The username used to authenticate download requests against the mod portal.
    pub portal_username: String,
    /// The token used to authenticate download requests against the mod portal.
    pub portal_token: String,
    /// The bearer API key used for portal write operations (`FACTORIO_API_KEY`). `None` unless
    /// a publish/edit operation is attempted.
    pub api_key: Option<String>,
    /// The logging verbosity.
    pub log_level: LogLevel,
    /// The root directory under which the three named cache stores live.
    pub cache_dir: PathBuf,
    /// The Factorio `mods/` directory this program manages: installed archives,
    /// `mod-list.json`, and `mod-settings.dat` all live here.
    pub mods_dir: PathBuf,
    /// The `download` cache's TTL in seconds. `None` means unlimited (immutable artifacts).
    pub download_cache_ttl: Option<u64>,
    /// The `api` cache's TTL in seconds.
    pub api_cache_ttl: u64,
    /// The `info_json` cache's TTL in seconds. `None` means unlimited.
    pub info_json_cache_ttl: Option<u64>,
    /// The retry layer's base backoff delay, in milliseconds.
    pub retry_base_ms: u64,
    /// The retry layer's backoff cap, in milliseconds.
    pub retry_cap_ms: u64,
    /// The retry layer's maximum attempt count.
    pub retry_max_attempts: u32,
    /// The subset of `5xx` status codes the retry layer treats as transient and worth retrying
    /// (§4.C: "transient 5xx (subset configurable)").
    pub retry_server_error_statuses: Vec<u16>,
    /// Parallel download job count. `None` means "number of target mods, capped at
    /// [`DEFAULT_JOBS_CAP`]".
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            portal_username: String::new(),
            portal_token: String::new(),
            api_key: None,
            log_level: LogLevel::default(),
            cache_dir: crate::platform::current().cache_dir(),
            mods_dir: crate::platform::current().data_dir().join("mods"),
            download_cache_ttl: None,
            api_cache_ttl: DEFAULT_API_CACHE_TTL,
            info_json_cache_ttl: None,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
            retry_cap_ms: DEFAULT_RETRY_CAP_MS,
            retry_max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            retry_server_error_statuses: default_retry_server_error_statuses(),
            jobs: None,
        }
    }
}

impl Config {
    /// Assembles the final `Config` by folding the file, environment and command-line layers
    /// over the compiled-in defaults, in that precedence order.
    ///
    /// `opts.no_env` skips the environment layer entirely, matching the teacher's `--no-env`
    /// debugging flag.
    pub fn assemble(opts: &crate::opts::Opts) -> anyhow::Result<Config> {
        let mut config = Config::default();

        if let Some(path) = &opts.config {
            if path.exists() {
                config = FileConfig::from_path(path)?.apply_to_config(config);
            }
        } else {
            let default_path = crate::platform::current().config_dir().join(DEFAULT_CONFIG_FILE_NAME);
            if default_path.exists() {
                config = FileConfig::from_path(&default_path)?.apply_to_config(config);
            }
        }

        if !opts.no_env {
            config = EnvConfig::from_env()?.apply_to_config(config);
        }

        config = OptsConfig::from_opts(opts).apply_to_config(config);

        Ok(config)
    }

    /// Prints debug information about the environment variables and the assembled config. Never
    /// logs `portal_token` or `api_key` values themselves.
    pub fn debug_values(&self) {
        log::debug!("{:?}", crate::util::env::dump_lines(APP_PREFIX));
        log::debug!(
            "portal_username={:?} log_level={:?} cache_dir={:?} jobs={:?}",
            self.portal_username,
            self.log_level,
            self.cache_dir,
            self.jobs
        );
    }

    /// Returns the configured jobs count, resolving the default against a given number of
    /// targets as described in §5.
    pub fn resolve_jobs(&self, target_count: usize) -> usize {
        self.jobs.unwrap_or_else(|| target_count.min(DEFAULT_JOBS_CAP)).max(1)
    }
}
