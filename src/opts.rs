//! Provides the [`Opts`](Opts) struct, used to read and access the program's command line
//! arguments, and [`Command`], the core operation it selects (§10.D). Subcommand *handlers* live
//! in `main.rs`; this module only defines the surface, mirroring the teacher's separation
//! between `opts.rs` parsing and `lib.rs`/`main.rs` dispatch.

use crate::util::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Factorix: a command-line manager for user-installed Factorio mods.
#[derive(Debug, Parser)]
#[command(name = "factorix", version, about)]
pub struct Opts {
    /// Sets a custom config file path, overriding the platform default location.
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Overrides the cache store root directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Overrides the Factorio `mods/` directory this program manages.
    #[arg(long, global = true, value_name = "DIR")]
    pub mods_dir: Option<PathBuf>,

    /// Overrides the default parallel download job count.
    #[arg(long, global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// Overrides the configured log level.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Skip loading configuration values from the environment variables. Primarily used for
    /// debugging.
    #[arg(long, global = true)]
    pub no_env: bool,

    /// The core operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// One core operation per §6/§10.D. Each variant is handled by a dedicated function in
/// `main.rs`; this enum only carries the parsed arguments.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List installed mods and their enabled/disabled state.
    List,
    /// Validate the installed mod set and print every issue found.
    Check,
    /// Print detailed information about one installed or portal-known mod.
    Show {
        /// The mod's internal name.
        name: String,
    },
    /// Enable a mod, pulling in its required dependencies.
    Enable {
        /// The mod's internal name.
        name: String,
    },
    /// Disable a mod, cascading to its enabled dependents.
    Disable {
        /// The mod's internal name.
        name: String,
    },
    /// Install one or more mods by `name`, `name@version`, or `name@latest`.
    Install {
        /// The mod specs to install.
        specs: Vec<String>,
        /// Also pull in required dependencies transitively.
        #[arg(long)]
        recursive: bool,
    },
    /// Uninstall a mod.
    Uninstall {
        /// The mod's internal name.
        name: String,
        /// Also uninstall every mod that depends on it.
        #[arg(long)]
        all: bool,
    },
    /// Update one or more mods, or every installed mod if none are named.
    Update {
        /// The mods to update; empty means all.
        names: Vec<String>,
    },
    /// Download a mod's archive into the download cache without installing it.
    Download {
        /// The mod's internal name.
        name: String,
        /// An explicit version to download; defaults to the latest release.
        version: Option<String>,
    },
    /// Sync the locally installed mod set to match a save file's mod list.
    Sync {
        /// Path to the Factorio save file (a zip archive containing a mod list).
        save_path: PathBuf,
    },
    /// Operate on the content-addressed cache stores.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Publish a brand new mod to the portal, uploading `archive` as its first release.
    Publish {
        /// Path to the mod's zip archive.
        archive: PathBuf,
        /// An optional changelog entry for this release.
        #[arg(long)]
        changelog: Option<String>,
    },
    /// Upload a new release of an already-published mod.
    Upload {
        /// The mod's internal name.
        name: String,
        /// Path to the release's zip archive.
        archive: PathBuf,
        /// An optional changelog entry for this release.
        #[arg(long)]
        changelog: Option<String>,
    },
    /// Request a one-time portal URL for editing an existing mod's metadata or images.
    Edit {
        /// The mod's internal name.
        name: String,
    },
}

/// `factorix cache <stat|evict>` subcommands (§6).
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Print per-store statistics (§4.A `stats`).
    Stat,
    /// Evict cache entries matching a selector.
    Evict {
        /// One of `all`, `expired`, or an age such as `7d`/`12h` meaning `older_than`.
        selector: String,
    },
}

impl Opts {
    /// Parses `Opts` from the real process command line arguments.
    pub fn get() -> Opts {
        Opts::parse()
    }

    /// Parses `Opts` from an explicit argument list, e.g. in tests.
    pub fn custom_args<I, T>(args: I) -> Opts
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Opts::parse_from(args)
    }
}
