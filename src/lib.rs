//! Factorix: a command-line manager for user-installed Factorio mods.
//!
//! The crate is organized as independent, mostly I/O-free subsystems wired together by the
//! orchestration layer in `main.rs`: [`cache`] (the content-addressed filesystem stores),
//! [`http`] (the transport/retry/cache client stack and the mod portal API client),
//! [`dependency`] (graph building, validation and planning), [`mods`] (the data model: versions,
//! dependency strings, releases, `info.json`, `mod-list.json`), [`config`]/[`opts`] (layered
//! configuration and CLI parsing), and a handful of smaller supporting modules.

pub mod cache;
pub mod config;
pub mod dependency;
pub mod error;
pub mod http;
pub mod log;
pub mod modsettings;
pub mod mods;
pub mod opts;
pub mod platform;
pub mod progress;
pub mod util;

/// The program's version at build-time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
