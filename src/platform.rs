//! Provides per-OS path discovery (§10.F): where to put cached downloads, config files, mod
//! data, and transient state, without every other module needing to know which OS it's running
//! on.

use lazy_static::lazy_static;
use std::path::{Path, PathBuf};

/// A source of the four XDG-style base directories this program cares about.
///
/// Every concrete implementation falls back to a sane default when the relevant environment
/// variable or platform API is unavailable, matching `dirs`' own fallback behaviour.
pub trait Platform: std::fmt::Debug {
    /// Where cached HTTP responses and downloaded mod archives live.
    fn cache_dir(&self) -> PathBuf;
    /// Where the configuration file lives.
    fn config_dir(&self) -> PathBuf;
    /// Where persistent application data (other than cache) lives.
    fn data_dir(&self) -> PathBuf;
    /// Where transient runtime state (lock files, sockets) lives.
    fn state_dir(&self) -> PathBuf;
}

const APP_NAME: &str = "factorix";

/// Linux: `dirs::cache_dir()` / `config_dir()` / `data_dir()` honour `XDG_CACHE_HOME` et al.
/// directly. There's no `XDG_STATE_HOME` equivalent in `dirs`, so state falls back to a
/// subdirectory of the data dir, matching the XDG basedir spec's own recommendation when
/// `XDG_STATE_HOME` is unset.
#[derive(Debug, Default)]
pub struct Linux;

impl Platform for Linux {
    fn cache_dir(&self) -> PathBuf {
        dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache")).join(APP_NAME)
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config")).join(APP_NAME)
    }

    fn data_dir(&self) -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".local/share")).join(APP_NAME)
    }

    fn state_dir(&self) -> PathBuf {
        std::env::var_os("XDG_STATE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.data_dir().join("state"))
            .join(APP_NAME)
    }
}

/// macOS: `dirs` already resolves to `~/Library/Caches`, `~/Library/Application Support`, etc.
/// There's no separate "state" concept on macOS; it shares the data directory's parent.
#[derive(Debug, Default)]
pub struct MacOs;

impl Platform for MacOs {
    fn cache_dir(&self) -> PathBuf {
        dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache")).join(APP_NAME)
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config")).join(APP_NAME)
    }

    fn data_dir(&self) -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".local/share")).join(APP_NAME)
    }

    fn state_dir(&self) -> PathBuf {
        self.data_dir().join("State")
    }
}

/// Windows: `dirs` resolves cache/config/data all to subdirectories of `%APPDATA%`/`%LOCALAPPDATA%`
/// per the platform convention; there's no separate state directory concept, so it shares the
/// local app data root.
#[derive(Debug, Default)]
pub struct Windows;

impl Platform for Windows {
    fn cache_dir(&self) -> PathBuf {
        dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
    }

    fn config_dir(&self) -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
    }

    fn data_dir(&self) -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join(APP_NAME)
    }

    fn state_dir(&self) -> PathBuf {
        self.data_dir().join("State")
    }
}

/// WSL runs a Linux kernel but the user's actual home is frequently a Windows path mounted under
/// `/mnt/<drive>`. This wraps [`Linux`] and bridges any Windows drive-lettered path it might
/// encounter (e.g. from a `FACTORIX_CACHE_DIR` override copy-pasted from a Windows shell) into
/// its WSL mount equivalent.
#[derive(Debug, Default)]
pub struct Wsl {
    inner: Linux,
}

impl Platform for Wsl {
    fn cache_dir(&self) -> PathBuf {
        bridge_windows_path(self.inner.cache_dir())
    }

    fn config_dir(&self) -> PathBuf {
        bridge_windows_path(self.inner.config_dir())
    }

    fn data_dir(&self) -> PathBuf {
        bridge_windows_path(self.inner.data_dir())
    }

    fn state_dir(&self) -> PathBuf {
        bridge_windows_path(self.inner.state_dir())
    }
}

/// Translates a Windows drive-lettered path (`C:\Users\foo`) into its WSL mount equivalent
/// (`/mnt/c/Users/foo`). Paths that aren't drive-lettered are returned unchanged.
fn bridge_windows_path(path: PathBuf) -> PathBuf {
    let raw = match path.to_str() {
        Some(s) => s,
        None => return path,
    };

    let mut chars = raw.chars();
    let drive = match (chars.next(), chars.next()) {
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => letter.to_ascii_lowercase(),
        _ => return path,
    };

    let rest = &raw[2..].replace('\\', "/");
    PathBuf::from(format!("/mnt/{}{}", drive, rest))
}

/// Detects whether this process is running under WSL by checking `/proc/version` for the
/// "Microsoft" marker that the WSL kernel build embeds there.
fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

lazy_static! {
    static ref CURRENT: Box<dyn Platform + Send + Sync> = detect();
}

/// Returns the [`Platform`] implementation for the OS this process is actually running on,
/// memoized after first resolution since the answer can't change within a process lifetime.
pub fn current() -> &'static dyn Platform {
    CURRENT.as_ref()
}

#[cfg(target_os = "linux")]
fn detect() -> Box<dyn Platform + Send + Sync> {
    if is_wsl() {
        Box::new(Wsl::default())
    } else {
        Box::new(Linux)
    }
}

#[cfg(target_os = "macos")]
fn detect() -> Box<dyn Platform + Send + Sync> {
    Box::new(MacOs)
}

#[cfg(target_os = "windows")]
fn detect() -> Box<dyn Platform + Send + Sync> {
    Box::new(Windows)
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn detect() -> Box<dyn Platform + Send + Sync> {
    Box::new(Linux)
}

/// Joins a directory onto a base, creating the base if it doesn't already exist. A small helper
/// used by callers (config loading, cache store construction) that need the directory to
/// actually exist on disk rather than just know its path.
pub fn ensure_exists(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Returns whether a Factorio server process currently appears to be running, backing the
/// destructive-command guard in §7. Only implemented on Linux, where it's a cheap scan of
/// `/proc/<pid>/comm`; every other platform always reports `false` rather than pulling in a
/// process-listing dependency for a single best-effort check.
pub fn is_factorio_running() -> std::io::Result<bool> {
    is_factorio_running_impl()
}

#[cfg(target_os = "linux")]
fn is_factorio_running_impl() -> std::io::Result<bool> {
    for entry in std::fs::read_dir("/proc")? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if !entry.file_name().to_string_lossy().bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }

        match std::fs::read_to_string(entry.path().join("comm")) {
            Ok(comm) if comm.trim() == "factorio" => return Ok(true),
            _ => continue,
        }
    }

    Ok(false)
}

#[cfg(not(target_os = "linux"))]
fn is_factorio_running_impl() -> std::io::Result<bool> {
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridges_windows_drive_path() {
        let bridged = bridge_windows_path(PathBuf::from(r"C:\Users\foo\AppData\Local\factorix"));
        assert_eq!(bridged, PathBuf::from("/mnt/c/Users/foo/AppData/Local/factorix"));
    }

    #[test]
    fn leaves_non_windows_path_unchanged() {
        let path = PathBuf::from("/home/foo/.cache/factorix");
        assert_eq!(bridge_windows_path(path.clone()), path);
    }

    #[test]
    fn current_returns_same_instance_on_repeated_calls() {
        let a = current() as *const dyn Platform;
        let b = current() as *const dyn Platform;
        assert_eq!(a, b);
    }
}
