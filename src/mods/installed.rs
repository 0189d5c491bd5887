//! Provides [`InstalledMod`] and [`scan_directory`], which discover the mods actually present on
//! disk in a Factorio `mods/` directory (§3).

use super::{info::Info, version::ModVersion};
use crate::cache::CacheStore;
use crate::util::ext::{PathExt, ZipExt};
use std::path::{Path, PathBuf};

/// An internal name, version and `info.json` read out of a single mod zip archive on disk.
///
/// A given identifier may have multiple installed versions side by side (Factorio allows this);
/// [`scan_directory`] returns one entry per zip, so callers that need the *active* version per
/// identifier go through the dependency engine's graph builder (§4.E.2), not this module.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledMod {
    /// The mod's internal name, from `info.json`.
    pub identifier: String,
    /// The mod's version, from `info.json`.
    pub version: ModVersion,
    /// The mod's parsed `info.json`.
    pub info: Info,
    /// The path to the zip archive this mod was read from.
    pub zip_path: PathBuf,
}

/// The `info.json` entry name inside a mod zip archive. Factorio mod zips nest everything under
/// a single top-level directory (`mod-name_1.2.3/info.json`), so this is matched by file name
/// rather than a fixed path.
const INFO_JSON: &str = "info.json";

impl InstalledMod {
    /// Reads a single mod zip archive and parses its `info.json`.
    pub fn from_zip<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut found = archive.find_files(&[INFO_JSON])?;
        let (_, bytes) = found
            .pop()
            .ok_or_else(|| crate::error::Error::FileFormat(format!("{}: missing info.json", path.get_string()?)))?;

        let info: Info = serde_json::from_slice(&bytes)?;

        Ok(InstalledMod {
            identifier: info.name.clone(),
            version: info.version,
            info,
            zip_path: path.to_path_buf(),
        })
    }
}

/// Reads a mod zip's `info.json`, consulting the `info_json` cache store first (§4.A: "extracted
/// metadata, unlimited TTL").
///
/// The cache key mixes `download_url` and `internal_name` (`blake2b_hex("{download_url}|{name}")`)
/// rather than keying on the URL alone: the same download URL can end up reused across an
/// in-place update, and keying on the URL alone would let a stale cached `info.json` from an
/// older version alias onto a newer archive at the same path. Mixing in the internal name doesn't
/// fully solve that (a version bump keeps both download URL and name constant), but it does what
/// the archive's own content doesn't expose up front without already unzipping it: it stops the
/// cache from returning a *different mod's* metadata on a URL collision.
///
/// A miss (or an unreadable cache entry) falls through to actually unzipping and parsing
/// `info.json`, then populates the cache for next time. A failure to populate the cache is logged
/// and otherwise ignored; it doesn't fail the extraction itself.
pub fn extract_info_json_cached(zip_path: &Path, download_url: &str, internal_name: &str, cache: &CacheStore) -> anyhow::Result<Info> {
    let key = CacheStore::key_for(&format!("{}|{}", download_url, internal_name));

    if let Some(bytes) = cache.read(&key)? {
        if let Ok(info) = serde_json::from_slice::<Info>(&bytes) {
            return Ok(info);
        }
        log::warn!("discarding unparsable info_json cache entry for '{}'", internal_name);
    }

    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut found = archive.find_files(&[INFO_JSON])?;
    let (_, bytes) = found
        .pop()
        .ok_or_else(|| crate::error::Error::FileFormat(format!("{}: missing info.json", zip_path.get_string()?)))?;

    if let Err(e) = cache.store_bytes(&key, &bytes) {
        log::warn!("failed to populate info_json cache for '{}': {}", internal_name, e);
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// Scans a Factorio `mods/` directory for `*.zip` archives and parses each one's `info.json`.
/// Archives that fail to parse are skipped with a warning rather than aborting the whole scan —
/// one corrupt mod shouldn't make every other installed mod invisible.
pub fn scan_directory<P>(directory: P) -> anyhow::Result<Vec<InstalledMod>> {
    let pattern = directory.as_ref().join("*.zip");
    let pattern = pattern.get_str()?;

    let mut mods = Vec::new();
    for entry in glob::glob(pattern)? {
        let path = entry?;
        match InstalledMod::from_zip(&path) {
            Ok(installed) => mods.push(installed),
            Err(e) => log::warn!("Skipping '{}': {}", path.display(), e),
        }
    }

    Ok(mods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::FileOptions;

    fn write_mod_zip(dir: &Path, file_name: &str, info_json: &str) -> PathBuf {
        let path = dir.join(file_name);
        let file = std::fs::File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("mod/info.json", FileOptions::default()).unwrap();
        zip.write_all(info_json.as_bytes()).unwrap();
        zip.finish().unwrap();
        path
    }

    #[test]
    fn reads_info_json_from_zip() {
        let dir = tempdir().unwrap();
        let path = write_mod_zip(
            dir.path(),
            "example_1.0.0.zip",
            r#"{"name":"example","version":"1.0.0","factorio_version":"1.1.0","title":"Example","author":"me"}"#,
        );

        let installed = InstalledMod::from_zip(&path).unwrap();
        assert_eq!(installed.identifier, "example");
        assert_eq!(installed.version, "1.0.0".parse().unwrap());
    }

    #[test]
    fn extract_info_json_cached_populates_then_hits_the_cache() {
        let dir = tempdir().unwrap();
        let path = write_mod_zip(
            dir.path(),
            "example_1.0.0.zip",
            r#"{"name":"example","version":"1.0.0","factorio_version":"1.1.0","title":"Example","author":"me"}"#,
        );
        let cache = CacheStore::open("info_json", dir.path().join("cache"), None).unwrap();

        let info = extract_info_json_cached(&path, "https://mods.factorio.com/download/example", "example", &cache).unwrap();
        assert_eq!(info.name, "example");

        let key = CacheStore::key_for("https://mods.factorio.com/download/example|example");
        assert!(cache.exists(&key), "first extraction should have populated the cache entry");

        // corrupt the source archive so a second extraction can only succeed via the cache.
        std::fs::write(&path, b"not a zip").unwrap();
        let info = extract_info_json_cached(&path, "https://mods.factorio.com/download/example", "example", &cache).unwrap();
        assert_eq!(info.name, "example");
    }

    #[test]
    fn scan_directory_skips_corrupt_archives() {
        let dir = tempdir().unwrap();
        write_mod_zip(
            dir.path(),
            "good_1.0.0.zip",
            r#"{"name":"good","version":"1.0.0","factorio_version":"1.1.0","title":"Good","author":"me"}"#,
        );
        std::fs::write(dir.path().join("bad_1.0.0.zip"), b"not a zip").unwrap();

        let mods = scan_directory(dir.path()).unwrap();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].identifier, "good");
    }
}
