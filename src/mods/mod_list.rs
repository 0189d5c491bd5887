//! Provides [`ModList`], a model of the `mod-list.json` file (§3/§6): an ordered mapping from
//! mod identifier to enabled state and optionally a pinned version.

use super::{version::ModVersion, BASE_MOD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The `mod-list.json` file name, relative to a Factorio `mods/` directory.
const MOD_LIST_JSON_FILE: &str = "mod-list.json";

/// A single entry in `mod-list.json`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModListEntry {
    /// The mod's internal name.
    pub name: String,
    /// Whether the mod is enabled.
    pub enabled: bool,
    /// An optional pinned version. Absent means "use whatever's installed", resolved by the
    /// dependency engine's active-version rule (§4.E.2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ModVersion>,
}

/// An ordered `mod-list.json`: order is preserved across load/save so an existing file's mod
/// ordering (which some mods care about for load-order reasons unrelated to the dependency
/// graph) survives round-trips.
#[derive(Debug, Default, Clone)]
pub struct ModList {
    /// The path this list was loaded from, if any. `None` for a freshly-built in-memory list not
    /// yet saved anywhere.
    path: Option<PathBuf>,
    /// The ordered entries.
    entries: Vec<ModListEntry>,
}

/// The on-disk JSON shape: `{"mods": [...]}`.
#[derive(Debug, Deserialize, Serialize)]
struct ModListFile {
    /// The ordered mod entries.
    mods: Vec<ModListEntry>,
}

impl ModList {
    /// Builds an empty `ModList` with only `base` present and enabled, per the invariant in §3.
    pub fn new() -> Self {
        let mut list = ModList {
            path: None,
            entries: Vec::new(),
        };
        list.ensure_base_present();
        list
    }

    /// Loads a `ModList` from a `mod-list.json` file at the given path.
    pub fn from_path<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let file: ModListFile = serde_json::from_str(&contents)?;

        let mut list = ModList {
            path: Some(path.as_ref().to_path_buf()),
            entries: file.mods,
        };
        list.ensure_base_present();
        Ok(list)
    }

    /// Loads a `ModList` from the `mod-list.json` file inside a given `mods/` directory.
    pub fn from_mods_directory<P>(directory: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::from_path(directory.as_ref().join(MOD_LIST_JSON_FILE))
    }

    /// Saves this `ModList` to the path it was loaded from (or given via
    /// [`save_to`](Self::save_to)).
    pub fn save(&self) -> anyhow::Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("mod list has no associated path to save to"))?;
        self.save_to(path)
    }

    /// Saves this `ModList` to an explicit path, preserving entry order.
    pub fn save_to<P>(&self, path: P) -> anyhow::Result<()>
    where
        P: AsRef<Path>,
    {
        let file = ModListFile {
            mods: self.entries.clone(),
        };
        let serialised = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, serialised)?;
        Ok(())
    }

    /// Ensures `base` is present and enabled, inserting it at the front if missing.
    fn ensure_base_present(&mut self) {
        if let Some(base) = self.entries.iter_mut().find(|e| e.name == BASE_MOD) {
            base.enabled = true;
        } else {
            self.entries.insert(
                0,
                ModListEntry {
                    name: BASE_MOD.to_string(),
                    enabled: true,
                    version: None,
                },
            );
        }
    }

    /// Returns whether a given mod is enabled. Mods absent from the list are disabled, per
    /// §4.E.2.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name && e.enabled)
    }

    /// Returns the pinned version for a mod, if the list specifies one.
    pub fn pinned_version(&self, name: &str) -> Option<ModVersion> {
        self.entries.iter().find(|e| e.name == name)?.version
    }

    /// Sets a mod's enabled state, inserting a new entry if the mod isn't already listed.
    /// Refuses to disable `base`.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> anyhow::Result<()> {
        if name == BASE_MOD && !enabled {
            return Err(crate::error::DependencyError::BaseIsProtected.into());
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.enabled = enabled;
        } else {
            self.entries.push(ModListEntry {
                name: name.to_string(),
                enabled,
                version: None,
            });
        }
        Ok(())
    }

    /// Removes a mod's entry entirely, e.g. after an uninstall. Refuses to remove `base`.
    pub fn remove(&mut self, name: &str) -> anyhow::Result<()> {
        if name == BASE_MOD {
            return Err(crate::error::DependencyError::BaseIsProtected.into());
        }
        self.entries.retain(|e| e.name != name);
        Ok(())
    }

    /// Returns every listed identifier, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Returns every entry, in order.
    pub fn entries(&self) -> &[ModListEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn new_list_has_base_enabled() {
        let list = ModList::new();
        assert!(list.is_enabled(BASE_MOD));
    }

    #[test]
    fn cannot_disable_base() {
        let mut list = ModList::new();
        assert!(list.set_enabled(BASE_MOD, false).is_err());
        assert!(list.is_enabled(BASE_MOD));
    }

    #[test]
    fn unlisted_mod_is_disabled() {
        let list = ModList::new();
        assert!(!list.is_enabled("some-mod"));
    }

    #[test]
    fn save_and_reload_preserves_order_and_state() {
        let dir = tempdir().expect("failed to create tempdir");
        let path = dir.path().join(MOD_LIST_JSON_FILE);

        let mut list = ModList::new();
        list.set_enabled("zeta", true).unwrap();
        list.set_enabled("alpha", false).unwrap();
        list.save_to(&path).unwrap();

        let reloaded = ModList::from_path(&path).unwrap();
        let names: Vec<&str> = reloaded.names().collect();
        assert_eq!(names, vec![BASE_MOD, "zeta", "alpha"]);
        assert!(reloaded.is_enabled("zeta"));
        assert!(!reloaded.is_enabled("alpha"));
    }
}
