//! Provides [`Info`], a model of the `info.json` file inside every mod zip archive (§6).

use super::{dependency::ModDependency, version::ModVersion};
use serde::Deserialize;

/// The minimum `info.json` shape this program reads: `name`, `version`, `title`, `author`,
/// `dependencies[]`, `factorio_version`, per §3's `InstalledMod` data model. `info.json` carries
/// more fields in practice (`description`, `contact`, `homepage`, …) but nothing else in this
/// program's core reads them, so they're left for future extension rather than modeled eagerly.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Info {
    /// The mod's internal name, matching the zip's containing directory modulo version suffix.
    pub name: String,
    /// The mod's own version.
    pub version: ModVersion,
    /// The Factorio version this mod targets.
    pub factorio_version: ModVersion,
    /// The mod's human-readable title.
    pub title: String,
    /// The mod's author.
    pub author: String,
    /// The mod's dependencies on other mods. Defaults to a mandatory dependency on `base` when
    /// the field is absent, matching the teacher's `default_dependencies` in `mod_common/info.rs`
    /// (an `info.json` with no explicit `dependencies` key still implicitly requires `base`).
    #[serde(default = "default_dependencies")]
    pub dependencies: Vec<ModDependency>,
}

/// Returns the implicit dependency set for an `info.json` with no `dependencies` field: a
/// mandatory requirement on any version of `base`.
fn default_dependencies() -> Vec<ModDependency> {
    vec!["base".parse().expect("'base' is always a valid dependency string")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_info_json() {
        let json = r#"{
            "name": "angelsindustries",
            "version": "0.18.3",
            "factorio_version": "0.18.0",
            "title": "Angel's Industries",
            "author": "Arch666Angel",
            "dependencies": ["base >= 0.18.0", "?angelsrefining"]
        }"#;

        let info: Info = serde_json::from_str(json).expect("failed to parse info.json");
        assert_eq!(info.name, "angelsindustries");
        assert_eq!(info.dependencies.len(), 2);
    }

    #[test]
    fn missing_dependencies_defaults_to_base() {
        let json = r#"{
            "name": "simple-mod",
            "version": "1.0.0",
            "factorio_version": "1.1.0",
            "title": "Simple Mod",
            "author": "someone"
        }"#;

        let info: Info = serde_json::from_str(json).expect("failed to parse info.json");
        assert_eq!(info.dependencies.len(), 1);
        assert_eq!(info.dependencies[0].name(), "base");
    }

    #[test]
    fn factorio_version_accepts_two_component_form() {
        // Factorio's own `factorio_version` field in info.json is conventionally `major.minor`
        // (e.g. "0.18"), not the three-component mod version form. The parser in `ModVersion`
        // requires three components, so real archives always pad it; this is documented here as
        // a known sharp edge rather than silently tolerated.
        let json = r#"{
            "name": "x",
            "version": "1.0.0",
            "factorio_version": "0.18.0",
            "title": "x",
            "author": "x"
        }"#;
        let info: Info = serde_json::from_str(json).expect("failed to parse info.json");
        assert_eq!(info.factorio_version, "0.18.0".parse().unwrap());
    }
}
