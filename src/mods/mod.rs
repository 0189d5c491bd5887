//! Provides the mod data model (§3): versions, dependency strings, releases, `info.json`,
//! `mod-list.json`, and installed-mod scanning. This module is deliberately inert — it models
//! data and parses files; the dependency engine in [`crate::dependency`] is what reasons about
//! the relationships between the values defined here.

mod dependency;
mod info;
mod installed;
mod mod_list;
mod release;
mod version;

pub use dependency::{DependencyKind, ModDependency};
pub use info::Info;
pub use installed::{extract_info_json_cached, scan_directory, InstalledMod};
pub use mod_list::{ModList, ModListEntry};
pub use release::{Release, ReleaseInfo};
pub use version::{compare, Comparator, ModVersion, VersionRequirement};

/// The reserved identifier of Factorio's built-in base game. Always implicitly installed,
/// always enabled, and never a valid target of `enable`/`disable`/`uninstall`.
pub const BASE_MOD: &str = "base";

/// A mod's internal name: a non-empty, case-sensitive string matching `info.json`'s `name`
/// field. Not a newtype in this crate — every API that wants a mod name takes `&str` directly,
/// matching the teacher's own `String`-keyed `ModList`/`Info` APIs — but the constant and helper
/// below centralize the one piece of business logic attached to the concept of an identifier.
pub fn is_base_mod(name: &str) -> bool {
    name == BASE_MOD
}
