//! Provides [`Release`](Release), a single published version of a mod as listed by the mod
//! portal.

use super::{dependency::ModDependency, version::ModVersion};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A single release of a mod on the mod portal: an immutable snapshot of one published version.
///
/// A mod's releases form a finite, time-ordered list; see
/// [`select_release`](crate::dependency::select_release) for how one is chosen under a version
/// requirement.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Release {
    /// The release's version.
    pub version: ModVersion,
    /// When the release was published.
    #[serde(rename = "released_at")]
    pub released_at: DateTime<Utc>,
    /// The path (relative to the portal's download root) to fetch this release's zip from.
    pub download_url: String,
    /// The release zip archive's file name.
    pub file_name: String,
    /// The release zip archive's SHA1 checksum, as published by the portal.
    pub sha1: String,
    /// The `info.json` contents embedded in the release, as the portal reports them.
    #[serde(rename = "info_json")]
    pub info_json: ReleaseInfo,
}

/// The subset of a release's `info.json` the portal echoes back alongside the release metadata.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReleaseInfo {
    /// The Factorio version this release was built against.
    pub factorio_version: ModVersion,
    /// The release's dependencies on other mods.
    #[serde(default)]
    pub dependencies: Vec<ModDependency>,
}
