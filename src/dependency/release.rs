//! Provides [`select_release`] and [`select_exact`], the release-selection rules of §4.E.3.

use crate::mods::{ModVersion, Release, VersionRequirement};

/// Selects the best release satisfying an optional version requirement: the greatest version
/// among matches, ties broken by the later `released_at` (§4.E.3). Returns `None` if nothing
/// matches, which callers surface as `ReleaseNotFound`.
pub fn select_release(releases: &[Release], requirement: Option<VersionRequirement>) -> Option<&Release> {
    releases
        .iter()
        .filter(|r| r.version.satisfies(requirement))
        .max_by(|a, b| a.version.cmp(&b.version).then(a.released_at.cmp(&b.released_at)))
}

/// Selects the release matching an exact version, for `name@version` install specs.
pub fn select_exact(releases: &[Release], version: ModVersion) -> Option<&Release> {
    releases.iter().find(|r| r.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::{Comparator, ReleaseInfo};
    use chrono::{TimeZone, Utc};

    fn release(version: &str, released_at_day: u32) -> Release {
        Release {
            version: version.parse().unwrap(),
            released_at: Utc.with_ymd_and_hms(2024, 1, released_at_day, 0, 0, 0).unwrap(),
            download_url: format!("/download/x/{}", version),
            file_name: format!("x_{}.zip", version),
            sha1: "deadbeef".to_string(),
            info_json: ReleaseInfo {
                factorio_version: "1.1.0".parse().unwrap(),
                dependencies: Vec::new(),
            },
        }
    }

    #[test]
    fn no_requirement_selects_greatest_version() {
        let releases = vec![release("1.0.0", 1), release("2.0.0", 2), release("3.0.0", 3)];
        let selected = select_release(&releases, None).unwrap();
        assert_eq!(selected.version, "3.0.0".parse().unwrap());
    }

    #[test]
    fn requirement_narrows_selection() {
        let releases = vec![release("1.0.0", 1), release("2.0.0", 2), release("3.0.0", 3)];

        let req = VersionRequirement {
            comparator: Comparator::GreaterOrEqual,
            version: "2.0.0".parse().unwrap(),
        };
        assert_eq!(select_release(&releases, Some(req)).unwrap().version, "3.0.0".parse().unwrap());

        let req = VersionRequirement {
            comparator: Comparator::Equal,
            version: "1.0.0".parse().unwrap(),
        };
        assert_eq!(select_release(&releases, Some(req)).unwrap().version, "1.0.0".parse().unwrap());

        let req = VersionRequirement {
            comparator: Comparator::GreaterOrEqual,
            version: "4.0.0".parse().unwrap(),
        };
        assert!(select_release(&releases, Some(req)).is_none());
    }

    #[test]
    fn ties_break_on_later_released_at() {
        let releases = vec![release("1.0.0", 1), release("1.0.0", 5)];
        let selected = select_release(&releases, None).unwrap();
        assert_eq!(selected.released_at, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn select_exact_matches_only_that_version() {
        let releases = vec![release("1.0.0", 1), release("2.0.0", 2)];
        assert_eq!(select_exact(&releases, "2.0.0".parse().unwrap()).unwrap().version, "2.0.0".parse().unwrap());
        assert!(select_exact(&releases, "9.9.9".parse().unwrap()).is_none());
    }
}
