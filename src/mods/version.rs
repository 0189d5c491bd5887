//! Because Factorio versions are not quite semver. Provides [`ModVersion`](ModVersion), a single
//! version such as `1.2.3` or `1.2.3-4`, and [`VersionRequirement`](VersionRequirement), a
//! comparator plus a `ModVersion` such as `>= 1.2.3`.

use crate::error::VersionParseError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, de::Visitor, Deserialize};
use std::{cmp::Ordering, fmt, fmt::Display, str::FromStr};

/// A version comparator.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Comparator {
    /// The greater-or-equal `>=` comparator.
    GreaterOrEqual,
    /// The greater `>` comparator.
    Greater,
    /// The equal `=` comparator.
    Equal,
    /// The less `<` comparator.
    Less,
    /// The less-or-equal `<=` comparator.
    LessOrEqual,
}

/// A mod's version: four 16-bit components, `(major, minor, patch, build)`.
///
/// Parsed from a string of the form `major.minor.patch` (build defaults to `0`) or
/// `major.minor.patch-build`. Every component must fit in a `u16`; out-of-range components fail
/// to parse. Ordering is lexicographic on the four-tuple.
///
/// Examples of valid version strings:
/// * `1.0.0`
/// * `1.0.0-4`
/// * `0.17.79`
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct ModVersion {
    /// The major component.
    pub major: u16,
    /// The minor component.
    pub minor: u16,
    /// The patch component.
    pub patch: u16,
    /// The build component. `0` when the version string carries no `-build` suffix.
    pub build: u16,
}

/// A version requirement: a [`Comparator`] paired with a [`ModVersion`] to compare against, or
/// no requirement at all.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct VersionRequirement {
    /// The version comparator.
    pub comparator: Comparator,
    /// The version to compare against.
    pub version: ModVersion,
}

impl ModVersion {
    /// Returns whether this version satisfies a given requirement. `None` is trivially
    /// satisfied by every version.
    pub fn satisfies(self, requirement: Option<VersionRequirement>) -> bool {
        match requirement {
            None => true,
            Some(req) => req.satisfied_by(self),
        }
    }
}

impl VersionRequirement {
    /// Returns whether a given version satisfies this requirement.
    pub fn satisfied_by(self, version: ModVersion) -> bool {
        match self.comparator {
            Comparator::GreaterOrEqual => version >= self.version,
            Comparator::Greater => version > self.version,
            Comparator::Equal => version == self.version,
            Comparator::Less => version < self.version,
            Comparator::LessOrEqual => version <= self.version,
        }
    }
}

impl FromStr for ModVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (core, build) = match s.split_once('-') {
            Some((core, build)) => (core, build.parse::<u16>().map_err(VersionParseError::from)?),
            None => (s, 0),
        };

        let components: Vec<&str> = core.split('.').collect();
        if components.len() != 3 {
            return Err(VersionParseError::WrongComponentCount(s.to_owned()));
        }

        let major = components[0].parse::<u16>()?;
        let minor = components[1].parse::<u16>()?;
        let patch = components[2].parse::<u16>()?;

        Ok(Self {
            major,
            minor,
            patch,
            build,
        })
    }
}

impl Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.build == 0 {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        } else {
            write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, self.build)
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparator::GreaterOrEqual => ">=",
            Comparator::Greater => ">",
            Comparator::Equal => "=",
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
        })
    }
}

impl Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.comparator, self.version)
    }
}

impl FromStr for VersionRequirement {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^(>=|<=|>|=|<) ?(.*)$").unwrap();
        }

        let captures = RE
            .captures(s)
            .ok_or_else(|| VersionParseError::NoRegexCaptures(s.to_owned()))?;

        let comparator = match captures.get(1).map(|c| c.as_str()) {
            Some(">=") => Comparator::GreaterOrEqual,
            Some(">") => Comparator::Greater,
            Some("=") => Comparator::Equal,
            Some("<") => Comparator::Less,
            Some("<=") => Comparator::LessOrEqual,
            Some(c) => unreachable!("regex alternation returned unexpected comparator {}", c),
            None => return Err(VersionParseError::MissingComparator(s.to_owned())),
        };

        let version = captures
            .get(2)
            .ok_or_else(|| VersionParseError::MissingVersion(s.to_owned()))?
            .as_str()
            .parse()?;

        Ok(Self { comparator, version })
    }
}

impl<'de> Deserialize<'de> for ModVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ModVersionVisitor;

        impl<'de> Visitor<'de> for ModVersionVisitor {
            type Value = ModVersion;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a version string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse::<Self::Value>()
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(ModVersionVisitor)
    }
}

impl serde::Serialize for ModVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VersionRequirement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct VersionRequirementVisitor;

        impl<'de> Visitor<'de> for VersionRequirementVisitor {
            type Value = VersionRequirement;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a version requirement string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse::<Self::Value>()
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(VersionRequirementVisitor)
    }
}

/// Compares two versions, exposed as a free function so callers picking the "greatest" release
/// from a list don't need to import `Ord` explicitly.
pub fn compare(a: &ModVersion, b: &ModVersion) -> Ordering {
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_version() -> anyhow::Result<()> {
        assert_eq!(
            "1.2.3".parse::<ModVersion>()?,
            ModVersion {
                major: 1,
                minor: 2,
                patch: 3,
                build: 0
            }
        );

        assert_eq!(
            "0.17.79-4".parse::<ModVersion>()?,
            ModVersion {
                major: 0,
                minor: 17,
                patch: 79,
                build: 4
            }
        );

        assert!("1.2".parse::<ModVersion>().is_err());
        assert!("not.a.version".parse::<ModVersion>().is_err());
        assert!("99999.0.0".parse::<ModVersion>().is_err());

        Ok(())
    }

    #[test]
    fn parse_version_requirement() -> anyhow::Result<()> {
        assert_eq!(
            ">= 1.0.0".parse::<VersionRequirement>()?,
            VersionRequirement {
                comparator: Comparator::GreaterOrEqual,
                version: ModVersion {
                    major: 1,
                    minor: 0,
                    patch: 0,
                    build: 0,
                }
            }
        );

        assert_eq!(
            "=1.0.0".parse::<VersionRequirement>()?,
            VersionRequirement {
                comparator: Comparator::Equal,
                version: ModVersion {
                    major: 1,
                    minor: 0,
                    patch: 0,
                    build: 0,
                }
            }
        );

        Ok(())
    }

    #[test]
    fn total_order_is_transitive_and_exhaustive() {
        let a = "1.0.0".parse::<ModVersion>().unwrap();
        let b = "1.0.1".parse::<ModVersion>().unwrap();
        let c = "1.1.0".parse::<ModVersion>().unwrap();

        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert_eq!(a, a);
    }

    #[test]
    fn build_component_breaks_ties() {
        let a = "1.0.0-1".parse::<ModVersion>().unwrap();
        let b = "1.0.0-2".parse::<ModVersion>().unwrap();
        assert!(a < b);
    }

    #[test]
    fn satisfied_by_respects_operator_semantics() {
        let v = "2.0.0".parse::<ModVersion>().unwrap();
        let ge = VersionRequirement {
            comparator: Comparator::GreaterOrEqual,
            version: v,
        };
        let gt = VersionRequirement {
            comparator: Comparator::Greater,
            version: v,
        };

        assert!(ge.satisfied_by(v));
        assert!(!gt.satisfied_by(v));
    }

    #[test]
    fn none_requirement_is_trivially_satisfied() {
        let v = "1.0.0".parse::<ModVersion>().unwrap();
        assert!(v.satisfies(None));
    }
}
