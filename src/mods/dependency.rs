//! Provides the [`ModDependency`](ModDependency) object which models a mod's dependency on
//! another mod, and [`DependencyKind`](DependencyKind), the requirement level it's declared at.

use super::version::VersionRequirement;
use crate::error::DependencyParsingError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{de, de::Visitor, Deserialize};
use std::{fmt, str::FromStr};

#[doc(hidden)]
const DEPENDENCY_PARSER_REGEX: &str = r"^(\?|!|\(\?\)|~)? ?([^>=<]+?)(?: ?([>=<]{1,2}) ?([\d\.\-]*))?$";

/// A dependency's requirement level, parsed from the leading prefix token of a dependency
/// string.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum DependencyKind {
    /// A mandatory dependency (no prefix). Must be installed and enabled.
    Required,
    /// An optional dependency (`?`). Consulted for load order if present, but not required.
    Optional,
    /// An optional dependency hidden from the UI (`(?)`). Honored if present, but never
    /// surfaced as a user-facing suggestion.
    HiddenOptional,
    /// An incompatible mod (`!`). Two enabled mods with mutual/one-way `!` edges conflict.
    Incompatible,
    /// A load-order-neutral relationship (`~`). Declares a relationship without imposing load
    /// ordering, and never participates in "needs-to-be-installed" logic.
    LoadNeutral,
}

/// A mod's dependency on another mod, parsed from a Factorio dependency string such as
/// `cool-mod >= 1.0.0`, `?optional-mod`, `!evil-mod`, or `~unordered-mod`.
///
/// Immutable once parsed; round-trips through [`to_string`](ToString::to_string) back to its
/// canonical form.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ModDependency {
    /// The dependency's requirement level.
    kind: DependencyKind,
    /// The name of the depended-on mod.
    name: String,
    /// The optional version requirement on the depended-on mod.
    requirement: Option<VersionRequirement>,
}

impl ModDependency {
    /// Returns the depended-on mod's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dependency's requirement level.
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Returns the dependency's version requirement, if any.
    pub fn requirement(&self) -> Option<VersionRequirement> {
        self.requirement
    }

    /// Returns whether this dependency implies the target must be installed and enabled for its
    /// declaring mod to load correctly. `incompatible` and `load_neutral` edges never do.
    pub fn is_required(&self) -> bool {
        matches!(self.kind, DependencyKind::Required)
    }
}

impl FromStr for ModDependency {
    type Err = DependencyParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(DEPENDENCY_PARSER_REGEX).unwrap();
        }

        let captures = RE
            .captures(s)
            .ok_or_else(|| DependencyParsingError::NoRegexCaptures(s.to_owned()))?;

        let kind = captures
            .get(1)
            .map(|c| c.as_str())
            .map_or(Ok(DependencyKind::Required), str::parse)?;

        let name = captures
            .get(2)
            .ok_or_else(|| DependencyParsingError::NameNotCaptured(s.to_owned()))?
            .as_str()
            .trim()
            .to_string();

        if name.is_empty() {
            return Err(DependencyParsingError::EmptyName(s.to_owned()));
        }

        let requirement = match (captures.get(3), captures.get(4)) {
            (Some(op), Some(version)) if !version.as_str().is_empty() => {
                Some(format!("{} {}", op.as_str(), version.as_str()).parse()?)
            }
            _ => None,
        };

        Ok(ModDependency { kind, name, requirement })
    }
}

impl FromStr for DependencyKind {
    type Err = DependencyParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "?" => Ok(DependencyKind::Optional),
            "!" => Ok(DependencyKind::Incompatible),
            "(?)" => Ok(DependencyKind::HiddenOptional),
            "~" => Ok(DependencyKind::LoadNeutral),
            "" => Ok(DependencyKind::Required),
            _ => Err(DependencyParsingError::InvalidPrefix(s.to_owned())),
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DependencyKind::Optional => "?",
            DependencyKind::Incompatible => "!",
            DependencyKind::HiddenOptional => "(?)",
            DependencyKind::LoadNeutral => "~",
            DependencyKind::Required => "",
        })
    }
}

impl fmt::Display for ModDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.name)?;
        if let Some(requirement) = self.requirement {
            write!(f, " {}", requirement)?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ModDependency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ModDependencyVisitor;

        impl<'de> Visitor<'de> for ModDependencyVisitor {
            type Value = ModDependency;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a dependency string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                v.parse::<Self::Value>()
                    .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(ModDependencyVisitor)
    }
}

impl serde::Serialize for ModDependency {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::version::{Comparator, ModVersion};

    #[test]
    fn parse_mandatory() -> anyhow::Result<()> {
        assert_eq!(
            "base".parse::<ModDependency>()?,
            ModDependency {
                kind: DependencyKind::Required,
                name: String::from("base"),
                requirement: None,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_with_version() -> anyhow::Result<()> {
        let dep = "base >= 0.18.0".parse::<ModDependency>()?;
        assert_eq!(dep.name(), "base");
        assert_eq!(dep.kind(), DependencyKind::Required);
        assert_eq!(
            dep.requirement(),
            Some(VersionRequirement {
                comparator: Comparator::GreaterOrEqual,
                version: ModVersion {
                    major: 0,
                    minor: 18,
                    patch: 0,
                    build: 0
                }
            })
        );
        Ok(())
    }

    #[test]
    fn parse_all_prefixes() -> anyhow::Result<()> {
        assert_eq!("!evil-mod".parse::<ModDependency>()?.kind(), DependencyKind::Incompatible);
        assert_eq!("?optional-mod".parse::<ModDependency>()?.kind(), DependencyKind::Optional);
        assert_eq!(
            "(?)hidden-mod".parse::<ModDependency>()?.kind(),
            DependencyKind::HiddenOptional
        );
        assert_eq!("~unordered-mod".parse::<ModDependency>()?.kind(), DependencyKind::LoadNeutral);
        Ok(())
    }

    #[test]
    fn reject_empty_name() {
        assert!("! >= 1.0.0".parse::<ModDependency>().is_err());
    }

    #[test]
    fn reject_bad_version() {
        assert!("base >= not-a-version".parse::<ModDependency>().is_err());
    }

    #[test]
    fn canonical_round_trip() -> anyhow::Result<()> {
        for s in &["base", "?optional-mod", "!evil-mod", "(?)hidden-mod", "~unordered-mod", "base >= 0.18.0"] {
            let parsed: ModDependency = s.parse()?;
            assert_eq!(&parsed.to_string(), s);
        }
        Ok(())
    }

    #[test]
    fn incompatible_and_load_neutral_are_not_required() {
        assert!(!"!evil-mod".parse::<ModDependency>().unwrap().is_required());
        assert!(!"~unordered-mod".parse::<ModDependency>().unwrap().is_required());
        assert!("base".parse::<ModDependency>().unwrap().is_required());
    }
}
