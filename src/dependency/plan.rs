//! Provides [`Planner`], which turns a validated [`DependencyGraph`] into the mod sets each
//! top-level command should act on (§4.E.5). Planning is pure and side-effect free: every plan
//! is computed in full before the caller touches disk or network, per §4.E.5's "all plans are
//! computed before any destructive operation" rule.

use super::graph::DependencyGraph;
use super::release::select_release;
use crate::error::DependencyError;
use crate::mods::{Comparator, DependencyKind, ModVersion, Release, VersionRequirement, BASE_MOD};
use std::collections::{HashMap, HashSet};

/// The set of identifiers `enable(M)` would turn on: `M` plus its transitive required
/// dependencies, already installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnablePlan {
    /// Identifiers to enable, sorted for deterministic output.
    pub to_enable: Vec<String>,
}

/// The set of identifiers `disable(M)` would turn off: `M` plus every enabled mod that depends
/// on it (transitively) through a required edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisablePlan {
    /// Identifiers to disable, sorted for deterministic output.
    pub to_disable: Vec<String>,
}

/// The set of identifiers `uninstall(M)` would remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallPlan {
    /// Identifiers to uninstall, sorted for deterministic output.
    pub to_uninstall: Vec<String>,
}

/// One requested install target: a mod name plus an optional version requirement, as produced
/// by [`parse_spec`] from a `name`, `name@version` or `name@latest` CLI argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// The mod's internal name.
    pub name: String,
    /// The version requirement this spec implies, if any.
    pub requirement: Option<VersionRequirement>,
}

/// One mod resolved to a concrete release to install or update to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInstall {
    /// The mod's internal name.
    pub name: String,
    /// The release selected to install.
    pub release: Release,
}

/// A fully-resolved install or update plan: every target mod paired with the exact release to
/// fetch. Computed entirely before any download starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallPlan {
    /// The mods to install or update, in resolution order.
    pub mods: Vec<ResolvedInstall>,
}

/// Parses a `name`, `name@version` or `name@latest` install spec (§4.E.3). `name@latest` and a
/// bare `name` both resolve to "no requirement"; only an explicit `name@X.Y.Z` narrows release
/// selection to that exact version.
pub fn parse_spec(spec: &str) -> InstallTarget {
    match spec.split_once('@') {
        Some((name, "latest")) | Some((name, "")) => InstallTarget {
            name: name.to_string(),
            requirement: None,
        },
        Some((name, version)) => match version.parse::<ModVersion>() {
            Ok(version) => InstallTarget {
                name: name.to_string(),
                requirement: Some(VersionRequirement {
                    comparator: Comparator::Equal,
                    version,
                }),
            },
            Err(_) => InstallTarget {
                name: name.to_string(),
                requirement: None,
            },
        },
        None => InstallTarget {
            name: spec.to_string(),
            requirement: None,
        },
    }
}

/// The dependency engine's planner (§4.E.5): turns a graph plus a requested operation into the
/// exact set of mods that operation would touch, without performing any I/O itself.
pub struct Planner;

impl Planner {
    /// Plans `enable(M)`: the set to enable is `M` plus every required dependency, transitively,
    /// restricted to mods already installed. Fails if any required dependency (transitively) is
    /// missing from disk.
    pub fn enable(graph: &DependencyGraph, target: &str) -> Result<EnablePlan, DependencyError> {
        let mut to_enable = HashSet::new();
        let mut stack = vec![target.to_string()];

        while let Some(name) = stack.pop() {
            if !to_enable.insert(name.clone()) {
                continue;
            }

            if !graph.is_installed(&name) {
                return Err(DependencyError::NoSuchMod(name));
            }

            for edge in graph.edges_from(&name).filter(|e| e.kind == DependencyKind::Required) {
                if !graph.is_installed(&edge.to) {
                    return Err(DependencyError::NoSuchMod(edge.to.clone()));
                }
                if !to_enable.contains(&edge.to) {
                    stack.push(edge.to.clone());
                }
            }
        }

        let mut to_enable: Vec<String> = to_enable.into_iter().collect();
        to_enable.sort();
        Ok(EnablePlan { to_enable })
    }

    /// Plans `disable(M)`: the set to disable is `M` plus every enabled mod that required-depends
    /// on something already in the set, transitively. `base` can never enter the set or be the
    /// target.
    pub fn disable(graph: &DependencyGraph, target: &str) -> Result<DisablePlan, DependencyError> {
        if target == BASE_MOD {
            return Err(DependencyError::BaseIsProtected);
        }

        let mut to_disable = HashSet::new();
        to_disable.insert(target.to_string());

        loop {
            let mut grew = false;

            for edge in graph.edges() {
                if edge.kind != DependencyKind::Required || edge.from == BASE_MOD {
                    continue;
                }
                if to_disable.contains(&edge.to) && graph.is_enabled(&edge.from) && to_disable.insert(edge.from.clone())
                {
                    grew = true;
                }
            }

            if !grew {
                break;
            }
        }

        let mut to_disable: Vec<String> = to_disable.into_iter().collect();
        to_disable.sort();
        Ok(DisablePlan { to_disable })
    }

    /// Plans `uninstall(M)`. Without `--all`, refuses if any other enabled installed mod still
    /// required-depends on `M`. With `--all`, cascades to every enabled dependent, reusing
    /// [`disable`](Self::disable)'s transitive-dependent walk.
    pub fn uninstall(graph: &DependencyGraph, target: &str, all: bool) -> Result<UninstallPlan, DependencyError> {
        if target == BASE_MOD {
            return Err(DependencyError::BaseIsProtected);
        }

        if all {
            let cascade = Self::disable(graph, target)?;
            return Ok(UninstallPlan {
                to_uninstall: cascade.to_disable,
            });
        }

        if let Some(dependent) = graph.edges().iter().find(|e| {
            e.kind == DependencyKind::Required
                && e.to == target
                && e.from != target
                && graph.is_installed(&e.from)
                && graph.is_enabled(&e.from)
        }) {
            return Err(DependencyError::StillRequired {
                dependent: dependent.from.clone(),
                target: target.to_string(),
            });
        }

        Ok(UninstallPlan {
            to_uninstall: vec![target.to_string()],
        })
    }

    /// Plans an `install(specs)` operation. With `recursive`, pulls in every required
    /// dependency transitively whose requirement isn't already satisfied by an installed active
    /// version. Every accumulated requirement on a given mod must be satisfiable by a single
    /// release, or the mod surfaces a [`DependencyError::RequirementConflict`] (two or more
    /// distinct requirements, no release satisfies all) or
    /// [`DependencyError::ReleaseNotFound`] (one requirement, nothing satisfies it).
    pub fn install(
        graph: &DependencyGraph,
        specs: &[InstallTarget],
        recursive: bool,
        releases_by_name: &HashMap<String, Vec<Release>>,
    ) -> Result<InstallPlan, DependencyError> {
        let mut requirements: HashMap<String, Vec<VersionRequirement>> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: Vec<InstallTarget> = specs.to_vec();

        while let Some(spec) = queue.pop() {
            let entry = requirements.entry(spec.name.clone()).or_default();
            if let Some(requirement) = spec.requirement {
                entry.push(requirement);
            }

            if !seen.insert(spec.name.clone()) {
                continue;
            }
            order.push(spec.name.clone());

            if !recursive {
                continue;
            }

            let candidates = releases_by_name
                .get(&spec.name)
                .ok_or_else(|| DependencyError::NoSuchMod(spec.name.clone()))?;
            let preview = select_release(candidates, spec.requirement)
                .ok_or_else(|| DependencyError::ReleaseNotFound(spec.name.clone()))?;

            for dep in &preview.info_json.dependencies {
                if !dep.is_required() || dep.name() == BASE_MOD {
                    continue;
                }

                let satisfied = graph
                    .active_version(dep.name())
                    .map_or(false, |v| v.satisfies(dep.requirement()));
                if !satisfied {
                    queue.push(InstallTarget {
                        name: dep.name().to_string(),
                        requirement: dep.requirement(),
                    });
                }
            }
        }

        let mut mods = Vec::with_capacity(order.len());
        for name in order {
            let candidates = releases_by_name
                .get(&name)
                .ok_or_else(|| DependencyError::NoSuchMod(name.clone()))?;
            let reqs = requirements.get(&name).cloned().unwrap_or_default();

            let release = candidates
                .iter()
                .filter(|r| reqs.iter().all(|req| req.satisfied_by(r.version)))
                .max_by(|a, b| a.version.cmp(&b.version).then(a.released_at.cmp(&b.released_at)));

            let release = match release {
                Some(release) => release.clone(),
                None if reqs.len() >= 2 => return Err(DependencyError::RequirementConflict(name)),
                None => return Err(DependencyError::ReleaseNotFound(name)),
            };

            mods.push(ResolvedInstall { name, release });
        }

        Ok(InstallPlan { mods })
    }

    /// Plans an `update([M…])` operation: for each currently-installed mod, picks the latest
    /// release whose `factorio_version` matches `game_version`, and includes it in the plan only
    /// if that release is newer than what's installed.
    pub fn update(
        installed_versions: &HashMap<String, ModVersion>,
        releases_by_name: &HashMap<String, Vec<Release>>,
        game_version: ModVersion,
    ) -> InstallPlan {
        let mut mods: Vec<ResolvedInstall> = installed_versions
            .iter()
            .filter_map(|(name, current)| {
                let candidates = releases_by_name.get(name)?;
                let best = candidates
                    .iter()
                    .filter(|r| r.info_json.factorio_version == game_version)
                    .max_by(|a, b| a.version.cmp(&b.version).then(a.released_at.cmp(&b.released_at)))?;

                if best.version > *current {
                    Some(ResolvedInstall {
                        name: name.clone(),
                        release: best.clone(),
                    })
                } else {
                    None
                }
            })
            .collect();

        mods.sort_by(|a, b| a.name.cmp(&b.name));
        InstallPlan { mods }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::{Info, InstalledMod, ModList, ReleaseInfo};
    use chrono::Utc;

    fn installed(name: &str, version: &str, deps: &[&str]) -> InstalledMod {
        InstalledMod {
            identifier: name.to_string(),
            version: version.parse().unwrap(),
            info: Info {
                name: name.to_string(),
                version: version.parse().unwrap(),
                factorio_version: "1.1.0".parse().unwrap(),
                title: name.to_string(),
                author: "someone".to_string(),
                dependencies: deps.iter().map(|d| d.parse().unwrap()).collect(),
            },
            zip_path: format!("{}_{}.zip", name, version).into(),
        }
    }

    fn mod_list(entries: &[(&str, bool)]) -> ModList {
        let mut list = ModList::new();
        for (name, enabled) in entries {
            list.set_enabled(name, *enabled).unwrap();
        }
        list
    }

    fn release(name: &str, version: &str) -> Release {
        Release {
            version: version.parse().unwrap(),
            released_at: Utc::now(),
            download_url: format!("/download/{}/{}", name, version),
            file_name: format!("{}_{}.zip", name, version),
            sha1: "deadbeef".to_string(),
            info_json: ReleaseInfo {
                factorio_version: "1.1.0".parse().unwrap(),
                dependencies: Vec::new(),
            },
        }
    }

    #[test]
    fn parse_spec_variants() {
        assert_eq!(parse_spec("angelsindustries").requirement, None);
        assert_eq!(parse_spec("angelsindustries@latest").requirement, None);
        assert_eq!(
            parse_spec("angelsindustries@0.18.3").requirement,
            Some(VersionRequirement {
                comparator: Comparator::Equal,
                version: "0.18.3".parse().unwrap()
            })
        );
    }

    #[test]
    fn enable_cascades_through_required_deps() {
        let installed_mods = vec![
            installed("gamma", "1.0.0", &["beta"]),
            installed("beta", "1.0.0", &["alpha"]),
            installed("alpha", "1.0.0", &[]),
        ];
        let list = mod_list(&[]);
        let graph = DependencyGraph::build(&installed_mods, &list);

        let plan = Planner::enable(&graph, "gamma").unwrap();
        assert_eq!(plan.to_enable, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn enable_fails_on_missing_required_dep() {
        let installed_mods = vec![installed("alpha", "1.0.0", &["beta"])];
        let graph = DependencyGraph::build(&installed_mods, &ModList::new());
        assert!(matches!(Planner::enable(&graph, "alpha"), Err(DependencyError::NoSuchMod(_))));
    }

    #[test]
    fn disable_cascades_to_dependents() {
        let installed_mods = vec![
            installed("a", "1.0.0", &[]),
            installed("b", "1.0.0", &["a"]),
            installed("c", "1.0.0", &["b"]),
        ];
        let list = mod_list(&[("a", true), ("b", true), ("c", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);

        let plan = Planner::disable(&graph, "a").unwrap();
        assert_eq!(plan.to_disable, vec!["a", "b", "c"]);
    }

    #[test]
    fn disable_base_is_refused() {
        let graph = DependencyGraph::build(&[], &ModList::new());
        assert!(matches!(Planner::disable(&graph, BASE_MOD), Err(DependencyError::BaseIsProtected)));
    }

    #[test]
    fn uninstall_refuses_when_still_required() {
        let installed_mods = vec![installed("a", "1.0.0", &[]), installed("b", "1.0.0", &["a"])];
        let list = mod_list(&[("a", true), ("b", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);

        assert!(matches!(
            Planner::uninstall(&graph, "a", false),
            Err(DependencyError::StillRequired { .. })
        ));
        assert!(Planner::uninstall(&graph, "a", true).is_ok());
    }

    #[test]
    fn install_resolves_release_without_requirement() {
        let graph = DependencyGraph::build(&[], &ModList::new());
        let mut releases = HashMap::new();
        releases.insert(
            "alpha".to_string(),
            vec![release("alpha", "1.0.0"), release("alpha", "2.0.0")],
        );

        let specs = vec![InstallTarget {
            name: "alpha".to_string(),
            requirement: None,
        }];
        let plan = Planner::install(&graph, &specs, false, &releases).unwrap();
        assert_eq!(plan.mods.len(), 1);
        assert_eq!(plan.mods[0].release.version, "2.0.0".parse().unwrap());
    }

    #[test]
    fn install_recursive_pulls_unsatisfied_required_deps() {
        let graph = DependencyGraph::build(&[], &ModList::new());
        let mut releases = HashMap::new();
        releases.insert(
            "alpha".to_string(),
            vec![Release {
                info_json: ReleaseInfo {
                    factorio_version: "1.1.0".parse().unwrap(),
                    dependencies: vec!["beta >= 1.0.0".parse().unwrap()],
                },
                ..release("alpha", "1.0.0")
            }],
        );
        releases.insert("beta".to_string(), vec![release("beta", "1.0.0")]);

        let specs = vec![InstallTarget {
            name: "alpha".to_string(),
            requirement: None,
        }];
        let plan = Planner::install(&graph, &specs, true, &releases).unwrap();
        let names: Vec<&str> = plan.mods.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"alpha"));
        assert!(names.contains(&"beta"));
    }

    #[test]
    fn install_reports_release_not_found() {
        let graph = DependencyGraph::build(&[], &ModList::new());
        let mut releases = HashMap::new();
        releases.insert("alpha".to_string(), vec![release("alpha", "1.0.0")]);

        let specs = vec![InstallTarget {
            name: "alpha".to_string(),
            requirement: Some(VersionRequirement {
                comparator: Comparator::GreaterOrEqual,
                version: "5.0.0".parse().unwrap(),
            }),
        }];
        assert!(matches!(
            Planner::install(&graph, &specs, false, &releases),
            Err(DependencyError::ReleaseNotFound(_))
        ));
    }

    #[test]
    fn update_plan_only_includes_newer_matching_releases() {
        let mut installed_versions = HashMap::new();
        installed_versions.insert("alpha".to_string(), "1.0.0".parse::<ModVersion>().unwrap());

        let mut releases = HashMap::new();
        releases.insert(
            "alpha".to_string(),
            vec![release("alpha", "1.0.0"), release("alpha", "2.0.0")],
        );

        let plan = Planner::update(&installed_versions, &releases, "1.1.0".parse().unwrap());
        assert_eq!(plan.mods.len(), 1);
        assert_eq!(plan.mods[0].release.version, "2.0.0".parse().unwrap());
    }

    #[test]
    fn update_plan_skips_mods_already_current() {
        let mut installed_versions = HashMap::new();
        installed_versions.insert("alpha".to_string(), "2.0.0".parse::<ModVersion>().unwrap());

        let mut releases = HashMap::new();
        releases.insert(
            "alpha".to_string(),
            vec![release("alpha", "1.0.0"), release("alpha", "2.0.0")],
        );

        let plan = Planner::update(&installed_versions, &releases, "1.1.0".parse().unwrap());
        assert!(plan.mods.is_empty());
    }
}
