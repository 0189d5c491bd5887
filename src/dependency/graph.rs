//! Provides [`DependencyGraph`], built from a set of installed mods plus a `mod-list.json` per
//! §4.E.2: one node per identifier (installed or merely listed), one edge per declared
//! dependency.

use crate::mods::{DependencyKind, InstalledMod, ModList, ModVersion, VersionRequirement, BASE_MOD};
use std::collections::{HashMap, HashSet};

/// One mod identifier's state in the graph: its active version (if installed), whether it's
/// installed at all, and whether it's currently enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// The mod's internal name.
    pub identifier: String,
    /// The active installed version, per §3's active-version rule. `None` if not installed.
    pub version: Option<ModVersion>,
    /// Whether this identifier has at least one archive on disk.
    pub installed: bool,
    /// Whether `mod-list.json` marks this identifier enabled. An identifier absent from the
    /// list is always disabled.
    pub enabled: bool,
}

/// One mod's declared dependency on another, carried over from [`ModDependency`](crate::mods::ModDependency)
/// plus the declaring mod's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// The mod declaring the dependency.
    pub from: String,
    /// The mod depended upon.
    pub to: String,
    /// The dependency's requirement level.
    pub kind: DependencyKind,
    /// The dependency's version requirement, if any.
    pub requirement: Option<VersionRequirement>,
}

/// A directed graph over installed/requested mods (§3's `DependencyGraph`, built per §4.E.2).
///
/// Nodes cover every identifier mentioned either on disk or in `mod-list.json`, so the validator
/// can distinguish "missing entirely" from "listed but not installed" from "installed but
/// disabled". Edges only originate from *installed* mods' active version, since an uninstalled
/// mod has no `info.json` to read dependencies out of.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: HashMap<String, Node>,
    edges: Vec<Edge>,
    /// Identifiers that appear in `mod-list.json`, used by the validator to distinguish a
    /// missing-from-list warning from a missing-from-disk error.
    listed: HashSet<String>,
}

impl DependencyGraph {
    /// Builds a graph from every mod found on disk plus the `mod-list.json` that governs which
    /// of them are enabled (§4.E.2).
    ///
    /// A given identifier may have multiple installed versions side by side; the active one is
    /// the mod list's pinned version if present among them, else the greatest installed version
    /// (§3).
    pub fn build(installed: &[InstalledMod], mod_list: &ModList) -> Self {
        let mut by_name: HashMap<&str, Vec<&InstalledMod>> = HashMap::new();
        for m in installed {
            by_name.entry(m.identifier.as_str()).or_default().push(m);
        }

        let mut nodes = HashMap::new();
        let mut active: HashMap<String, &InstalledMod> = HashMap::new();

        for (name, versions) in &by_name {
            let pinned = mod_list.pinned_version(name);
            let chosen = pinned
                .and_then(|v| versions.iter().find(|m| m.version == v))
                .copied()
                .or_else(|| versions.iter().copied().max_by_key(|m| m.version))
                .expect("a populated group always yields a candidate");

            active.insert((*name).to_string(), chosen);
            nodes.insert(
                (*name).to_string(),
                Node {
                    identifier: (*name).to_string(),
                    version: Some(chosen.version),
                    installed: true,
                    enabled: mod_list.is_enabled(name),
                },
            );
        }

        let listed: HashSet<String> = mod_list.names().map(str::to_string).collect();
        for name in &listed {
            nodes.entry(name.clone()).or_insert_with(|| Node {
                identifier: name.clone(),
                version: None,
                installed: false,
                enabled: mod_list.is_enabled(name),
            });
        }

        nodes.entry(BASE_MOD.to_string()).or_insert_with(|| Node {
            identifier: BASE_MOD.to_string(),
            version: None,
            installed: true,
            enabled: true,
        });

        let mut edges = Vec::new();
        for (name, installed_mod) in &active {
            for dep in &installed_mod.info.dependencies {
                if dep.name() == BASE_MOD {
                    continue;
                }

                edges.push(Edge {
                    from: name.clone(),
                    to: dep.name().to_string(),
                    kind: dep.kind(),
                    requirement: dep.requirement(),
                });
            }
        }

        DependencyGraph { nodes, edges, listed }
    }

    /// Returns a node by identifier, if it appears in the graph at all.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    /// Iterates every node in the graph.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns every edge in the graph.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Iterates edges originating from a given identifier.
    pub fn edges_from<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.from == name)
    }

    /// Returns whether an identifier has at least one archive installed on disk.
    pub fn is_installed(&self, name: &str) -> bool {
        self.nodes.get(name).map_or(false, |n| n.installed)
    }

    /// Returns whether an identifier is currently enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.nodes.get(name).map_or(false, |n| n.enabled)
    }

    /// Returns an identifier's active installed version, if installed.
    pub fn active_version(&self, name: &str) -> Option<ModVersion> {
        self.nodes.get(name).and_then(|n| n.version)
    }

    /// Returns whether an identifier appears in `mod-list.json`.
    pub fn is_listed(&self, name: &str) -> bool {
        self.listed.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::Info;

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

    #[test]
    fn base_is_always_present_and_enabled() {
        let graph = DependencyGraph::build(&[], &ModList::new());
        let base = graph.node(BASE_MOD).unwrap();
        assert!(base.installed);
        assert!(base.enabled);
    }

    #[test]
    fn active_version_prefers_pinned_over_latest() {
        let installed_mods = vec![installed("alpha", "1.0.0", &[]), installed("alpha", "2.0.0", &[])];
        // a pinned version only round-trips through a loaded mod-list.json, since `ModList`'s
        // in-memory mutators never set the `version` field themselves.
        let json = r#"{"mods": [
            {"name": "base", "enabled": true},
            {"name": "alpha", "enabled": true, "version": "1.0.0"}
        ]}"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod-list.json");
        std::fs::write(&path, json).unwrap();
        let list = ModList::from_path(&path).unwrap();

        let graph = DependencyGraph::build(&installed_mods, &list);
        assert_eq!(graph.active_version("alpha"), Some("1.0.0".parse().unwrap()));
    }

    #[test]
    fn active_version_falls_back_to_latest_when_unpinned() {
        let installed_mods = vec![installed("alpha", "1.0.0", &[]), installed("alpha", "2.0.0", &[])];
        let list = mod_list(&[("alpha", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        assert_eq!(graph.active_version("alpha"), Some("2.0.0".parse().unwrap()));
    }

    #[test]
    fn edges_skip_base_dependency() {
        let installed_mods = vec![installed("alpha", "1.0.0", &["base >= 1.0.0", "beta"])];
        let list = mod_list(&[("alpha", true), ("beta", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].to, "beta");
    }

    #[test]
    fn unlisted_installed_mod_is_disabled() {
        let installed_mods = vec![installed("alpha", "1.0.0", &[])];
        let graph = DependencyGraph::build(&installed_mods, &ModList::new());
        assert!(!graph.is_enabled("alpha"));
        assert!(graph.is_installed("alpha"));
    }

    #[test]
    fn listed_but_not_installed_node_exists_without_version() {
        let list = mod_list(&[("ghost", true)]);
        let graph = DependencyGraph::build(&[], &list);
        assert!(graph.is_listed("ghost"));
        assert!(!graph.is_installed("ghost"));
        assert_eq!(graph.active_version("ghost"), None);
    }
}
