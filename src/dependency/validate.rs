//! Provides [`Validator`] and [`ValidationResult`], which check a [`DependencyGraph`] for the
//! five error kinds and two warning kinds described in §4.E.4, surfacing every problem found
//! rather than stopping at the first.

use super::graph::DependencyGraph;
use crate::error::{ValidationErrorKind, ValidationWarningKind};
use crate::mods::{DependencyKind, BASE_MOD};
use std::collections::HashMap;

/// Every validation problem found in one pass over a [`DependencyGraph`]. Errors make the mod
/// set unusable as-is; warnings are informational (list/disk drift that Factorio itself
/// tolerates).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Hard errors: missing/disabled dependencies, version mismatches, conflicts, cycles.
    pub errors: Vec<ValidationErrorKind>,
    /// Soft warnings: mod-list/disk drift.
    pub warnings: Vec<ValidationWarningKind>,
}

impl ValidationResult {
    /// Returns whether the graph validated cleanly (no errors; warnings don't count).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Stateless validator over a [`DependencyGraph`] (§4.E.4).
pub struct Validator;

impl Validator {
    /// Validates every edge and every node in `graph`, collecting all problems found.
    pub fn validate(graph: &DependencyGraph) -> ValidationResult {
        let mut result = ValidationResult::default();

        for edge in graph.edges() {
            match edge.kind {
                DependencyKind::Required => Self::check_required_edge(graph, edge, &mut result),
                DependencyKind::Incompatible => Self::check_conflict_edge(graph, edge, &mut result),
                DependencyKind::Optional | DependencyKind::HiddenOptional | DependencyKind::LoadNeutral => {}
            }
        }

        if let Some(cycle) = find_required_cycle(graph) {
            result.errors.push(ValidationErrorKind::CircularDependency { cycle });
        }

        for node in graph.nodes() {
            if node.identifier == BASE_MOD {
                continue;
            }

            if graph.is_listed(&node.identifier) && !node.installed {
                result
                    .warnings
                    .push(ValidationWarningKind::ModInListNotInstalled(node.identifier.clone()));
            }

            if node.installed && !graph.is_listed(&node.identifier) {
                result
                    .warnings
                    .push(ValidationWarningKind::ModInstalledNotInList(node.identifier.clone()));
            }
        }

        result
    }

    /// Checks one `required` edge against the target's installed/enabled/version state.
    fn check_required_edge(graph: &DependencyGraph, edge: &super::graph::Edge, result: &mut ValidationResult) {
        let target = match graph.node(&edge.to) {
            Some(target) if target.installed => target,
            _ => {
                result.errors.push(ValidationErrorKind::MissingDependency {
                    dependent: edge.from.clone(),
                    target: edge.to.clone(),
                });
                return;
            }
        };

        if !target.enabled {
            result.errors.push(ValidationErrorKind::DisabledDependency {
                dependent: edge.from.clone(),
                target: edge.to.clone(),
            });
            return;
        }

        if let (Some(requirement), Some(actual)) = (edge.requirement, target.version) {
            if !requirement.satisfied_by(actual) {
                result.errors.push(ValidationErrorKind::VersionMismatch {
                    dependent: edge.from.clone(),
                    target: edge.to.clone(),
                    requirement: requirement.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
    }

    /// Checks one `incompatible` edge: a conflict only materializes if both ends are enabled.
    fn check_conflict_edge(graph: &DependencyGraph, edge: &super::graph::Edge, result: &mut ValidationResult) {
        if graph.is_enabled(&edge.from) && graph.is_enabled(&edge.to) {
            result.errors.push(ValidationErrorKind::Conflict {
                first: edge.from.clone(),
                second: edge.to.clone(),
            });
        }
    }
}

/// One node's place in the DFS used by [`find_required_cycle`].
#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Finds one cycle among `required` edges, if any exists, via iterative-in-spirit DFS with an
/// explicit recursion stack of visited node names (§4.E.4's cycle detection; only `required`
/// edges participate, since optional/hidden/load-neutral relationships never force a load
/// order).
fn find_required_cycle(graph: &DependencyGraph) -> Option<Vec<String>> {
    let mut state: HashMap<String, VisitState> =
        graph.nodes().map(|n| (n.identifier.clone(), VisitState::Unvisited)).collect();
    let mut stack: Vec<String> = Vec::new();

    let names: Vec<String> = graph.nodes().map(|n| n.identifier.clone()).collect();
    for name in names {
        if state.get(&name).copied().unwrap_or(VisitState::Unvisited) == VisitState::Unvisited {
            if let Some(cycle) = visit(&name, graph, &mut state, &mut stack) {
                return Some(cycle);
            }
        }
    }

    None
}

/// Recursive DFS step for [`find_required_cycle`]; a plain function (not a closure) so it can
/// call itself while holding `&mut` borrows of `state`/`stack`.
fn visit(
    node: &str,
    graph: &DependencyGraph,
    state: &mut HashMap<String, VisitState>,
    stack: &mut Vec<String>,
) -> Option<Vec<String>> {
    match state.get(node).copied().unwrap_or(VisitState::Unvisited) {
        VisitState::Done => return None,
        VisitState::InProgress => {
            let pos = stack.iter().position(|n| n == node).expect("in-progress node must be on the stack");
            let mut cycle = stack[pos..].to_vec();
            cycle.push(node.to_string());
            return Some(cycle);
        }
        VisitState::Unvisited => {}
    }

    state.insert(node.to_string(), VisitState::InProgress);
    stack.push(node.to_string());

    for edge in graph.edges_from(node).filter(|e| e.kind == DependencyKind::Required) {
        if let Some(cycle) = visit(&edge.to, graph, state, stack) {
            return Some(cycle);
        }
    }

    stack.pop();
    state.insert(node.to_string(), VisitState::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::{Info, InstalledMod, ModList};

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
    fn missing_dependency_is_reported() {
        let installed_mods = vec![installed("alpha", "1.0.0", &["beta >= 2.0.0"])];
        let list = mod_list(&[("alpha", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        let result = Validator::validate(&graph);

        assert_eq!(result.errors.len(), 1);
        match &result.errors[0] {
            ValidationErrorKind::MissingDependency { target, .. } => assert_eq!(target, "beta"),
            other => panic!("expected MissingDependency, got {:?}", other),
        }
    }

    #[test]
    fn disabled_dependency_is_reported() {
        let installed_mods = vec![installed("alpha", "1.0.0", &["beta"]), installed("beta", "1.0.0", &[])];
        let list = mod_list(&[("alpha", true), ("beta", false)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        let result = Validator::validate(&graph);

        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ValidationErrorKind::DisabledDependency { target, .. } if target == "beta")));
    }

    #[test]
    fn version_mismatch_is_reported() {
        let installed_mods = vec![
            installed("alpha", "1.0.0", &["beta >= 2.0.0"]),
            installed("beta", "1.0.0", &[]),
        ];
        let list = mod_list(&[("alpha", true), ("beta", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        let result = Validator::validate(&graph);

        assert!(result.errors.iter().any(|e| matches!(e, ValidationErrorKind::VersionMismatch { .. })));
    }

    #[test]
    fn conflict_requires_both_enabled() {
        let installed_mods = vec![installed("alpha", "1.0.0", &["!evil"]), installed("evil", "1.0.0", &[])];

        let enabled_list = mod_list(&[("alpha", true), ("evil", true)]);
        let graph = DependencyGraph::build(&installed_mods, &enabled_list);
        assert!(Validator::validate(&graph)
            .errors
            .iter()
            .any(|e| matches!(e, ValidationErrorKind::Conflict { .. })));

        let disabled_list = mod_list(&[("alpha", true), ("evil", false)]);
        let graph = DependencyGraph::build(&installed_mods, &disabled_list);
        assert!(!Validator::validate(&graph)
            .errors
            .iter()
            .any(|e| matches!(e, ValidationErrorKind::Conflict { .. })));
    }

    #[test]
    fn no_cycle_among_required_edges_is_clean() {
        let installed_mods = vec![installed("alpha", "1.0.0", &["beta"]), installed("beta", "1.0.0", &[])];
        let list = mod_list(&[("alpha", true), ("beta", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        let result = Validator::validate(&graph);
        assert!(!result.errors.iter().any(|e| matches!(e, ValidationErrorKind::CircularDependency { .. })));
    }

    #[test]
    fn required_cycle_yields_exactly_one_error() {
        let installed_mods = vec![
            installed("alpha", "1.0.0", &["beta"]),
            installed("beta", "1.0.0", &["alpha"]),
        ];
        let list = mod_list(&[("alpha", true), ("beta", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        let result = Validator::validate(&graph);

        let cycles: Vec<_> = result
            .errors
            .iter()
            .filter(|e| matches!(e, ValidationErrorKind::CircularDependency { .. }))
            .collect();
        assert_eq!(cycles.len(), 1);
    }

    #[test]
    fn load_neutral_cycle_is_not_an_error() {
        let installed_mods = vec![
            installed("alpha", "1.0.0", &["~beta"]),
            installed("beta", "1.0.0", &["~alpha"]),
        ];
        let list = mod_list(&[("alpha", true), ("beta", true)]);
        let graph = DependencyGraph::build(&installed_mods, &list);
        let result = Validator::validate(&graph);
        assert!(result.is_valid());
    }

    #[test]
    fn warns_on_list_disk_drift() {
        let installed_mods = vec![installed("installed-only", "1.0.0", &[])];
        let mut list = ModList::new();
        list.set_enabled("installed-only", true).unwrap();
        list.set_enabled("listed-only", true).unwrap();
        let graph = DependencyGraph::build(&installed_mods, &list);
        let result = Validator::validate(&graph);

        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, ValidationWarningKind::ModInListNotInstalled(n) if n == "listed-only")));
    }
}
