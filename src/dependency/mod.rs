//! The dependency engine (§4.E): builds a graph over installed mods and `mod-list.json`,
//! validates it against Factorio's dependency rules, selects releases under version
//! requirements, and plans the mod sets each top-level command should act on.
//!
//! Kept deliberately free of I/O: every function here takes already-loaded data
//! ([`InstalledMod`](crate::mods::InstalledMod)s, a [`ModList`](crate::mods::ModList), portal
//! [`Release`](crate::mods::Release)s) and returns a plan or a validation result. Callers in the
//! orchestrator are responsible for loading that data and for executing a plan once computed.

mod graph;
mod plan;
mod release;
mod validate;

pub use graph::{DependencyGraph, Edge, Node};
pub use plan::{
    parse_spec, DisablePlan, EnablePlan, InstallPlan, InstallTarget, Planner, ResolvedInstall, UninstallPlan,
};
pub use release::{select_exact, select_release};
pub use validate::{ValidationResult, Validator};
