//! Back-end selection.
//!
//! Back-ends make themselves available under a name; parsing a name yields a
//! [`SolverKind`], which couples the name with the factory it resolved to.
//! Resolution happens once, at parse time, so building a back-end from a
//! parsed kind cannot fail even if the table changes afterwards. Names are
//! case-insensitive and stored lowercased; the alias `"default"` resolves to
//! the native simplex.

use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;

use super::backend::LpBackend;
use super::simplex::SimplexBackend;

/// Constructs a fresh back-end instance for one optimization run
pub type BackendFactory = fn() -> Box<dyn LpBackend>;

static FACTORIES: Lazy<RwLock<Vec<(String, BackendFactory)>>> = Lazy::new(|| {
    let simplex: BackendFactory = || Box::new(SimplexBackend::new());
    RwLock::new(vec![("simplex".to_string(), simplex)])
});

/// Make a back-end available under `name`.
///
/// Registering an already-taken name replaces its factory; kinds parsed
/// before the replacement keep building the back-end they resolved to.
pub fn register_solver(name: &str, factory: BackendFactory) {
    let mut factories = FACTORIES.write().expect("backend table lock poisoned");
    match factories
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
    {
        Some(entry) => entry.1 = factory,
        None => factories.push((name.to_ascii_lowercase(), factory)),
    }
}

/// A resolved back-end choice.
#[derive(Clone)]
pub struct SolverKind {
    name: String,
    factory: BackendFactory,
}

impl SolverKind {
    /// The registered name this kind resolved to (lowercased)
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Names `FromStr` currently accepts, in registration order
    pub fn available() -> Vec<String> {
        let factories = FACTORIES.read().expect("backend table lock poisoned");
        factories.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Fresh back-end instance for one optimization run
    pub fn build_backend(&self) -> Box<dyn LpBackend> {
        (self.factory)()
    }
}

// Two kinds are the same choice when they resolved to the same name; the
// factory pointer is an implementation detail
impl PartialEq for SolverKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SolverKind {}

impl fmt::Debug for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SolverKind").field(&self.name).finish()
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for SolverKind {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Self> {
        let wanted = if input.eq_ignore_ascii_case("default") {
            "simplex"
        } else {
            input
        };
        let factories = FACTORIES.read().expect("backend table lock poisoned");
        factories
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(name, factory)| SolverKind {
                name: name.clone(),
                factory: *factory,
            })
            .ok_or_else(|| {
                let names: Vec<&str> = factories.iter().map(|(n, _)| n.as_str()).collect();
                anyhow!(
                    "no back-end named '{input}' is registered (have: {})",
                    names.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SolveStatus;

    #[test]
    fn resolves_case_insensitively() {
        let kind: SolverKind = "SIMPLEX".parse().unwrap();
        assert_eq!(kind.as_str(), "simplex");
        assert_eq!(kind.to_string(), "simplex");
    }

    #[test]
    fn default_alias_means_simplex() {
        let kind: SolverKind = "default".parse().unwrap();
        assert_eq!(kind, "simplex".parse().unwrap());
    }

    #[test]
    fn unknown_name_lists_what_exists() {
        let err = "gurobi".parse::<SolverKind>().unwrap_err().to_string();
        assert!(err.contains("no back-end named 'gurobi'"));
        assert!(err.contains("simplex"));
    }

    #[test]
    fn parsed_kind_builds_a_working_backend() {
        let kind: SolverKind = "simplex".parse().unwrap();
        let mut backend = kind.build_backend();
        let x = backend.make_num_var(0.0, 5.0, "x");
        backend.objective_set_coefficient(x, 1.0);
        backend.objective_maximize();
        assert_eq!(backend.solve(), SolveStatus::Optimal);
        assert!((backend.value(x) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn registration_is_case_folded_and_replaceable() {
        register_solver("Registry-Test", || Box::new(SimplexBackend::new()));
        let kind: SolverKind = "registry-test".parse().unwrap();
        assert_eq!(kind.as_str(), "registry-test");
        assert!(SolverKind::available().contains(&"registry-test".to_string()));

        // Re-registering the same name must not grow the table
        let before = SolverKind::available().len();
        register_solver("REGISTRY-TEST", || Box::new(SimplexBackend::new()));
        assert_eq!(SolverKind::available().len(), before);
    }
}
