//! The back-end trait, the shared in-memory model, and the branch-and-bound
//! driver both shipped back-ends use for boolean variables.

use std::time::{Duration, Instant};

/// Opaque handle to a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Opaque handle to a two-sided constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub(crate) usize);

impl ConstraintId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Terminal state of a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolveStatus {
    /// `solve` has not been called
    #[default]
    NotSolved,
    /// Proven optimal
    Optimal,
    /// Feasible but not proven optimal (e.g., time limit)
    Feasible,
    /// No feasible point exists
    Infeasible,
    /// Objective unbounded over the feasible region
    Unbounded,
    /// Back-end failure
    Error,
}

impl SolveStatus {
    /// True for statuses that carry a usable variable assignment
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SolveStatus::NotSolved => "not-solved",
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Uniform interface over a linear / mixed-integer programming back-end.
///
/// Constraints are inclusive and two-sided (`lo <= expr <= hi`); use
/// `f64::INFINITY` / `f64::NEG_INFINITY` for one-sided rows. Variable and
/// constraint construction order is the caller's responsibility and must be
/// deterministic for reproducible runs.
pub trait LpBackend {
    /// Back-end identifier ("simplex", "clarabel", ...)
    fn name(&self) -> &str;

    /// Add a continuous variable with inclusive bounds
    fn make_num_var(&mut self, lo: f64, hi: f64, name: &str) -> VarId;

    /// Add a boolean (0/1) variable
    fn make_bool_var(&mut self, name: &str) -> VarId;

    /// Add an empty two-sided constraint
    fn make_constraint(&mut self, lo: f64, hi: f64, name: &str) -> ConstraintId;

    /// Set the coefficient of `var` in `constraint`
    fn set_coefficient(&mut self, constraint: ConstraintId, var: VarId, coefficient: f64);

    /// Set the objective coefficient of `var`
    fn objective_set_coefficient(&mut self, var: VarId, coefficient: f64);

    /// Minimize the objective
    fn objective_minimize(&mut self);

    /// Maximize the objective
    fn objective_maximize(&mut self);

    /// Wall-clock cap for `solve`
    fn set_time_limit(&mut self, limit: Duration);

    /// Run the search
    fn solve(&mut self) -> SolveStatus;

    /// Value of a variable in the incumbent solution (0.0 before solve)
    fn value(&self, var: VarId) -> f64;

    /// Objective value of the incumbent solution
    fn objective_value(&self) -> f64;

    /// Whether the back-end accepts quadratic constraints. Neither shipped
    /// back-end does; pressure formulations must fall back to the
    /// piecewise-linear form when this is false.
    fn supports_quadratic(&self) -> bool {
        false
    }
}

/// Objective sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sense {
    #[default]
    Minimize,
    Maximize,
}

/// A variable definition in the shared model
#[derive(Debug, Clone)]
pub struct VarDef {
    pub lo: f64,
    pub hi: f64,
    pub name: String,
    pub is_bool: bool,
}

/// A two-sided row in the shared model
#[derive(Debug, Clone)]
pub struct ConstraintDef {
    pub lo: f64,
    pub hi: f64,
    pub name: String,
    /// (variable index, coefficient) pairs in insertion order
    pub coefficients: Vec<(usize, f64)>,
}

/// In-memory LP/MIP model shared by the shipped back-ends.
///
/// Back-ends embed an `LpModel`, let formulations populate it through the
/// [`LpBackend`] methods, and translate it to their native representation
/// inside `solve`.
#[derive(Debug, Clone, Default)]
pub struct LpModel {
    pub variables: Vec<VarDef>,
    pub constraints: Vec<ConstraintDef>,
    pub objective: Vec<f64>,
    pub sense: Sense,
    pub time_limit: Option<Duration>,
}

impl LpModel {
    pub fn add_num_var(&mut self, lo: f64, hi: f64, name: &str) -> VarId {
        self.variables.push(VarDef {
            lo,
            hi,
            name: name.to_string(),
            is_bool: false,
        });
        self.objective.push(0.0);
        VarId(self.variables.len() - 1)
    }

    pub fn add_bool_var(&mut self, name: &str) -> VarId {
        self.variables.push(VarDef {
            lo: 0.0,
            hi: 1.0,
            name: name.to_string(),
            is_bool: true,
        });
        self.objective.push(0.0);
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, lo: f64, hi: f64, name: &str) -> ConstraintId {
        self.constraints.push(ConstraintDef {
            lo,
            hi,
            name: name.to_string(),
            coefficients: Vec::new(),
        });
        ConstraintId(self.constraints.len() - 1)
    }

    pub fn set_coefficient(&mut self, constraint: ConstraintId, var: VarId, coefficient: f64) {
        let row = &mut self.constraints[constraint.0];
        // Last write wins, matching the trait contract
        if let Some(entry) = row.coefficients.iter_mut().find(|(idx, _)| *idx == var.0) {
            entry.1 = coefficient;
        } else {
            row.coefficients.push((var.0, coefficient));
        }
    }

    pub fn set_objective_coefficient(&mut self, var: VarId, coefficient: f64) {
        self.objective[var.0] = coefficient;
    }

    /// Indices of boolean variables
    pub fn bool_vars(&self) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_bool)
            .map(|(i, _)| i)
            .collect()
    }

    /// Evaluate the objective for a variable assignment
    pub fn objective_at(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .map(|(c, x)| c * x)
            .sum()
    }
}

/// Outcome of one relaxation solve
#[derive(Debug, Clone)]
pub struct LpOutcome {
    pub status: SolveStatus,
    pub values: Vec<f64>,
    pub objective: f64,
}

impl LpOutcome {
    pub fn status_only(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: 0.0,
        }
    }
}

const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Depth-first branch-and-bound over the model's boolean variables.
///
/// `solve_relaxation` receives `(var index, lo, hi)` bound overrides and
/// solves the continuous relaxation under them. Incumbents prune by
/// objective bound; the deadline turns a proven optimum into `Feasible` when
/// the search is cut short with an incumbent in hand.
pub fn branch_and_bound<F>(
    model: &LpModel,
    deadline: Option<Instant>,
    solve_relaxation: F,
) -> LpOutcome
where
    F: Fn(&[(usize, f64, f64)]) -> LpOutcome,
{
    let bool_vars = model.bool_vars();
    if bool_vars.is_empty() {
        return solve_relaxation(&[]);
    }

    let minimize = model.sense == Sense::Minimize;
    let mut incumbent: Option<LpOutcome> = None;
    let mut explored_all = true;
    let mut stack: Vec<Vec<(usize, f64, f64)>> = vec![Vec::new()];

    while let Some(overrides) = stack.pop() {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                explored_all = false;
                break;
            }
        }

        let relaxed = solve_relaxation(&overrides);
        if !relaxed.status.has_solution() {
            continue;
        }

        // Bound pruning against the incumbent
        if let Some(best) = &incumbent {
            let worse = if minimize {
                relaxed.objective >= best.objective - 1e-9
            } else {
                relaxed.objective <= best.objective + 1e-9
            };
            if worse {
                continue;
            }
        }

        // Most fractional boolean picks the branching variable
        let fractional = bool_vars
            .iter()
            .copied()
            .map(|idx| (idx, (relaxed.values[idx] - relaxed.values[idx].round()).abs()))
            .filter(|(_, frac)| *frac > INTEGRALITY_TOLERANCE)
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match fractional {
            None => {
                let better = match &incumbent {
                    None => true,
                    Some(best) => {
                        if minimize {
                            relaxed.objective < best.objective - 1e-9
                        } else {
                            relaxed.objective > best.objective + 1e-9
                        }
                    }
                };
                if better {
                    incumbent = Some(relaxed);
                }
            }
            Some((branch_var, _)) => {
                let mut fixed_zero = overrides.clone();
                fixed_zero.push((branch_var, 0.0, 0.0));
                let mut fixed_one = overrides;
                fixed_one.push((branch_var, 1.0, 1.0));
                stack.push(fixed_zero);
                stack.push(fixed_one);
            }
        }
    }

    match incumbent {
        Some(mut best) => {
            // Round binaries exactly so downstream coupling constraints see
            // clean activation values
            for &idx in &bool_vars {
                best.values[idx] = best.values[idx].round();
            }
            best.objective = model.objective_at(&best.values);
            best.status = if explored_all {
                SolveStatus::Optimal
            } else {
                SolveStatus::Feasible
            };
            best
        }
        None => {
            if explored_all {
                LpOutcome::status_only(SolveStatus::Infeasible)
            } else {
                LpOutcome::status_only(SolveStatus::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_construction() {
        let mut model = LpModel::default();
        let x = model.add_num_var(0.0, 10.0, "x");
        let y = model.add_bool_var("y");
        let c = model.add_constraint(0.0, 5.0, "cap");
        model.set_coefficient(c, x, 1.0);
        model.set_coefficient(c, y, 2.0);
        model.set_objective_coefficient(x, 3.0);

        assert_eq!(model.variables.len(), 2);
        assert_eq!(model.bool_vars(), vec![1]);
        assert_eq!(model.constraints[0].coefficients.len(), 2);
        assert_eq!(model.objective_at(&[2.0, 1.0]), 6.0);
    }

    #[test]
    fn test_set_coefficient_overwrites() {
        let mut model = LpModel::default();
        let x = model.add_num_var(0.0, 1.0, "x");
        let c = model.add_constraint(0.0, 1.0, "c");
        model.set_coefficient(c, x, 1.0);
        model.set_coefficient(c, x, 4.0);
        assert_eq!(model.constraints[0].coefficients, vec![(0, 4.0)]);
    }

    #[test]
    fn test_branch_and_bound_knapsack() {
        // max 5a + 4b + 3c  s.t.  2a + 3b + c <= 3, a,b,c in {0,1}
        // Optimum: a=1, c=1, objective 8
        let mut model = LpModel::default();
        let a = model.add_bool_var("a");
        let b = model.add_bool_var("b");
        let c = model.add_bool_var("c");
        model.set_objective_coefficient(a, 5.0);
        model.set_objective_coefficient(b, 4.0);
        model.set_objective_coefficient(c, 3.0);
        model.sense = Sense::Maximize;
        let row = model.add_constraint(f64::NEG_INFINITY, 3.0, "weight");
        model.set_coefficient(row, a, 2.0);
        model.set_coefficient(row, b, 3.0);
        model.set_coefficient(row, c, 1.0);

        // Exact LP relaxation via simplex back-end internals
        let outcome = branch_and_bound(&model, None, |overrides| {
            crate::solver::simplex::solve_relaxation(&model, overrides, None)
        });
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((outcome.objective - 8.0).abs() < 1e-6);
        assert!((outcome.values[0] - 1.0).abs() < 1e-6);
        assert!(outcome.values[1].abs() < 1e-6);
        assert!((outcome.values[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_branch_and_bound_infeasible() {
        // a + b >= 3 with binaries is infeasible
        let mut model = LpModel::default();
        let a = model.add_bool_var("a");
        let b = model.add_bool_var("b");
        let row = model.add_constraint(3.0, f64::INFINITY, "min");
        model.set_coefficient(row, a, 1.0);
        model.set_coefficient(row, b, 1.0);

        let outcome = branch_and_bound(&model, None, |overrides| {
            crate::solver::simplex::solve_relaxation(&model, overrides, None)
        });
        assert_eq!(outcome.status, SolveStatus::Infeasible);
    }
}
