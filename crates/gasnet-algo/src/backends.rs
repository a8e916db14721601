//! LP back-ends contributed by this crate.
//!
//! The Clarabel wrapper translates the shared [`LpModel`] into a `good_lp`
//! problem per solve. Clarabel itself is continuous-only; boolean variables
//! go through the same branch-and-bound driver the native simplex uses, with
//! Clarabel solving each relaxation.

#[cfg(feature = "solver-clarabel")]
use std::time::{Duration, Instant};

#[cfg(feature = "solver-clarabel")]
use gasnet_core::solver::backend::Sense;
#[cfg(feature = "solver-clarabel")]
use gasnet_core::solver::{
    branch_and_bound, ConstraintId, LpBackend, LpModel, LpOutcome, SolveStatus, VarId,
};
use gasnet_core::solver::register_solver;

#[cfg(feature = "solver-clarabel")]
use good_lp::solvers::clarabel::clarabel;
#[cfg(feature = "solver-clarabel")]
use good_lp::{constraint, variable, variables, Expression, ResolutionError, Solution, SolverModel};

use std::sync::Once;

/// Register this crate's back-ends into the global solver registry.
///
/// Idempotent; the engine calls it on construction.
pub fn register_builtin_backends() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        #[cfg(feature = "solver-clarabel")]
        register_solver("clarabel", || Box::new(ClarabelBackend::new()));
        // Without the clarabel feature only the core "simplex" back-end is
        // available; keep the hook so the call site stays unconditional.
        #[cfg(not(feature = "solver-clarabel"))]
        let _ = register_solver;
    });
}

/// `good_lp`/Clarabel implementation of the back-end trait.
#[cfg(feature = "solver-clarabel")]
#[derive(Debug, Default)]
pub struct ClarabelBackend {
    model: LpModel,
    status: SolveStatus,
    solution: Vec<f64>,
    objective: f64,
}

#[cfg(feature = "solver-clarabel")]
impl ClarabelBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "solver-clarabel")]
fn solve_clarabel_relaxation(model: &LpModel, overrides: &[(usize, f64, f64)]) -> LpOutcome {
    let mut vars = variables!();
    let mut handles = Vec::with_capacity(model.variables.len());
    for (j, def) in model.variables.iter().enumerate() {
        let mut lo = def.lo;
        let mut hi = def.hi;
        for &(idx, override_lo, override_hi) in overrides {
            if idx == j {
                lo = lo.max(override_lo);
                hi = hi.min(override_hi);
            }
        }
        if lo > hi {
            return LpOutcome::status_only(SolveStatus::Infeasible);
        }
        let mut builder = variable();
        if lo.is_finite() {
            builder = builder.min(lo);
        }
        if hi.is_finite() {
            builder = builder.max(hi);
        }
        handles.push(vars.add(builder));
    }

    let mut objective_expr = Expression::from(0.0);
    for (j, &coefficient) in model.objective.iter().enumerate() {
        if coefficient != 0.0 {
            objective_expr += coefficient * handles[j];
        }
    }

    let mut problem = match model.sense {
        Sense::Minimize => vars.minimise(objective_expr).using(clarabel),
        Sense::Maximize => vars.maximise(objective_expr).using(clarabel),
    };

    for row in &model.constraints {
        let mut expr = Expression::from(0.0);
        for &(j, coefficient) in &row.coefficients {
            expr += coefficient * handles[j];
        }
        let equality = row.lo.is_finite()
            && row.hi.is_finite()
            && (row.hi - row.lo).abs() < 1e-12;
        if equality {
            let rhs = row.lo;
            problem = problem.with(constraint!(expr == rhs));
        } else {
            if row.hi.is_finite() {
                let lhs = expr.clone();
                let rhs = row.hi;
                problem = problem.with(constraint!(lhs <= rhs));
            }
            if row.lo.is_finite() {
                let lhs = expr;
                let rhs = row.lo;
                problem = problem.with(constraint!(lhs >= rhs));
            }
        }
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = handles.iter().map(|v| solution.value(*v)).collect();
            let objective = model.objective_at(&values);
            LpOutcome {
                status: SolveStatus::Optimal,
                values,
                objective,
            }
        }
        Err(ResolutionError::Infeasible) => LpOutcome::status_only(SolveStatus::Infeasible),
        Err(ResolutionError::Unbounded) => LpOutcome::status_only(SolveStatus::Unbounded),
        Err(_) => LpOutcome::status_only(SolveStatus::Error),
    }
}

#[cfg(feature = "solver-clarabel")]
impl LpBackend for ClarabelBackend {
    fn name(&self) -> &str {
        "clarabel"
    }

    fn make_num_var(&mut self, lo: f64, hi: f64, name: &str) -> VarId {
        self.model.add_num_var(lo, hi, name)
    }

    fn make_bool_var(&mut self, name: &str) -> VarId {
        self.model.add_bool_var(name)
    }

    fn make_constraint(&mut self, lo: f64, hi: f64, name: &str) -> ConstraintId {
        self.model.add_constraint(lo, hi, name)
    }

    fn set_coefficient(&mut self, constraint: ConstraintId, var: VarId, coefficient: f64) {
        self.model.set_coefficient(constraint, var, coefficient);
    }

    fn objective_set_coefficient(&mut self, var: VarId, coefficient: f64) {
        self.model.set_objective_coefficient(var, coefficient);
    }

    fn objective_minimize(&mut self) {
        self.model.sense = Sense::Minimize;
    }

    fn objective_maximize(&mut self) {
        self.model.sense = Sense::Maximize;
    }

    fn set_time_limit(&mut self, limit: Duration) {
        self.model.time_limit = Some(limit);
    }

    fn solve(&mut self) -> SolveStatus {
        let deadline = self.model.time_limit.map(|limit| Instant::now() + limit);
        let outcome = branch_and_bound(&self.model, deadline, |overrides| {
            solve_clarabel_relaxation(&self.model, overrides)
        });
        self.status = outcome.status;
        if outcome.status.has_solution() {
            self.solution = outcome.values;
            self.objective = outcome.objective;
        } else {
            self.solution = vec![0.0; self.model.variables.len()];
            self.objective = 0.0;
        }
        self.status
    }

    fn value(&self, var: VarId) -> f64 {
        self.solution.get(var.index()).copied().unwrap_or(0.0)
    }

    fn objective_value(&self) -> f64 {
        self.objective
    }
}
