//! LP/MIP back-end abstraction.
//!
//! Mathematical-programming formulations are built against the [`LpBackend`]
//! trait and stay agnostic of the solving library. Two back-ends ship with
//! the workspace:
//!
//! - `"simplex"` (this crate): a dense two-phase primal simplex with
//!   branch-and-bound on boolean variables. No external dependency; the
//!   reference back-end for tests.
//! - `"clarabel"` (gasnet-algo): a `good_lp`/Clarabel wrapper registered into
//!   the same registry at engine start-up.
//!
//! Back-ends are scoped to a single optimize call: build the model, solve,
//! read values, drop.

pub mod backend;
pub mod registry;
pub mod simplex;

pub use backend::{
    branch_and_bound, ConstraintId, LpBackend, LpModel, LpOutcome, SolveStatus, VarId,
};
pub use registry::{register_solver, BackendFactory, SolverKind};
pub use simplex::SimplexBackend;
