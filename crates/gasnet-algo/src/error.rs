use thiserror::Error;

/// Errors produced while preparing or running an optimization.
///
/// The engine facade converts every variant into an `Error`-status
/// [`crate::OptimizationResult`] at its boundary; callers embedding
/// algorithms directly get the typed form.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input data failed validation before any computation
    #[error("data validation failed: {0}")]
    DataValidation(String),

    /// Settings are out of range or inconsistent
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The requested algorithm is not registered
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// `can_handle` rejected the network/settings combination
    #[error("algorithm '{0}' cannot handle this input: {1}")]
    NotApplicable(String, String),

    /// The back-end failed outright (distinct from Infeasible/Unbounded,
    /// which are regular result statuses)
    #[error("solver failure: {0}")]
    Solver(String),
}
