//! Error taxonomy for the scheduling core.
//!
//! Every per-request failure mode is represented here so the worker can
//! always fold a failure into a structured result envelope instead of
//! letting it escape the processing loop.

use thiserror::Error;

/// A failure that occurred while processing a single schedule request.
///
/// The `Display` output of each variant is exactly the `"<kind>: <message>"`
/// string that goes into a result envelope's `error` field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// The request envelope was malformed or internally inconsistent.
    #[error("validation_error: {0}")]
    Validation(String),

    /// The solver proved no assignment satisfies the hard constraints.
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// The solver's time budget expired without a feasible solution.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The solver returned a status outside the known success/infeasible/timeout set.
    #[error("solver_error: {0}")]
    SolverError(String),

    /// A programming error or corrupted envelope that isn't a validation failure.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl ProcessingError {
    /// Short machine-readable kind, e.g. `"validation_error"`.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Validation(_) => "validation_error",
            ProcessingError::Infeasible(_) => "infeasible",
            ProcessingError::Timeout(_) => "timeout",
            ProcessingError::SolverError(_) => "solver_error",
            ProcessingError::Fatal(_) => "fatal",
        }
    }
}
