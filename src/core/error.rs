use clarabel::solver::SolverStatus;

/// Errors raised while building or solving a finite-element QP.
#[derive(Debug, thiserror::Error)]
pub enum FemError {
    /// The problem configuration was rejected before any matrix was built.
    #[error("invalid problem parameters: {0}")]
    InvalidParams(String),

    /// The constraint builder emitted a different number of rows than the
    /// layout requires.
    #[error("constraint row count mismatch: built {built}, expected {expected}")]
    RowCountMismatch { built: usize, expected: usize },

    /// Clarabel rejected the solver settings.
    #[error("invalid solver settings: {0}")]
    Settings(String),

    /// The solver terminated without an optimal point.
    #[error("solver did not find an optimal solution (status: {status:?})")]
    SolverFailed { status: SolverStatus },
}
