/// Failures of the scheduling and distribution core.
///
/// The core never retries: every variant is returned to the caller, who decides the fallback.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("the linear program is infeasible")]
    SolverInfeasible,

    #[error("the solver failed: {0}")]
    Solver(String),
}

impl Error {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
