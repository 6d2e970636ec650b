use thiserror::Error;

/// Errors that abort a dispatch call.
///
/// Solver outcomes (infeasible, unbounded, not solved) are *not* errors:
/// they are returned as [`crate::domain::SolveStatus`] so callers can branch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid input `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    #[error("solver backend `{0}` is not available in this build")]
    SolverUnavailable(&'static str),
}

impl DispatchError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
