//! Solver adapter: pluggable backends behind one `solve(program)` contract.

pub mod anneal;
#[cfg(feature = "optimization")]
pub mod exact;

pub use anneal::*;
#[cfg(feature = "optimization")]
pub use exact::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::dispatch::program::{Assignment, DispatchProgram};
use crate::domain::SolveStatus;
use crate::error::DispatchError;

/// Status + assignment returned by a backend.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub status: SolveStatus,
    pub objective: Option<f64>,
    pub assignment: Option<Assignment>,
}

impl SolverOutcome {
    pub fn optimal(assignment: Assignment, objective: Option<f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective,
            assignment: Some(assignment),
        }
    }

    pub fn status_only(status: SolveStatus) -> Self {
        Self {
            status,
            objective: None,
            assignment: None,
        }
    }
}

/// A conforming linear-program solver.
///
/// Implementations are stateless with respect to solve calls: independent
/// calls on separate instances may run in parallel, but one instance must
/// not be shared concurrently (the call is an exclusive critical section).
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, program: &DispatchProgram) -> Result<SolverOutcome, DispatchError>;
}

/// Backend selector, environment-independent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Exact LP backend (good_lp / minilp). Returns the true optimum.
    #[default]
    Exact,
    /// Experimental quantum-inspired annealing backend. Approximate.
    Annealing,
}

/// Instantiate the requested backend.
///
/// Fails with `SolverUnavailable` when the backend is not compiled into
/// this build; there is no silent fallback to a different backend.
pub fn backend(kind: SolverKind) -> Result<Box<dyn SolverBackend>, DispatchError> {
    match kind {
        #[cfg(feature = "optimization")]
        SolverKind::Exact => Ok(Box::new(ExactSolver::default())),
        #[cfg(not(feature = "optimization"))]
        SolverKind::Exact => Err(DispatchError::SolverUnavailable("exact")),
        SolverKind::Annealing => Ok(Box::new(AnnealingSolver::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn kind_round_trips_through_strings() {
        assert_eq!(SolverKind::from_str("exact").unwrap(), SolverKind::Exact);
        assert_eq!(
            SolverKind::from_str("annealing").unwrap(),
            SolverKind::Annealing
        );
        assert!(SolverKind::from_str("simplex").is_err());
        assert_eq!(SolverKind::Exact.to_string(), "exact");
    }

    #[test]
    fn annealing_backend_is_always_available() {
        let solver = backend(SolverKind::Annealing).unwrap();
        assert_eq!(solver.name(), "annealing");
    }

    #[cfg(feature = "optimization")]
    #[test]
    fn exact_backend_is_available_with_the_feature() {
        let solver = backend(SolverKind::Exact).unwrap();
        assert_eq!(solver.name(), "exact");
    }
}
