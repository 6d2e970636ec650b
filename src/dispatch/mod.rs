//! Dispatch engine: build the linear program, solve it, decode the result.

pub mod builder;
pub mod decode;
pub mod policy;
pub mod program;

pub use builder::*;
pub use decode::*;
pub use policy::*;
pub use program::*;

use tracing::info;

use crate::domain::DispatchResult;
use crate::error::DispatchError;
use crate::solver::SolverBackend;

/// One blocking Build -> Solve -> Decode call.
///
/// Pure function of its inputs; nothing persists between invocations. The
/// solver call is the only potentially slow step and is treated as an
/// exclusive critical section per backend instance.
pub fn solve_dispatch(
    input: &DispatchInput,
    backend: &dyn SolverBackend,
) -> Result<DispatchResult, DispatchError> {
    let program = builder::build_program(input)?;
    let outcome = backend.solve(&program)?;
    info!(
        solver = backend.name(),
        mode = %input.policy.mode(),
        status = %outcome.status,
        objective = outcome.objective,
        "dispatch solve finished"
    );
    Ok(decode::decode(&program, &outcome))
}
