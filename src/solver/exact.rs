//! Exact LP backend.
//!
//! Translates the abstract program 1:1 into `good_lp` and solves it with
//! the bundled pure-Rust simplex solver. Within floating tolerance this
//! backend returns the true optimum; `Infeasible` and `Unbounded` come back
//! as statuses, never as errors.

use good_lp::{variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel};
use tracing::warn;

use crate::dispatch::program::{Assignment, DispatchProgram, Relation, VarId};
use crate::domain::SolveStatus;
use crate::error::DispatchError;
use crate::solver::{SolverBackend, SolverOutcome};

/// Deterministic exact solver. Stateless; safe to share across solves but
/// each `solve` call is treated as an exclusive critical section.
#[derive(Debug, Default)]
pub struct ExactSolver;

impl SolverBackend for ExactSolver {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn solve(&self, program: &DispatchProgram) -> Result<SolverOutcome, DispatchError> {
        let mut problem = ProblemVariables::new();
        let vars: Vec<good_lp::Variable> = program
            .vars
            .iter()
            .map(|def| {
                let mut spec = variable().min(def.lower);
                if let Some(upper) = def.upper {
                    spec = spec.max(upper);
                }
                problem.add(spec)
            })
            .collect();

        let objective: Expression = program
            .objective
            .terms
            .iter()
            .map(|(id, coefficient)| *coefficient * vars[id.0])
            .sum();

        let mut model = problem.minimise(objective).using(good_lp::default_solver);
        for constraint in &program.constraints {
            let lhs: Expression = constraint
                .expr
                .terms
                .iter()
                .map(|(id, coefficient)| *coefficient * vars[id.0])
                .sum();
            let row = match constraint.relation {
                Relation::Eq => good_lp::constraint::eq(lhs, constraint.rhs),
                Relation::Le => good_lp::constraint::leq(lhs, constraint.rhs),
                Relation::Ge => good_lp::constraint::geq(lhs, constraint.rhs),
            };
            model = model.with(row);
        }

        match model.solve() {
            Ok(solution) => {
                let mut assignment = Assignment::zeroed(program.num_vars());
                for (i, var) in vars.iter().enumerate() {
                    assignment.set(VarId(i), solution.value(*var));
                }
                let objective_value = program.objective_value(&assignment);
                Ok(SolverOutcome::optimal(assignment, Some(objective_value)))
            }
            Err(ResolutionError::Infeasible) => {
                Ok(SolverOutcome::status_only(SolveStatus::Infeasible))
            }
            Err(ResolutionError::Unbounded) => {
                Ok(SolverOutcome::status_only(SolveStatus::Unbounded))
            }
            Err(other) => {
                warn!(error = %other, "LP solve failed without a definitive status");
                Ok(SolverOutcome::status_only(SolveStatus::NotSolved))
            }
        }
    }
}
