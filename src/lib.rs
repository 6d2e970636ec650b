//! Daily battery dispatch optimization engine.
//!
//! Builds a per-hour linear program over a fixed horizon (canonically 24
//! steps) that decides battery charge/discharge, curtailment, and either
//! grid import/export (cost mode) or priority-weighted load shedding
//! (islanded mode), solves it through a pluggable solver backend, and
//! decodes the assignment into a structured dispatch plan.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod report;
pub mod solver;
pub mod telemetry;

pub use dispatch::{solve_dispatch, DispatchInput, DispatchMode, DispatchPolicy, PenaltyWeights};
pub use domain::{DispatchPlan, DispatchResult, SolveStatus};
pub use error::DispatchError;
pub use solver::{backend, SolverBackend, SolverKind};
