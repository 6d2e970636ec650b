use serde::{Deserialize, Serialize};
use strum::Display;

/// Solver outcome, returned as data so callers can branch on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[strum(serialize_all = "PascalCase")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NotSolved,
}

/// Per-hour decisions shared by both modes, plus mode-specific flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchPlan {
    pub charge_kwh: Vec<f64>,
    pub discharge_kwh: Vec<f64>,
    pub soc_kwh: Vec<f64>,
    pub curtail_kwh: Vec<f64>,
    pub flows: PlanFlows,
}

/// Mode-specific decision families.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlanFlows {
    Grid {
        import_kwh: Vec<f64>,
        export_kwh: Vec<f64>,
        unmet_kwh: Vec<f64>,
    },
    Island {
        classes: Vec<ClassPlan>,
    },
}

/// Served / unmet series for one load class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPlan {
    pub name: String,
    pub served_kwh: Vec<f64>,
    pub unmet_kwh: Vec<f64>,
}

impl DispatchPlan {
    pub fn horizon(&self) -> usize {
        self.charge_kwh.len()
    }
}

/// Aggregates derived from a solved plan. Values are raw sums of the solved
/// variables; any rounding happens at presentation time only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub total_charge_kwh: f64,
    pub total_discharge_kwh: f64,
    pub total_curtail_kwh: f64,
    pub flows: SummaryFlows,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SummaryFlows {
    Grid {
        total_import_kwh: f64,
        total_export_kwh: f64,
        total_unmet_kwh: f64,
    },
    Island {
        classes: Vec<ClassSummary>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSummary {
    pub name: String,
    pub total_served_kwh: f64,
    pub total_unmet_kwh: f64,
    /// Unmet energy over total demand; 0 when the class has no demand.
    pub unmet_fraction: f64,
}

/// Full result of one dispatch solve.
///
/// On any non-`Optimal` status the numeric fields are `None`; the decoder
/// never fabricates zeros for an unsolved plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub status: SolveStatus,
    pub objective_value: Option<f64>,
    pub plan: Option<DispatchPlan>,
    pub summary: Option<DispatchSummary>,
}

impl DispatchResult {
    pub fn unsolved(status: SolveStatus) -> Self {
        Self {
            status,
            objective_value: None,
            plan: None,
            summary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_renders_like_a_solver_status() {
        assert_eq!(SolveStatus::Optimal.to_string(), "Optimal");
        assert_eq!(SolveStatus::NotSolved.to_string(), "NotSolved");
    }

    #[test]
    fn unsolved_result_has_no_numbers() {
        let result = DispatchResult::unsolved(SolveStatus::Infeasible);
        assert_eq!(result.status, SolveStatus::Infeasible);
        assert!(result.objective_value.is_none());
        assert!(result.plan.is_none());
        assert!(result.summary.is_none());
    }
}
