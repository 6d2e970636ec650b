//! Rendering of dispatch results for the CLI.
//!
//! Rounding happens here and only here; the solved values in
//! [`DispatchResult`] stay untouched.

use std::fmt::Write as _;

use crate::domain::{DispatchResult, PlanFlows, SummaryFlows};

/// Aligned per-hour table plus aggregate lines.
pub fn render_table(result: &DispatchResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Status: {}", result.status);

    let (Some(plan), Some(summary)) = (&result.plan, &result.summary) else {
        let _ = writeln!(out, "No plan available.");
        return out;
    };
    if let Some(objective) = result.objective_value {
        let _ = writeln!(out, "Objective: {objective:.2}");
    }

    match &plan.flows {
        PlanFlows::Grid {
            import_kwh,
            export_kwh,
            unmet_kwh,
        } => {
            let _ = writeln!(
                out,
                "{:>4} {:>8} {:>10} {:>8} {:>8} {:>8} {:>8} {:>8}",
                "hour", "charge", "discharge", "import", "export", "soc", "unmet", "curtail"
            );
            for h in 0..plan.horizon() {
                let _ = writeln!(
                    out,
                    "{h:>4} {:>8.2} {:>10.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2} {:>8.2}",
                    plan.charge_kwh[h],
                    plan.discharge_kwh[h],
                    import_kwh[h],
                    export_kwh[h],
                    plan.soc_kwh[h],
                    unmet_kwh[h],
                    plan.curtail_kwh[h],
                );
            }
        }
        PlanFlows::Island { classes } => {
            let mut header = format!("{:>4} {:>8} {:>10} {:>8}", "hour", "charge", "discharge", "soc");
            for class in classes {
                let _ = write!(header, " {:>10}", class.name);
            }
            let _ = write!(header, " {:>8}", "curtail");
            let _ = writeln!(out, "{header}");
            for h in 0..plan.horizon() {
                let _ = write!(
                    out,
                    "{h:>4} {:>8.2} {:>10.2} {:>8.2}",
                    plan.charge_kwh[h], plan.discharge_kwh[h], plan.soc_kwh[h],
                );
                for class in classes {
                    let _ = write!(out, " {:>10.2}", class.served_kwh[h]);
                }
                let _ = writeln!(out, " {:>8.2}", plan.curtail_kwh[h]);
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Totals: charge {:.2} kWh, discharge {:.2} kWh, curtail {:.2} kWh",
        summary.total_charge_kwh, summary.total_discharge_kwh, summary.total_curtail_kwh
    );
    match &summary.flows {
        SummaryFlows::Grid {
            total_import_kwh,
            total_export_kwh,
            total_unmet_kwh,
        } => {
            let _ = writeln!(
                out,
                "Grid: import {total_import_kwh:.2} kWh, export {total_export_kwh:.2} kWh, \
                 unmet {total_unmet_kwh:.2} kWh"
            );
        }
        SummaryFlows::Island { classes } => {
            for class in classes {
                let _ = writeln!(
                    out,
                    "{}: served {:.2} kWh, unmet {:.2} kWh ({:.1}% unmet)",
                    class.name,
                    class.total_served_kwh,
                    class.total_unmet_kwh,
                    class.unmet_fraction * 100.0,
                );
            }
        }
    }
    out
}

/// Full result as pretty JSON, statuses included.
pub fn render_json(result: &DispatchResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DispatchResult, SolveStatus};

    #[test]
    fn unsolved_result_renders_status_only() {
        let table = render_table(&DispatchResult::unsolved(SolveStatus::Infeasible));
        assert!(table.contains("Status: Infeasible"));
        assert!(table.contains("No plan available."));
    }

    #[test]
    fn json_round_trips_the_status() {
        let json = render_json(&DispatchResult::unsolved(SolveStatus::NotSolved)).unwrap();
        let parsed: DispatchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, SolveStatus::NotSolved);
    }
}
