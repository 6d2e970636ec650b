//! Dispatch model builder: validated inputs -> abstract linear program.
//!
//! Both modes share one battery block (SOC pin, SOC recurrence, rate and
//! capacity bounds); the policy variant only decides which flow variables,
//! balance form and objective terms are emitted.

use tracing::debug;

use crate::dispatch::policy::{DispatchInput, DispatchPolicy};
use crate::dispatch::program::{
    DispatchProgram, LayoutFlows, LinearConstraint, LinearExpr, ProgramLayout, Relation, VarId,
    Variables,
};
use crate::domain::{BatteryParams, GridConfig, LoadClass};
use crate::error::DispatchError;

/// Validate `input` and emit the linear program for its policy.
pub fn build_program(input: &DispatchInput) -> Result<DispatchProgram, DispatchError> {
    let horizon = input.generation_kwh.len();
    if horizon == 0 {
        return Err(DispatchError::validation(
            "forecast_series_kwh",
            "generation series is empty",
        ));
    }
    check_series("forecast_series_kwh", &input.generation_kwh, horizon)?;
    check_weight("params.mu_curtail", input.weights.curtail)?;
    check_weight("params.cycle_penalty", input.weights.cycle)?;

    let battery = input.battery.resolve()?;

    let program = match &input.policy {
        DispatchPolicy::Cost { grid, demand_kwh } => {
            check_weight("params.lambda_unmet", input.weights.unmet)?;
            grid.validate()?;
            if demand_kwh.len() != horizon {
                return Err(DispatchError::validation(
                    "demand_series_kwh",
                    format!("expected length {horizon}, got {}", demand_kwh.len()),
                ));
            }
            check_series("demand_series_kwh", demand_kwh, horizon)?;
            build_cost_program(input, battery, grid, demand_kwh)
        }
        DispatchPolicy::Islanded { classes } => {
            if classes.is_empty() {
                return Err(DispatchError::validation(
                    "loads",
                    "islanded mode needs at least one load class",
                ));
            }
            for class in classes {
                if class.demand_kwh.len() != horizon {
                    return Err(DispatchError::validation(
                        "loads.demand_kwh",
                        format!(
                            "class `{}` expected length {horizon}, got {}",
                            class.name,
                            class.demand_kwh.len()
                        ),
                    ));
                }
                check_series("loads.demand_kwh", &class.demand_kwh, horizon)?;
                if !(class.unmet_penalty_weight > 0.0) {
                    return Err(DispatchError::validation(
                        "loads.unmet_penalty_weight",
                        format!(
                            "class `{}` must have weight > 0, got {}",
                            class.name, class.unmet_penalty_weight
                        ),
                    ));
                }
            }
            build_islanded_program(input, battery, classes)
        }
    };

    debug!(
        mode = %input.policy.mode(),
        horizon,
        vars = program.num_vars(),
        constraints = program.constraints.len(),
        "dispatch program built"
    );
    Ok(program)
}

fn check_series(field: &'static str, series: &[f64], horizon: usize) -> Result<(), DispatchError> {
    debug_assert_eq!(series.len(), horizon);
    for (h, value) in series.iter().enumerate() {
        if !(*value >= 0.0) {
            return Err(DispatchError::validation(
                field,
                format!("step {h} must be a non-negative number, got {value}"),
            ));
        }
    }
    Ok(())
}

fn check_weight(field: &'static str, value: f64) -> Result<(), DispatchError> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(DispatchError::validation(
            field,
            format!("must be a non-negative number, got {value}"),
        ))
    }
}

/// Shared battery variables and constraints.
struct BatteryBlock {
    charge: Vec<VarId>,
    discharge: Vec<VarId>,
    soc: Vec<VarId>,
    curtail: Vec<VarId>,
}

fn battery_block(
    vars: &mut Variables,
    constraints: &mut Vec<LinearConstraint>,
    battery: &BatteryParams,
    horizon: usize,
) -> BatteryBlock {
    let charge = vars.add_series("charge", horizon, 0.0, Some(battery.max_charge_rate_kwh));
    let discharge = vars.add_series(
        "discharge",
        horizon,
        0.0,
        Some(battery.max_discharge_rate_kwh),
    );
    let soc = vars.add_series("soc", horizon, 0.0, Some(battery.capacity_kwh));
    let curtail = vars.add_series("curtail", horizon, 0.0, None);

    // Pin the initial state of charge.
    let mut init = LinearExpr::new();
    init.add_term(soc[0], 1.0);
    constraints.push(LinearConstraint {
        label: "soc_init".into(),
        expr: init,
        relation: Relation::Eq,
        rhs: battery.soc0_kwh,
    });

    // soc[h+1] = soc[h] + eta_c * charge[h] - discharge[h] / eta_d
    let denominator = battery.discharge_denominator();
    for h in 0..horizon.saturating_sub(1) {
        let mut link = LinearExpr::new();
        link.add_term(soc[h + 1], 1.0)
            .add_term(soc[h], -1.0)
            .add_term(charge[h], -battery.eta_charge)
            .add_term(discharge[h], 1.0 / denominator);
        constraints.push(LinearConstraint {
            label: format!("soc_link[{h}]"),
            expr: link,
            relation: Relation::Eq,
            rhs: 0.0,
        });
    }

    BatteryBlock {
        charge,
        discharge,
        soc,
        curtail,
    }
}

fn cycling_and_curtail_terms(objective: &mut LinearExpr, input: &DispatchInput, block: &BatteryBlock) {
    for h in 0..input.horizon() {
        objective.add_term(block.charge[h], input.weights.cycle);
        objective.add_term(block.discharge[h], input.weights.cycle);
        objective.add_term(block.curtail[h], input.weights.curtail);
    }
}

fn build_cost_program(
    input: &DispatchInput,
    battery: BatteryParams,
    grid: &GridConfig,
    demand_kwh: &[f64],
) -> DispatchProgram {
    let horizon = input.horizon();
    let mut vars = Variables::default();
    let mut constraints = Vec::new();

    let block = battery_block(&mut vars, &mut constraints, &battery, horizon);
    let import = vars.add_series("grid_import", horizon, 0.0, Some(grid.import_limit_kwh));
    let export = vars.add_series("grid_export", horizon, 0.0, Some(grid.export_limit_kwh));
    let unmet = vars.add_series("unmet", horizon, 0.0, None);

    // gen + import + discharge == demand + charge + export + curtail - unmet
    for h in 0..horizon {
        let mut balance = LinearExpr::new();
        balance
            .add_term(import[h], 1.0)
            .add_term(block.discharge[h], 1.0)
            .add_term(block.charge[h], -1.0)
            .add_term(export[h], -1.0)
            .add_term(block.curtail[h], -1.0)
            .add_term(unmet[h], 1.0);
        constraints.push(LinearConstraint {
            label: format!("balance[{h}]"),
            expr: balance,
            relation: Relation::Eq,
            rhs: demand_kwh[h] - input.generation_kwh[h],
        });
    }

    let mut objective = LinearExpr::new();
    for h in 0..horizon {
        objective.add_term(import[h], grid.price_buy_per_kwh);
        objective.add_term(export[h], -grid.price_sell_per_kwh);
        objective.add_term(unmet[h], input.weights.unmet);
    }
    cycling_and_curtail_terms(&mut objective, input, &block);

    let layout = ProgramLayout {
        horizon,
        battery,
        generation_kwh: input.generation_kwh.clone(),
        weights: input.weights,
        charge: block.charge,
        discharge: block.discharge,
        soc: block.soc,
        curtail: block.curtail,
        flows: LayoutFlows::Grid {
            grid: *grid,
            demand_kwh: demand_kwh.to_vec(),
            import,
            export,
            unmet,
        },
    };

    DispatchProgram {
        vars: vars.into_defs(),
        constraints,
        objective,
        layout,
    }
}

fn build_islanded_program(
    input: &DispatchInput,
    battery: BatteryParams,
    classes: &[LoadClass],
) -> DispatchProgram {
    let horizon = input.horizon();
    let mut vars = Variables::default();
    let mut constraints = Vec::new();

    let block = battery_block(&mut vars, &mut constraints, &battery, horizon);

    let mut served = Vec::with_capacity(classes.len());
    let mut unmet = Vec::with_capacity(classes.len());
    for class in classes {
        let served_class: Vec<VarId> = (0..horizon)
            .map(|h| {
                vars.add(
                    format!("served[{}][{h}]", class.name),
                    0.0,
                    Some(class.demand_kwh[h]),
                )
            })
            .collect();
        let unmet_class: Vec<VarId> = (0..horizon)
            .map(|h| {
                vars.add(
                    format!("unmet[{}][{h}]", class.name),
                    0.0,
                    Some(class.demand_kwh[h]),
                )
            })
            .collect();
        served.push(served_class);
        unmet.push(unmet_class);
    }

    // gen + discharge == charge + sum(served) + curtail
    for h in 0..horizon {
        let mut balance = LinearExpr::new();
        balance
            .add_term(block.discharge[h], 1.0)
            .add_term(block.charge[h], -1.0)
            .add_term(block.curtail[h], -1.0);
        for served_class in &served {
            balance.add_term(served_class[h], -1.0);
        }
        constraints.push(LinearConstraint {
            label: format!("balance[{h}]"),
            expr: balance,
            relation: Relation::Eq,
            rhs: -input.generation_kwh[h],
        });
    }

    // served + unmet == demand, per class and hour
    for (c, class) in classes.iter().enumerate() {
        for h in 0..horizon {
            let mut coverage = LinearExpr::new();
            coverage.add_term(served[c][h], 1.0).add_term(unmet[c][h], 1.0);
            constraints.push(LinearConstraint {
                label: format!("coverage[{}][{h}]", class.name),
                expr: coverage,
                relation: Relation::Eq,
                rhs: class.demand_kwh[h],
            });
        }
    }

    let mut objective = LinearExpr::new();
    for (c, class) in classes.iter().enumerate() {
        for h in 0..horizon {
            objective.add_term(unmet[c][h], class.unmet_penalty_weight);
        }
    }
    cycling_and_curtail_terms(&mut objective, input, &block);

    let layout = ProgramLayout {
        horizon,
        battery,
        generation_kwh: input.generation_kwh.clone(),
        weights: input.weights,
        charge: block.charge,
        discharge: block.discharge,
        soc: block.soc,
        curtail: block.curtail,
        flows: LayoutFlows::Island {
            classes: classes.to_vec(),
            served,
            unmet,
        },
    };

    DispatchProgram {
        vars: vars.into_defs(),
        constraints,
        objective,
        layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::policy::PenaltyWeights;
    use crate::dispatch::program::Assignment;
    use crate::domain::{BatteryConfig, GridConfig};
    use rstest::rstest;

    fn cost_input(horizon: usize) -> DispatchInput {
        DispatchInput {
            generation_kwh: vec![5.0; horizon],
            battery: BatteryConfig::default(),
            policy: DispatchPolicy::Cost {
                grid: GridConfig::default(),
                demand_kwh: vec![4.0; horizon],
            },
            weights: PenaltyWeights::default(),
        }
    }

    fn islanded_input(horizon: usize) -> DispatchInput {
        DispatchInput {
            generation_kwh: vec![3.0; horizon],
            battery: BatteryConfig::default(),
            policy: DispatchPolicy::Islanded {
                classes: crate::domain::default_load_classes(horizon),
            },
            weights: PenaltyWeights::islanded(),
        }
    }

    #[test]
    fn cost_program_has_expected_shape() {
        let program = build_program(&cost_input(24)).unwrap();
        // 7 families of 24 variables each.
        assert_eq!(program.num_vars(), 7 * 24);
        // soc_init + 23 soc links + 24 balances.
        assert_eq!(program.constraints.len(), 1 + 23 + 24);
    }

    #[test]
    fn islanded_program_has_expected_shape() {
        let program = build_program(&islanded_input(24)).unwrap();
        // charge, discharge, soc, curtail + (served + unmet) * 3 classes.
        assert_eq!(program.num_vars(), 4 * 24 + 2 * 3 * 24);
        // soc_init + 23 links + 24 balances + 3 * 24 coverage rows.
        assert_eq!(program.constraints.len(), 1 + 23 + 24 + 72);
    }

    #[test]
    fn hand_built_cost_assignment_balances() {
        // gen 5, demand 4: serve demand from generation, export the rest.
        let input = cost_input(2);
        let program = build_program(&input).unwrap();
        let LayoutFlows::Grid { ref export, .. } = program.layout.flows else {
            panic!("expected grid layout");
        };
        let mut assignment = Assignment::zeroed(program.num_vars());
        for h in 0..2 {
            assignment.set(program.layout.soc[h], 10.0);
            assignment.set(export[h], 1.0);
        }
        assert!(program.max_violation(&assignment) < 1e-9);
    }

    #[test]
    fn soc_recurrence_uses_efficiencies() {
        let input = islanded_input(3);
        let program = build_program(&input).unwrap();
        let battery = program.layout.battery;
        let link = program
            .constraints
            .iter()
            .find(|c| c.label == "soc_link[0]")
            .unwrap();
        let coefficient_of = |var: VarId| {
            link.expr
                .terms
                .iter()
                .find(|(v, _)| *v == var)
                .map(|(_, c)| *c)
                .unwrap()
        };
        assert!((coefficient_of(program.layout.charge[0]) + battery.eta_charge).abs() < 1e-12);
        assert!(
            (coefficient_of(program.layout.discharge[0]) - 1.0 / battery.eta_discharge).abs()
                < 1e-9
        );
    }

    #[rstest]
    #[case::empty_generation(
        DispatchInput { generation_kwh: vec![], ..cost_input(24) },
        "forecast_series_kwh"
    )]
    #[case::negative_generation(
        DispatchInput { generation_kwh: vec![-1.0; 24], ..cost_input(24) },
        "forecast_series_kwh"
    )]
    #[case::short_demand(
        DispatchInput {
            policy: DispatchPolicy::Cost {
                grid: GridConfig::default(),
                demand_kwh: vec![4.0; 23],
            },
            ..cost_input(24)
        },
        "demand_series_kwh"
    )]
    #[case::no_classes(
        DispatchInput {
            policy: DispatchPolicy::Islanded { classes: vec![] },
            ..islanded_input(24)
        },
        "loads"
    )]
    #[case::bad_weight(
        DispatchInput {
            policy: DispatchPolicy::Islanded {
                classes: vec![crate::domain::LoadClass::new("clinic", vec![1.0; 24], 0.0)],
            },
            ..islanded_input(24)
        },
        "loads.unmet_penalty_weight"
    )]
    fn validation_names_the_offending_field(
        #[case] input: DispatchInput,
        #[case] field: &str,
    ) {
        let err = build_program(&input).unwrap_err();
        assert!(
            err.to_string().contains(field),
            "error `{err}` should mention `{field}`"
        );
    }
}
