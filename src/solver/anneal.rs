//! Experimental quantum-inspired backend.
//!
//! Encodes the per-hour battery action as a small fixed-width one-hot
//! discretization (plus a 2-bit export word in cost mode), builds a QUBO
//! from it and searches it with seeded simulated annealing. The decoding
//! back to a dispatch plan is lossy and approximate by design: the battery
//! schedule comes from the annealed bitstring, everything else is settled
//! greedily so that every hard invariant (balance, SOC recurrence, bounds)
//! holds exactly even though the objective is not the true optimum.
//!
//! The exact backend is the reference for dispatch semantics; this one is
//! kept isolated behind the same adapter interface.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::dispatch::program::{Assignment, DispatchProgram, LayoutFlows, ProgramLayout};
use crate::error::DispatchError;
use crate::solver::{SolverBackend, SolverOutcome};

#[derive(Debug, Clone, Copy)]
pub struct AnnealOptions {
    /// Action levels per side: actions are `{-levels ..= +levels} * unit_kwh`.
    pub levels: i64,
    /// Energy quantum of one discretization step (kWh).
    pub unit_kwh: f64,
    /// Full sweeps over all bits.
    pub sweeps: usize,
    pub initial_temperature: f64,
    /// Geometric cooling factor applied per sweep.
    pub cooling: f64,
    pub seed: u64,
    /// Squared balance-mismatch weight.
    pub balance_weight: f64,
    /// One-hot (exactly one action level) penalty.
    pub onehot_weight: f64,
    /// Soft keep-SOC-near-midpoint weight.
    pub soc_weight: f64,
    /// Action-magnitude weight, discourages large swings.
    pub move_weight: f64,
}

impl Default for AnnealOptions {
    fn default() -> Self {
        Self {
            levels: 3,
            unit_kwh: 1.0,
            sweeps: 800,
            initial_temperature: 5.0,
            cooling: 0.995,
            seed: 0x5eed,
            balance_weight: 10.0,
            onehot_weight: 5.0,
            soc_weight: 0.5,
            move_weight: 0.2,
        }
    }
}

/// QUBO over binary variables: `E(x) = c + sum l_i x_i + sum q_ij x_i x_j`.
struct Qubo {
    linear: Vec<f64>,
    quadratic: HashMap<(usize, usize), f64>,
    constant: f64,
}

impl Qubo {
    fn new(num_bits: usize) -> Self {
        Self {
            linear: vec![0.0; num_bits],
            quadratic: HashMap::new(),
            constant: 0.0,
        }
    }

    fn add_linear(&mut self, i: usize, weight: f64) {
        self.linear[i] += weight;
    }

    fn add_pair(&mut self, i: usize, j: usize, weight: f64) {
        if i == j {
            // x^2 == x for binaries.
            self.linear[i] += weight;
        } else {
            let key = if i < j { (i, j) } else { (j, i) };
            *self.quadratic.entry(key).or_insert(0.0) += weight;
        }
    }

    /// Add `weight * (c + sum a_i x_i)^2` expanded over binaries.
    fn add_squared_affine(&mut self, weight: f64, constant: f64, terms: &[(usize, f64)]) {
        self.constant += weight * constant * constant;
        for &(i, a) in terms {
            self.add_linear(i, weight * (2.0 * constant * a + a * a));
        }
        for (n, &(i, a)) in terms.iter().enumerate() {
            for &(j, b) in &terms[n + 1..] {
                self.add_pair(i, j, 2.0 * weight * a * b);
            }
        }
    }

    fn neighbors(&self) -> Vec<Vec<(usize, f64)>> {
        let mut adjacency = vec![Vec::new(); self.linear.len()];
        for (&(i, j), &w) in &self.quadratic {
            adjacency[i].push((j, w));
            adjacency[j].push((i, w));
        }
        adjacency
    }

    fn energy(&self, state: &[bool]) -> f64 {
        let mut energy = self.constant;
        for (i, &on) in state.iter().enumerate() {
            if on {
                energy += self.linear[i];
            }
        }
        for (&(i, j), &w) in &self.quadratic {
            if state[i] && state[j] {
                energy += w;
            }
        }
        energy
    }
}

/// Approximate annealing solver. Deterministic for a fixed seed.
#[derive(Debug, Default)]
pub struct AnnealingSolver {
    pub options: AnnealOptions,
}

impl AnnealingSolver {
    pub fn new(options: AnnealOptions) -> Self {
        Self { options }
    }

    fn bits_per_hour(&self, layout: &ProgramLayout) -> usize {
        let action_bits = (2 * self.options.levels + 1) as usize;
        match layout.flows {
            LayoutFlows::Grid { .. } => action_bits + 2,
            LayoutFlows::Island { .. } => action_bits,
        }
    }

    fn build_qubo(&self, layout: &ProgramLayout) -> Qubo {
        let opts = &self.options;
        let levels = opts.levels;
        let unit = opts.unit_kwh;
        let stride = self.bits_per_hour(layout);
        let action_bits = (2 * levels + 1) as usize;
        let mut qubo = Qubo::new(layout.horizon * stride);

        let (demand, price_sell): (Vec<f64>, f64) = match &layout.flows {
            LayoutFlows::Grid {
                demand_kwh, grid, ..
            } => (demand_kwh.clone(), grid.price_sell_per_kwh),
            LayoutFlows::Island { classes, .. } => {
                let total = (0..layout.horizon)
                    .map(|h| classes.iter().map(|c| c.demand_kwh[h]).sum())
                    .collect();
                (total, 0.0)
            }
        };

        let soc_mid = layout.battery.capacity_kwh / 2.0;
        for h in 0..layout.horizon {
            let base = h * stride;
            let action: Vec<(usize, f64)> = (0..action_bits)
                .map(|j| (base + j, (j as i64 - levels) as f64 * unit))
                .collect();

            // Exactly one action level: (sum z - 1)^2.
            let ones: Vec<(usize, f64)> = action.iter().map(|&(i, _)| (i, 1.0)).collect();
            qubo.add_squared_affine(opts.onehot_weight, -1.0, &ones);

            // Balance mismatch (demand + sell + action - generation)^2.
            let mut mismatch = action.clone();
            if let LayoutFlows::Grid { .. } = layout.flows {
                mismatch.push((base + action_bits, unit));
                mismatch.push((base + action_bits + 1, 2.0 * unit));
            }
            qubo.add_squared_affine(
                opts.balance_weight,
                demand[h] - layout.generation_kwh[h],
                &mismatch,
            );

            // Action magnitude.
            qubo.add_squared_affine(opts.move_weight, 0.0, &action);

            // Soft SOC drift toward the midpoint (static linearization).
            let drift = 2.0 * opts.soc_weight * (layout.battery.soc0_kwh - soc_mid);
            for &(i, a) in &action {
                qubo.add_linear(i, drift * a);
            }

            // Export revenue.
            if let LayoutFlows::Grid { .. } = layout.flows {
                qubo.add_linear(base + action_bits, -price_sell * unit);
                qubo.add_linear(base + action_bits + 1, -2.0 * price_sell * unit);
            }
        }

        qubo
    }

    fn anneal(&self, qubo: &Qubo, layout: &ProgramLayout) -> Vec<bool> {
        let opts = &self.options;
        let num_bits = qubo.linear.len();
        let stride = self.bits_per_hour(layout);
        let mut rng = StdRng::seed_from_u64(opts.seed);

        // Start from the all-idle encoding (action level 0 each hour).
        let mut state = vec![false; num_bits];
        for h in 0..layout.horizon {
            state[h * stride + opts.levels as usize] = true;
        }

        let adjacency = qubo.neighbors();
        let mut energy = qubo.energy(&state);
        let mut best_state = state.clone();
        let mut best_energy = energy;
        let mut temperature = opts.initial_temperature;

        for _ in 0..opts.sweeps {
            for _ in 0..num_bits {
                let i = rng.gen_range(0..num_bits);
                let mut field = qubo.linear[i];
                for &(j, w) in &adjacency[i] {
                    if state[j] {
                        field += w;
                    }
                }
                let delta = if state[i] { -field } else { field };
                if delta <= 0.0 || rng.gen::<f64>() < (-delta / temperature.max(1e-12)).exp() {
                    state[i] = !state[i];
                    energy += delta;
                    if energy < best_energy {
                        best_energy = energy;
                        best_state.clone_from(&state);
                    }
                }
            }
            temperature *= opts.cooling;
        }

        debug!(best_energy, "annealing finished");
        best_state
    }

    /// Lossy decode: battery actions from the bitstring, everything else
    /// settled greedily so all hard constraints hold exactly.
    fn decode(&self, program: &DispatchProgram, state: &[bool]) -> Assignment {
        let layout = &program.layout;
        let opts = &self.options;
        let stride = self.bits_per_hour(layout);
        let action_bits = (2 * opts.levels + 1) as usize;
        let battery = &layout.battery;
        let denominator = battery.discharge_denominator();

        let mut assignment = Assignment::zeroed(program.num_vars());
        let mut soc = battery.soc0_kwh;

        for h in 0..layout.horizon {
            let base = h * stride;
            let level: i64 = (0..action_bits)
                .filter(|j| state[base + j])
                .map(|j| j as i64 - opts.levels)
                .sum::<i64>()
                .clamp(-opts.levels, opts.levels);
            let action = level as f64 * opts.unit_kwh;
            let generation = layout.generation_kwh[h];

            // Clamp to rate caps and SOC headroom so the recurrence holds.
            let (charge, discharge) = if action >= 0.0 {
                let headroom = (battery.capacity_kwh - soc).max(0.0);
                let charge = action
                    .min(battery.max_charge_rate_kwh)
                    .min(headroom / battery.eta_charge.max(crate::domain::MIN_EFFICIENCY));
                // Islanded charging can only come from generation.
                let charge = match layout.flows {
                    LayoutFlows::Island { .. } => charge.min(generation),
                    LayoutFlows::Grid { .. } => charge,
                };
                (charge, 0.0)
            } else {
                let discharge = (-action)
                    .min(battery.max_discharge_rate_kwh)
                    .min(soc * denominator);
                (0.0, discharge)
            };

            assignment.set(layout.charge[h], charge);
            assignment.set(layout.discharge[h], discharge);
            assignment.set(layout.soc[h], soc);
            soc = (soc + battery.eta_charge * charge - discharge / denominator)
                .clamp(0.0, battery.capacity_kwh);

            let available = generation + discharge - charge;
            match &layout.flows {
                LayoutFlows::Island {
                    classes,
                    served,
                    unmet,
                } => {
                    // Priority-ordered greedy serving; remainder is curtailed.
                    let mut remaining = available.max(0.0);
                    for (c, class) in classes.iter().enumerate() {
                        let take = remaining.min(class.demand_kwh[h]);
                        assignment.set(served[c][h], take);
                        assignment.set(unmet[c][h], class.demand_kwh[h] - take);
                        remaining -= take;
                    }
                    assignment.set(layout.curtail[h], remaining.max(0.0));
                }
                LayoutFlows::Grid {
                    grid,
                    demand_kwh,
                    import,
                    export,
                    unmet,
                } => {
                    let sell_request = opts.unit_kwh
                        * (state[base + action_bits] as u8 as f64
                            + 2.0 * state[base + action_bits + 1] as u8 as f64);
                    let net = available - demand_kwh[h];
                    if net >= 0.0 {
                        let sold = net.min(sell_request).min(grid.export_limit_kwh);
                        assignment.set(export[h], sold);
                        assignment.set(layout.curtail[h], net - sold);
                    } else {
                        let deficit = -net;
                        let imported = deficit.min(grid.import_limit_kwh);
                        assignment.set(import[h], imported);
                        assignment.set(unmet[h], deficit - imported);
                    }
                }
            }
        }

        assignment
    }
}

impl SolverBackend for AnnealingSolver {
    fn name(&self) -> &'static str {
        "annealing"
    }

    fn solve(&self, program: &DispatchProgram) -> Result<SolverOutcome, DispatchError> {
        if self.options.levels < 1 {
            return Err(DispatchError::validation(
                "solver.annealing.levels",
                format!("must be >= 1, got {}", self.options.levels),
            ));
        }
        if !(self.options.unit_kwh > 0.0) {
            return Err(DispatchError::validation(
                "solver.annealing.unit_kwh",
                format!("must be > 0, got {}", self.options.unit_kwh),
            ));
        }

        let qubo = self.build_qubo(&program.layout);
        let state = self.anneal(&qubo, &program.layout);
        let assignment = self.decode(program, &state);
        let objective = program.objective_value(&assignment);
        Ok(SolverOutcome::optimal(assignment, Some(objective)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::builder::build_program;
    use crate::dispatch::policy::{DispatchInput, DispatchPolicy, PenaltyWeights};
    use crate::domain::{default_load_classes, BatteryConfig, GridConfig};

    fn islanded_input(generation: Vec<f64>, soc0: f64) -> DispatchInput {
        DispatchInput {
            battery: BatteryConfig {
                soc0_kwh: soc0,
                ..BatteryConfig::default()
            },
            policy: DispatchPolicy::Islanded {
                classes: default_load_classes(generation.len()),
            },
            generation_kwh: generation,
            weights: PenaltyWeights::islanded(),
        }
    }

    #[test]
    fn decoded_plans_satisfy_all_hard_constraints() {
        let program = build_program(&islanded_input(vec![3.5; 24], 10.0)).unwrap();
        let outcome = AnnealingSolver::default().solve(&program).unwrap();
        let assignment = outcome.assignment.unwrap();
        assert!(program.max_violation(&assignment) < 1e-6);
    }

    #[test]
    fn cost_mode_decode_satisfies_all_hard_constraints() {
        let program = build_program(&DispatchInput {
            generation_kwh: vec![6.0; 24],
            battery: BatteryConfig::default(),
            policy: DispatchPolicy::Cost {
                grid: GridConfig::default(),
                demand_kwh: vec![4.0; 24],
            },
            weights: PenaltyWeights::default(),
        })
        .unwrap();
        let outcome = AnnealingSolver::default().solve(&program).unwrap();
        let assignment = outcome.assignment.unwrap();
        assert!(program.max_violation(&assignment) < 1e-6);
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let program = build_program(&islanded_input(vec![2.0; 24], 5.0)).unwrap();
        let solver = AnnealingSolver::default();
        let a = solver.solve(&program).unwrap();
        let b = solver.solve(&program).unwrap();
        assert_eq!(a.objective, b.objective);
        assert_eq!(a.assignment.unwrap().0, b.assignment.unwrap().0);
    }

    #[test]
    fn zero_generation_empty_battery_sheds_everything() {
        let program = build_program(&islanded_input(vec![0.0; 24], 0.0)).unwrap();
        let outcome = AnnealingSolver::default().solve(&program).unwrap();
        let assignment = outcome.assignment.unwrap();
        let layout = &program.layout;
        for h in 0..24 {
            assert_eq!(assignment.value(layout.curtail[h]), 0.0);
            assert_eq!(assignment.value(layout.charge[h]), 0.0);
            assert_eq!(assignment.value(layout.discharge[h]), 0.0);
        }
        let LayoutFlows::Island { classes, unmet, .. } = &layout.flows else {
            panic!("expected island layout");
        };
        for (c, class) in classes.iter().enumerate() {
            for h in 0..24 {
                assert_eq!(assignment.value(unmet[c][h]), class.demand_kwh[h]);
            }
        }
    }
}
