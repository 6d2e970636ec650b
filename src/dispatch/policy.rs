use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::domain::{BatteryConfig, GridConfig, LoadClass};

/// Which objective/constraint set the builder emits. Selected once per
/// solve; no partial mixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    Cost,
    Islanded,
}

/// Scalar penalty weights shared by both modes.
///
/// In cost mode `unmet` is the soft-constraint price (λ) that keeps the
/// balance satisfiable when demand physically cannot be served; in islanded
/// mode per-class weights take its place and `unmet` is unused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PenaltyWeights {
    pub unmet: f64,
    pub curtail: f64,
    pub cycle: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            unmet: 100.0,
            curtail: 2.0,
            cycle: 0.01,
        }
    }
}

impl PenaltyWeights {
    /// Islanded-mode defaults.
    pub fn islanded() -> Self {
        Self {
            unmet: 100.0,
            curtail: 1.0,
            cycle: 0.1,
        }
    }
}

/// Mode policy: tagged variants rather than trait objects so the builder
/// can switch on the variant while sharing one battery-constraint block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DispatchPolicy {
    /// Grid-tied, minimize monetary cost against an aggregate demand series.
    Cost {
        grid: GridConfig,
        demand_kwh: Vec<f64>,
    },
    /// No grid; shed load by descending-priority penalty weights.
    Islanded { classes: Vec<LoadClass> },
}

impl DispatchPolicy {
    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::Cost { .. } => DispatchMode::Cost,
            Self::Islanded { .. } => DispatchMode::Islanded,
        }
    }
}

/// Everything one solve call needs. Holds no state across invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchInput {
    pub generation_kwh: Vec<f64>,
    pub battery: BatteryConfig,
    pub policy: DispatchPolicy,
    pub weights: PenaltyWeights,
}

impl DispatchInput {
    pub fn horizon(&self) -> usize {
        self.generation_kwh.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn mode_round_trips_through_strings() {
        assert_eq!(DispatchMode::from_str("cost").unwrap(), DispatchMode::Cost);
        assert_eq!(
            DispatchMode::from_str("islanded").unwrap(),
            DispatchMode::Islanded
        );
        assert_eq!(DispatchMode::Islanded.to_string(), "islanded");
    }

    #[test]
    fn policy_reports_its_mode() {
        let policy = DispatchPolicy::Cost {
            grid: GridConfig::default(),
            demand_kwh: vec![4.0; 24],
        };
        assert_eq!(policy.mode(), DispatchMode::Cost);
    }
}
