//! Input configuration loading.
//!
//! One JSON document per run, optionally overridden from the environment
//! (`DISPATCH__` prefix, `__` as separator). Key casings produced by older
//! tooling (`forecast_series_kWh`, `capacity_kWh`, ...) are accepted.

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Json};
use figment::Figment;
use serde::Deserialize;

use crate::dispatch::{DispatchInput, DispatchMode, DispatchPolicy, PenaltyWeights};
use crate::domain::{
    default_load_classes, BatteryConfig, EfficiencySpec, GridConfig, LoadClass,
};
use crate::error::DispatchError;

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    #[serde(
        default,
        alias = "forecast_series_kWh",
        alias = "forecast_series"
    )]
    pub forecast_series_kwh: Option<Vec<f64>>,

    #[serde(default, alias = "demand_series_kWh")]
    pub demand_series_kwh: Option<Vec<f64>>,

    #[serde(default)]
    pub battery: BatterySection,

    #[serde(default)]
    pub grid: Option<GridSection>,

    /// Load classes for islanded mode, highest priority first.
    #[serde(default)]
    pub loads: Option<Vec<LoadSection>>,

    #[serde(default)]
    pub params: ParamsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatterySection {
    #[serde(alias = "capacity_kWh")]
    pub capacity_kwh: f64,
    #[serde(alias = "soc0_kWh")]
    pub soc0_kwh: f64,
    #[serde(alias = "max_charge_rate_kW")]
    pub max_charge_rate_kw: f64,
    #[serde(alias = "max_discharge_rate_kW")]
    pub max_discharge_rate_kw: f64,
    #[serde(default)]
    pub round_trip_efficiency: Option<f64>,
}

impl Default for BatterySection {
    fn default() -> Self {
        Self {
            capacity_kwh: 20.0,
            soc0_kwh: 10.0,
            max_charge_rate_kw: 5.0,
            max_discharge_rate_kw: 5.0,
            round_trip_efficiency: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSection {
    #[serde(alias = "price_buy_per_kWh")]
    pub price_buy_per_kwh: f64,
    #[serde(alias = "price_sell_per_kWh")]
    pub price_sell_per_kwh: f64,
    #[serde(alias = "import_limit_kW")]
    pub import_limit_kw: f64,
    #[serde(alias = "export_limit_kW")]
    pub export_limit_kw: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadSection {
    pub name: String,
    #[serde(alias = "demand_kWh")]
    pub demand_kwh: Vec<f64>,
    pub unmet_penalty_weight: f64,
}

/// Penalty/efficiency overrides; anything absent keeps its mode default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamsSection {
    #[serde(default)]
    pub lambda_unmet: Option<f64>,
    #[serde(default)]
    pub mu_curtail: Option<f64>,
    #[serde(default)]
    pub cycle_penalty: Option<f64>,
    #[serde(default)]
    pub eta_charge: Option<f64>,
    #[serde(default)]
    pub eta_discharge: Option<f64>,
}

impl InputConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let figment = Figment::new()
            .merge(Json::file(path))
            .merge(Env::prefixed("DISPATCH__").split("__"));
        figment
            .extract()
            .with_context(|| format!("failed to load input config from {}", path.display()))
    }

    /// Pick the mode when the caller did not: cost mode needs both a grid
    /// section and a demand series, otherwise the run is islanded.
    pub fn inferred_mode(&self) -> DispatchMode {
        if self.grid.is_some() && self.demand_series_kwh.is_some() {
            DispatchMode::Cost
        } else {
            DispatchMode::Islanded
        }
    }

    /// Assemble the solve input for `mode`, with `generation` either taken
    /// from forecast collaborator files or from the config's own series.
    pub fn into_input(
        self,
        mode: DispatchMode,
        generation: Option<Vec<f64>>,
    ) -> Result<DispatchInput, DispatchError> {
        let generation_kwh = generation
            .or(self.forecast_series_kwh)
            .ok_or_else(|| {
                DispatchError::validation(
                    "forecast_series_kwh",
                    "no generation series: supply forecast files or forecast_series_kwh",
                )
            })?;
        let horizon = generation_kwh.len();

        let battery = self.battery.resolve(&self.params);
        let params = &self.params;

        let (policy, mut weights) = match mode {
            DispatchMode::Cost => {
                let grid = self.grid.ok_or_else(|| {
                    DispatchError::validation("grid", "cost mode requires a grid section")
                })?;
                let demand_kwh = self.demand_series_kwh.ok_or_else(|| {
                    DispatchError::validation(
                        "demand_series_kwh",
                        "cost mode requires a demand series",
                    )
                })?;
                (
                    DispatchPolicy::Cost {
                        grid: GridConfig {
                            price_buy_per_kwh: grid.price_buy_per_kwh,
                            price_sell_per_kwh: grid.price_sell_per_kwh,
                            import_limit_kwh: grid.import_limit_kw,
                            export_limit_kwh: grid.export_limit_kw,
                        },
                        demand_kwh,
                    },
                    PenaltyWeights::default(),
                )
            }
            DispatchMode::Islanded => {
                let classes: Vec<LoadClass> = match self.loads {
                    Some(sections) => sections
                        .into_iter()
                        .map(|s| LoadClass::new(s.name, s.demand_kwh, s.unmet_penalty_weight))
                        .collect(),
                    None => default_load_classes(horizon),
                };
                (
                    DispatchPolicy::Islanded { classes },
                    PenaltyWeights::islanded(),
                )
            }
        };

        if let Some(lambda) = params.lambda_unmet {
            weights.unmet = lambda;
        }
        if let Some(mu) = params.mu_curtail {
            weights.curtail = mu;
        }
        if let Some(cycle) = params.cycle_penalty {
            weights.cycle = cycle;
        }

        Ok(DispatchInput {
            generation_kwh,
            battery,
            policy,
            weights,
        })
    }
}

impl BatterySection {
    fn resolve(&self, params: &ParamsSection) -> BatteryConfig {
        // Explicit per-leg efficiencies in params win over round-trip,
        // each leg independently; a missing leg falls back to the even
        // round-trip split.
        let round_trip = self.round_trip_efficiency.unwrap_or(0.95);
        let efficiency = match (params.eta_charge, params.eta_discharge) {
            (None, None) => EfficiencySpec::RoundTrip {
                round_trip_efficiency: round_trip,
            },
            (eta_charge, eta_discharge) => EfficiencySpec::PerLeg {
                eta_charge: eta_charge.unwrap_or_else(|| round_trip.sqrt()),
                eta_discharge: eta_discharge.unwrap_or_else(|| round_trip.sqrt()),
            },
        };
        BatteryConfig {
            capacity_kwh: self.capacity_kwh,
            soc0_kwh: self.soc0_kwh,
            max_charge_rate_kwh: self.max_charge_rate_kw,
            max_discharge_rate_kwh: self.max_discharge_rate_kw,
            efficiency,
        }
    }
}
