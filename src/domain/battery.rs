use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Smallest efficiency denominator allowed in the SOC recurrence.
/// Guards `discharge / eta_d` against near-zero blow-up.
pub const MIN_EFFICIENCY: f64 = 1e-6;

/// How charge/discharge efficiency is specified.
///
/// Either a single round-trip figure (split evenly across both legs,
/// `eta = sqrt(round_trip)`) or explicit per-leg values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum EfficiencySpec {
    RoundTrip { round_trip_efficiency: f64 },
    PerLeg { eta_charge: f64, eta_discharge: f64 },
}

impl Default for EfficiencySpec {
    fn default() -> Self {
        Self::RoundTrip {
            round_trip_efficiency: 0.95,
        }
    }
}

/// Battery configuration as supplied by the caller (kWh per hourly step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryConfig {
    pub capacity_kwh: f64,
    /// Initial state of charge. Clamped into `[0, capacity]` when resolved.
    pub soc0_kwh: f64,
    pub max_charge_rate_kwh: f64,
    pub max_discharge_rate_kwh: f64,
    #[serde(default)]
    pub efficiency: EfficiencySpec,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 20.0,
            soc0_kwh: 10.0,
            max_charge_rate_kwh: 5.0,
            max_discharge_rate_kwh: 5.0,
            efficiency: EfficiencySpec::default(),
        }
    }
}

/// Validated battery parameters used by the model builder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatteryParams {
    pub capacity_kwh: f64,
    pub soc0_kwh: f64,
    pub max_charge_rate_kwh: f64,
    pub max_discharge_rate_kwh: f64,
    pub eta_charge: f64,
    pub eta_discharge: f64,
}

impl BatteryConfig {
    /// Validate and resolve into [`BatteryParams`].
    ///
    /// `soc0_kwh` is clamped rather than rejected; everything else out of
    /// range is a validation error naming the field.
    pub fn resolve(&self) -> Result<BatteryParams, DispatchError> {
        if !(self.capacity_kwh > 0.0) {
            return Err(DispatchError::validation(
                "battery.capacity_kwh",
                format!("must be > 0, got {}", self.capacity_kwh),
            ));
        }
        if !(self.max_charge_rate_kwh >= 0.0) {
            return Err(DispatchError::validation(
                "battery.max_charge_rate_kwh",
                format!("must be >= 0, got {}", self.max_charge_rate_kwh),
            ));
        }
        if !(self.max_discharge_rate_kwh >= 0.0) {
            return Err(DispatchError::validation(
                "battery.max_discharge_rate_kwh",
                format!("must be >= 0, got {}", self.max_discharge_rate_kwh),
            ));
        }
        if !self.soc0_kwh.is_finite() {
            return Err(DispatchError::validation(
                "battery.soc0_kwh",
                "must be a finite number".to_string(),
            ));
        }

        let (eta_charge, eta_discharge) = match self.efficiency {
            EfficiencySpec::RoundTrip {
                round_trip_efficiency,
            } => {
                check_efficiency("battery.round_trip_efficiency", round_trip_efficiency)?;
                let eta = round_trip_efficiency.sqrt();
                (eta, eta)
            }
            EfficiencySpec::PerLeg {
                eta_charge,
                eta_discharge,
            } => {
                check_efficiency("battery.eta_charge", eta_charge)?;
                check_efficiency("battery.eta_discharge", eta_discharge)?;
                (eta_charge, eta_discharge)
            }
        };

        Ok(BatteryParams {
            capacity_kwh: self.capacity_kwh,
            soc0_kwh: self.soc0_kwh.clamp(0.0, self.capacity_kwh),
            max_charge_rate_kwh: self.max_charge_rate_kwh,
            max_discharge_rate_kwh: self.max_discharge_rate_kwh,
            eta_charge,
            eta_discharge,
        })
    }
}

fn check_efficiency(field: &'static str, value: f64) -> Result<(), DispatchError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(DispatchError::validation(
            field,
            format!("must be in (0, 1], got {value}"),
        ))
    }
}

impl BatteryParams {
    /// Discharge denominator with the near-zero guard applied.
    pub fn discharge_denominator(&self) -> f64 {
        self.eta_discharge.max(MIN_EFFICIENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_efficiency_splits_evenly() {
        let battery = BatteryConfig {
            efficiency: EfficiencySpec::RoundTrip {
                round_trip_efficiency: 0.81,
            },
            ..BatteryConfig::default()
        };
        let params = battery.resolve().unwrap();
        assert!((params.eta_charge - 0.9).abs() < 1e-12);
        assert!((params.eta_discharge - 0.9).abs() < 1e-12);
    }

    #[test]
    fn soc0_is_clamped_into_capacity() {
        let battery = BatteryConfig {
            capacity_kwh: 10.0,
            soc0_kwh: 25.0,
            ..BatteryConfig::default()
        };
        assert_eq!(battery.resolve().unwrap().soc0_kwh, 10.0);

        let battery = BatteryConfig {
            soc0_kwh: -3.0,
            ..BatteryConfig::default()
        };
        assert_eq!(battery.resolve().unwrap().soc0_kwh, 0.0);
    }

    #[test]
    fn non_positive_capacity_is_rejected() {
        let battery = BatteryConfig {
            capacity_kwh: 0.0,
            ..BatteryConfig::default()
        };
        let err = battery.resolve().unwrap_err();
        assert!(err.to_string().contains("battery.capacity_kwh"));
    }

    #[test]
    fn efficiency_out_of_range_is_rejected() {
        let battery = BatteryConfig {
            efficiency: EfficiencySpec::PerLeg {
                eta_charge: 1.2,
                eta_discharge: 0.9,
            },
            ..BatteryConfig::default()
        };
        let err = battery.resolve().unwrap_err();
        assert!(err.to_string().contains("battery.eta_charge"));
    }
}
