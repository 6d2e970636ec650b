use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Grid connection parameters (cost mode only). All values per hourly step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridConfig {
    pub price_buy_per_kwh: f64,
    pub price_sell_per_kwh: f64,
    pub import_limit_kwh: f64,
    pub export_limit_kwh: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            price_buy_per_kwh: 6.0,
            price_sell_per_kwh: 3.0,
            import_limit_kwh: 10.0,
            export_limit_kwh: 5.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        for (field, value) in [
            ("grid.price_buy_per_kwh", self.price_buy_per_kwh),
            ("grid.price_sell_per_kwh", self.price_sell_per_kwh),
            ("grid.import_limit_kwh", self.import_limit_kwh),
            ("grid.export_limit_kwh", self.export_limit_kwh),
        ] {
            if !(value >= 0.0) {
                return Err(DispatchError::validation(
                    field,
                    format!("must be >= 0, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_limit_is_rejected() {
        let grid = GridConfig {
            export_limit_kwh: -1.0,
            ..GridConfig::default()
        };
        let err = grid.validate().unwrap_err();
        assert!(err.to_string().contains("grid.export_limit_kwh"));
    }

    #[test]
    fn nan_price_is_rejected() {
        let grid = GridConfig {
            price_buy_per_kwh: f64::NAN,
            ..GridConfig::default()
        };
        assert!(grid.validate().is_err());
    }
}
