use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Output of the external forecast collaborator, one series per source
/// (solar, wind, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationForecast {
    pub date: NaiveDate,
    pub granularity: String,
    #[serde(alias = "forecast_series_kWh", alias = "forecast_series")]
    pub forecast_series_kwh: Vec<f64>,
    #[serde(default)]
    pub total_generation_kwh: f64,
}

impl GenerationForecast {
    pub fn horizon(&self) -> usize {
        self.forecast_series_kwh.len()
    }
}

/// Combine independently produced generation series (e.g. solar + wind) by
/// element-wise sum.
///
/// All series must be non-empty and of equal length; anything else is a
/// validation error. Substituting a default series on mismatch is a caller
/// policy, never done here.
pub fn combine_generation(series: &[Vec<f64>]) -> Result<Vec<f64>, DispatchError> {
    let first = series.first().ok_or_else(|| {
        DispatchError::validation("forecast_series_kwh", "no generation series supplied")
    })?;
    if first.is_empty() {
        return Err(DispatchError::validation(
            "forecast_series_kwh",
            "generation series is empty",
        ));
    }
    for (i, s) in series.iter().enumerate() {
        if s.len() != first.len() {
            return Err(DispatchError::validation(
                "forecast_series_kwh",
                format!(
                    "series {i} has length {} but series 0 has length {}",
                    s.len(),
                    first.len()
                ),
            ));
        }
    }

    let mut combined = vec![0.0; first.len()];
    for s in series {
        for (total, value) in combined.iter_mut().zip(s) {
            *total += value;
        }
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solar_plus_wind_sums_elementwise() {
        let solar = vec![1.0, 2.0, 3.0];
        let wind = vec![0.5, 0.0, 1.5];
        let combined = combine_generation(&[solar, wind]).unwrap();
        assert_eq!(combined, vec![1.5, 2.0, 4.5]);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = combine_generation(&[vec![1.0; 24], vec![1.0; 23]]).unwrap_err();
        assert!(err.to_string().contains("length 23"));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(combine_generation(&[]).is_err());
        assert!(combine_generation(&[vec![]]).is_err());
    }

    #[test]
    fn forecast_json_accepts_collaborator_casing() {
        let json = r#"{
            "date": "2026-03-14",
            "granularity": "hourly",
            "forecast_series_kwh": [0.0, 1.2, 3.4],
            "total_generation_kwh": 4.6
        }"#;
        let forecast: GenerationForecast = serde_json::from_str(json).unwrap();
        assert_eq!(forecast.horizon(), 3);
        assert_eq!(forecast.granularity, "hourly");
    }
}
