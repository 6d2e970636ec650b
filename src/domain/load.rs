use serde::{Deserialize, Serialize};

/// One load class in islanded mode.
///
/// Classes are listed in descending priority; priority is expressed only
/// through `unmet_penalty_weight` ratios (soft priority), so weights should
/// be well separated (e.g. 1000 / 100 / 10) for the ordering to hold in
/// practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadClass {
    pub name: String,
    /// Demand per hourly step (kWh), length must match the horizon.
    pub demand_kwh: Vec<f64>,
    pub unmet_penalty_weight: f64,
}

impl LoadClass {
    pub fn new(name: impl Into<String>, demand_kwh: Vec<f64>, unmet_penalty_weight: f64) -> Self {
        Self {
            name: name.into(),
            demand_kwh,
            unmet_penalty_weight,
        }
    }

    pub fn total_demand_kwh(&self) -> f64 {
        self.demand_kwh.iter().sum()
    }
}

/// Hourly residential demand profile used by [`default_load_classes`].
const HOMES_PROFILE: [f64; 24] = [
    0.8, 0.6, 0.6, 0.7, 0.9, 1.2, 1.8, 2.4, 2.6, 2.4, 2.2, 2.0, 1.8, 1.9, 2.1, 2.6, 3.0, 3.2, 3.0,
    2.4, 1.8, 1.2, 0.9, 0.8,
];

/// Default islanded load set: a constant critical hospital load, a daytime
/// school load and a residential profile, with well-separated penalty
/// weights. Profiles repeat daily when the horizon exceeds 24 steps.
pub fn default_load_classes(horizon: usize) -> Vec<LoadClass> {
    let hospital = vec![2.0; horizon];
    let school: Vec<f64> = (0..horizon)
        .map(|h| if (6..=18).contains(&(h % 24)) { 1.0 } else { 0.0 })
        .collect();
    let homes: Vec<f64> = HOMES_PROFILE.iter().cycle().take(horizon).copied().collect();

    vec![
        LoadClass::new("hospital", hospital, 1000.0),
        LoadClass::new("school", school, 100.0),
        LoadClass::new("homes", homes, 10.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_classes_are_priority_ordered() {
        let classes = default_load_classes(24);
        assert_eq!(classes.len(), 3);
        for pair in classes.windows(2) {
            assert!(pair[0].unmet_penalty_weight > pair[1].unmet_penalty_weight);
        }
        for class in &classes {
            assert_eq!(class.demand_kwh.len(), 24);
        }
    }

    #[test]
    fn school_load_is_daytime_only() {
        let classes = default_load_classes(24);
        let school = &classes[1];
        assert_eq!(school.demand_kwh[3], 0.0);
        assert_eq!(school.demand_kwh[12], 1.0);
        assert_eq!(school.demand_kwh[22], 0.0);
    }
}
