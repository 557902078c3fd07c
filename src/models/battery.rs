use serde::{Deserialize, Serialize};

/// A home battery definition. It carries no state, the charge level lives in the dispatcher
/// of a running simulation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Battery {
    pub name: String,
    pub capacity_kwh: f64,
    pub max_power_w: f64,
    pub round_trip_efficiency_percent: f64,
    pub price_eur: Option<f64>,
}

impl Battery {
    /// Max energy that can be moved in or out during one hour
    ///
    pub fn max_power_kw(&self) -> f64 {
        (self.max_power_w / 1000.0).max(0.0)
    }

    /// Round trip efficiency as a factor between 0 and 1
    ///
    pub fn efficiency(&self) -> f64 {
        (self.round_trip_efficiency_percent / 100.0).clamp(0.0, 1.0)
    }
}
