use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::models::obstacle::Obstacle;

/// How the modules of a panel group are mounted
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// A set of identical modules sharing tilt, azimuth and surroundings
///
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PanelGroup {
    pub name: String,
    pub peak_power_kw: f64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    #[serde(default)]
    pub height_from_ground_m: f64,
    pub panel_width_cm: Option<f64>,
    pub panel_height_cm: Option<f64>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

impl PanelGroup {
    /// Returns the module dimension running up the slope in meters, if module dimensions are known.
    /// For portrait mounting that is the module height, for landscape the module width.
    ///
    pub fn slope_length_m(&self) -> Option<f64> {
        let (w, h) = (self.panel_width_cm?, self.panel_height_cm?);
        match self.orientation {
            Orientation::Portrait => Some(h / 100.0),
            Orientation::Landscape => Some(w / 100.0),
        }
    }
}

/// Parameters a raw yield series was computed with by the external yield source
///
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct FetchParameters {
    pub peak_power_kw: f64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    pub system_loss_percent: f64,
}

/// One sample from the raw yield source, mean output in watts during the hour starting at `time`
///
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RawYieldSample {
    pub time: DateTime<Utc>,
    pub power_w: f64,
}

/// Cached raw yield for one panel group, possibly covering several years
///
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RawYield {
    pub group: String,
    pub fetch_parameters: FetchParameters,
    pub samples: Vec<RawYieldSample>,
}

/// The whole PV installation at one location
///
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SolarInstallation {
    pub latitude: f64,
    pub longitude: f64,
    pub system_loss_percent: f64,
    pub panel_groups: Vec<PanelGroup>,
    #[serde(skip)]
    pub raw_yield: HashMap<String, RawYield>,
}

impl SolarInstallation {
    /// Returns the fetch parameters that the given group would be fetched with today
    ///
    /// # Arguments
    ///
    /// * 'group' - the panel group
    pub fn current_fetch_parameters(&self, group: &PanelGroup) -> FetchParameters {
        FetchParameters {
            peak_power_kw: group.peak_power_kw,
            tilt_deg: group.tilt_deg,
            azimuth_deg: group.azimuth_deg,
            system_loss_percent: self.system_loss_percent,
        }
    }
}
