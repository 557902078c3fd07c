use std::collections::HashMap;
use std::fmt;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use log::{debug, warn};
use serde::Serialize;
use crate::manager_sun;
use crate::models::installation::{FetchParameters, PanelGroup, SolarInstallation};
use crate::shadow::shadow_factor;

/// Tolerance when comparing fetch parameters
const PARAMETER_TOLERANCE: f64 = 1e-6;

/// Key into the production index: month, day of month and hour (1-24)
pub type IndexKey = (u32, u32, u32);

/// Outcome of comparing the parameters a raw yield was fetched with against the current
/// configuration of a panel group
#[derive(Clone, Debug, PartialEq)]
pub struct FetchComparison {
    pub rescale: f64,
    pub stale_fields: Vec<&'static str>,
}

impl FetchComparison {
    pub fn is_stale(&self) -> bool {
        !self.stale_fields.is_empty()
    }
}

/// Diagnostic telling that a cached raw yield no longer matches its panel group geometry
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StaleYield {
    pub group: String,
    pub fields: Vec<&'static str>,
}

impl fmt::Display for StaleYield {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "raw yield for panel group '{}' is stale, changed: {}", self.group, self.fields.join(", "))
    }
}

/// Compares fetch parameters field by field. Peak power differences are handled by a linear
/// rescale factor, tilt, azimuth and system loss differences can't be rescaled and are reported
/// as stale fields.
///
/// # Arguments
///
/// * 'fetched' - parameters the raw yield was computed with
/// * 'current' - parameters as currently configured
pub fn compare_fetch_parameters(fetched: &FetchParameters, current: &FetchParameters) -> FetchComparison {
    let rescale = if fetched.peak_power_kw > 0.0 {
        current.peak_power_kw / fetched.peak_power_kw
    } else {
        1.0
    };

    let mut stale_fields = Vec::new();
    if (fetched.tilt_deg - current.tilt_deg).abs() > PARAMETER_TOLERANCE {
        stale_fields.push("tilt");
    }
    if (fetched.azimuth_deg - current.azimuth_deg).abs() > PARAMETER_TOLERANCE {
        stale_fields.push("azimuth");
    }
    if (fetched.system_loss_percent - current.system_loss_percent).abs() > PARAMETER_TOLERANCE {
        stale_fields.push("system loss");
    }

    FetchComparison { rescale, stale_fields }
}

/// Returns the last Sunday of the given month
///
/// # Arguments
///
/// * 'year' - the year
/// * 'month' - the month 1-12
pub fn last_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let first_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = first_next.pred_opt()?;
    let back = last.weekday().num_days_from_sunday() as i64;

    Some(last - Duration::days(back))
}

/// Converts an absolute time to local time for central European time, i.e. UTC+1 in winter and
/// UTC+2 between the last Sunday of March and the last Sunday of October (switching at 01:00 UTC).
///
/// # Arguments
///
/// * 'time' - the time in UTC
pub fn to_local_time(time: DateTime<Utc>) -> NaiveDateTime {
    let naive = time.naive_utc();
    let offset = if is_summer_time(naive) { 2 } else { 1 };

    naive + Duration::hours(offset)
}

/// True if the given UTC time falls within the central European summer time period
///
/// # Arguments
///
/// * 'naive_utc' - the time in UTC
fn is_summer_time(naive_utc: NaiveDateTime) -> bool {
    let year = naive_utc.year();
    let switch = |month| last_sunday(year, month).and_then(|d| d.and_hms_opt(1, 0, 0));

    match (switch(3), switch(10)) {
        (Some(start), Some(end)) => naive_utc >= start && naive_utc < end,
        _ => false,
    }
}

/// Expected installation production per month, day and hour, averaged over all years of raw
/// yield available.
///
pub struct ProductionIndex {
    values: HashMap<IndexKey, f64>,
    diagnostics: Vec<StaleYield>,
}

impl ProductionIndex {
    /// Returns an empty index, i.e. one that reports zero production for every hour
    pub fn new() -> ProductionIndex {
        ProductionIndex { values: HashMap::new(), diagnostics: Vec::new() }
    }

    /// Builds the index from the raw yield cached on the installation.
    ///
    /// Each group's samples are converted to local time, shaded by the group's obstacles,
    /// averaged per (month, day, hour) over all years and rescaled to the currently configured
    /// peak power. Groups are then summed up.
    ///
    /// # Arguments
    ///
    /// * 'installation' - the installation including its raw yield
    pub fn build(installation: &SolarInstallation) -> ProductionIndex {
        let mut index = ProductionIndex::new();

        for group in &installation.panel_groups {
            let Some(raw) = installation.raw_yield.get(&group.name) else {
                warn!("no raw yield available for panel group '{}', it will not produce", group.name);
                continue;
            };

            let comparison = compare_fetch_parameters(&raw.fetch_parameters, &installation.current_fetch_parameters(group));
            if comparison.is_stale() {
                let stale = StaleYield { group: group.name.clone(), fields: comparison.stale_fields.clone() };
                warn!("{}", stale);
                index.diagnostics.push(stale);
            }
            if (comparison.rescale - 1.0).abs() > PARAMETER_TOLERANCE {
                debug!("rescaling raw yield for panel group '{}' by {:.4}", group.name, comparison.rescale);
            }

            let shading = shading_table(group, installation.latitude);
            let mut sums: HashMap<IndexKey, (f64, u32)> = HashMap::new();

            for sample in &raw.samples {
                let local = to_local_time(sample.time);
                let (month, day, hour) = (local.month(), local.day(), local.hour() + 1);
                let kwh = sample.power_w / 1000.0 * shading[month as usize - 1][hour as usize - 1];

                let entry = sums.entry((month, day, hour)).or_insert((0.0, 0));
                entry.0 += kwh;
                entry.1 += 1;
            }

            for (key, (sum, count)) in sums {
                *index.values.entry(key).or_insert(0.0) += sum / count as f64 * comparison.rescale;
            }
        }

        debug!("production index built with {} keys, {:.1} kWh per typical year", index.values.len(), index.total());
        index
    }

    /// Sets the expected production for one key, replacing any earlier value
    ///
    /// # Arguments
    ///
    /// * 'month' - month 1-12
    /// * 'day' - day of month
    /// * 'hour' - hour 1-24
    /// * 'kwh' - expected production
    pub fn insert(&mut self, month: u32, day: u32, hour: u32, kwh: f64) {
        self.values.insert((month, day, hour), kwh);
    }

    /// Returns expected production for the given month, day and hour
    ///
    /// # Arguments
    ///
    /// * 'month' - month 1-12
    /// * 'day' - day of month
    /// * 'hour' - hour 1-24
    pub fn get(&self, month: u32, day: u32, hour: u32) -> Option<f64> {
        self.values.get(&(month, day, hour)).copied()
    }

    /// Returns expected production for a consumption hour. The year of the date is ignored, and
    /// February 29th falls back on February 28th when the raw data has no leap day.
    ///
    /// # Arguments
    ///
    /// * 'date' - the date
    /// * 'hour' - hour 1-24
    pub fn production(&self, date: NaiveDate, hour: u32) -> f64 {
        let (month, day) = (date.month(), date.day());
        self.get(month, day, hour)
            .or_else(|| if month == 2 && day == 29 { self.get(2, 28, hour) } else { None })
            .unwrap_or(0.0)
    }

    /// Sum of all expected production in the index
    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }

    /// Stale raw yield diagnostics collected while building
    pub fn diagnostics(&self) -> &[StaleYield] {
        &self.diagnostics
    }
}

impl Default for ProductionIndex {
    fn default() -> Self {
        ProductionIndex::new()
    }
}

/// Precomputes shadow factors per month and hour for a panel group
///
/// # Arguments
///
/// * 'group' - the panel group
/// * 'lat' - installation latitude
fn shading_table(group: &PanelGroup, lat: f64) -> [[f64; 24]; 12] {
    let mut table = [[1.0; 24]; 12];
    if group.obstacles.is_empty() {
        return table;
    }

    for (m, row) in table.iter_mut().enumerate() {
        for (h, factor) in row.iter_mut().enumerate() {
            let sun = manager_sun::get_elevation_and_azimuth(h as u32 + 1, m as u32 + 1, lat);
            *factor = shadow_factor(group, sun);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use chrono::TimeZone;
    use crate::models::installation::{Orientation, RawYield, RawYieldSample};
    use crate::models::obstacle::{Obstacle, ObstacleKind};

    fn params(peak: f64, tilt: f64) -> FetchParameters {
        FetchParameters { peak_power_kw: peak, tilt_deg: tilt, azimuth_deg: 180.0, system_loss_percent: 14.0 }
    }

    fn installation(peak: f64, fetched: FetchParameters, samples: Vec<RawYieldSample>) -> SolarInstallation {
        let group = PanelGroup {
            name: "south".to_string(),
            peak_power_kw: peak,
            tilt_deg: 30.0,
            azimuth_deg: 180.0,
            height_from_ground_m: 4.0,
            panel_width_cm: None,
            panel_height_cm: None,
            orientation: Orientation::Portrait,
            obstacles: Vec::new(),
        };
        let mut raw_yield = HashMap::new();
        raw_yield.insert("south".to_string(), RawYield { group: "south".to_string(), fetch_parameters: fetched, samples });

        SolarInstallation { latitude: 37.4, longitude: -5.9, system_loss_percent: 14.0, panel_groups: vec![group], raw_yield }
    }

    fn sample(y: i32, m: u32, d: u32, h: u32, w: f64) -> RawYieldSample {
        RawYieldSample { time: Utc.with_ymd_and_hms(y, m, d, h, 10, 0).unwrap(), power_w: w }
    }

    #[test]
    fn last_sundays() {
        assert_eq!(last_sunday(2024, 3), NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(last_sunday(2024, 10), NaiveDate::from_ymd_opt(2024, 10, 27));
        assert_eq!(last_sunday(2023, 3), NaiveDate::from_ymd_opt(2023, 3, 26));
        assert_eq!(last_sunday(2023, 12), NaiveDate::from_ymd_opt(2023, 12, 31));
    }

    #[test]
    fn local_time_follows_daylight_saving() {
        let winter = to_local_time(Utc.with_ymd_and_hms(2023, 1, 15, 11, 10, 0).unwrap());
        let summer = to_local_time(Utc.with_ymd_and_hms(2023, 7, 15, 11, 10, 0).unwrap());
        assert_eq!(winter.hour(), 12);
        assert_eq!(summer.hour(), 13);

        // Switch happens at 01:00 UTC on the last Sunday of March
        let before = to_local_time(Utc.with_ymd_and_hms(2023, 3, 26, 0, 30, 0).unwrap());
        let after = to_local_time(Utc.with_ymd_and_hms(2023, 3, 26, 1, 30, 0).unwrap());
        assert_eq!(before.hour(), 1);
        assert_eq!(after.hour(), 3);

        // New year rolls the local date forward
        let late = to_local_time(Utc.with_ymd_and_hms(2022, 12, 31, 23, 10, 0).unwrap());
        assert_eq!((late.year(), late.month(), late.day(), late.hour()), (2023, 1, 1, 0));
    }

    #[test]
    fn fetch_comparison_rescales_and_detects_staleness() {
        let same = compare_fetch_parameters(&params(4.0, 30.0), &params(4.0, 30.0));
        assert_eq!(same, FetchComparison { rescale: 1.0, stale_fields: Vec::new() });

        let bigger = compare_fetch_parameters(&params(4.0, 30.0), &params(6.0, 30.0));
        assert!((bigger.rescale - 1.5).abs() < 1e-12);
        assert!(!bigger.is_stale());

        let tilted = compare_fetch_parameters(&params(4.0, 30.0), &params(4.0, 35.0));
        assert_eq!(tilted.stale_fields, vec!["tilt"]);
    }

    #[test]
    fn samples_are_averaged_over_years() {
        // 11:10 UTC in January is local hour 12, i.e. hour 13 in the 1-24 convention
        let samples = vec![
            sample(2019, 1, 10, 11, 1000.0),
            sample(2020, 1, 10, 11, 3000.0),
        ];
        let index = ProductionIndex::build(&installation(4.0, params(4.0, 30.0), samples));

        assert_eq!(index.get(1, 10, 13), Some(2.0));
        assert_eq!(index.get(1, 10, 12), None);
        assert!(index.diagnostics().is_empty());
    }

    #[test]
    fn peak_power_change_rescales() {
        let samples = vec![sample(2020, 7, 1, 10, 2000.0)];
        let index = ProductionIndex::build(&installation(6.0, params(4.0, 30.0), samples));

        // 10:10 UTC in July is 12:10 local, hour 13
        assert_eq!(index.get(7, 1, 13), Some(3.0));
    }

    #[test]
    fn stale_geometry_is_reported_but_used() {
        let samples = vec![sample(2020, 7, 1, 10, 2000.0)];
        let index = ProductionIndex::build(&installation(4.0, params(4.0, 20.0), samples));

        assert_eq!(index.diagnostics().len(), 1);
        assert_eq!(index.diagnostics()[0].fields, vec!["tilt"]);
        assert_eq!(index.get(7, 1, 13), Some(2.0));
    }

    #[test]
    fn obstacles_reduce_indexed_production() {
        let samples = vec![sample(2020, 12, 15, 11, 1000.0)];
        let mut inst = installation(4.0, params(4.0, 30.0), samples);
        inst.panel_groups[0].obstacles.push(Obstacle {
            name: "tower".to_string(),
            kind: ObstacleKind::Solid,
            height_m: 100.0,
            center_azimuth_deg: 180.0,
            width_m: 200.0,
            distance_m: 10.0,
        });
        let index = ProductionIndex::build(&inst);
        let value = index.get(12, 15, 13).unwrap();

        assert!(value < 1.0);
        assert!(value >= 0.0);
    }

    #[test]
    fn leap_day_falls_back_on_february_28th() {
        let mut index = ProductionIndex::new();
        index.insert(2, 28, 13, 1.5);

        assert_eq!(index.production(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), 13), 1.5);
        assert_eq!(index.production(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap(), 13), 1.5);
        assert_eq!(index.production(NaiveDate::from_ymd_opt(2023, 2, 28).unwrap(), 14), 0.0);
    }
}
