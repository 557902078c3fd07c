use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use glob::glob;
use log::{debug, LevelFilter};
use serde::Deserialize;
use crate::errors::ConfigError;
use crate::models::battery::Battery;
use crate::models::consumption::ConsumptionRecord;
use crate::models::installation::{RawYield, SolarInstallation};
use crate::models::tariff::{CompanyOffer, TariffSchedule};
use crate::periods::validate_schedule;

#[derive(Deserialize)]
pub struct Files {
    pub consumption_file: String,
    pub raw_yield_dir: String,
    pub market_prices_file: Option<String>,
    pub results_dir: String,
}

#[derive(Deserialize)]
pub struct General {
    pub log_path: String,
    pub log_level: LevelFilter,
    pub log_to_stdout: bool,
    #[serde(default = "default_keep_reports_days")]
    pub keep_reports_days: i64,
}

fn default_keep_reports_days() -> i64 {
    30
}

#[derive(Deserialize)]
pub struct Config {
    pub general: General,
    pub files: Files,
    pub installation: SolarInstallation,
    pub schedules: HashMap<String, TariffSchedule>,
    pub offers: Vec<CompanyOffer>,
    #[serde(default)]
    pub batteries: Vec<Battery>,
}

/// Loads the configuration file and returns a struct with all configuration items.
/// Raw yield series found in the raw yield directory are attached to the installation.
///
/// # Arguments
///
/// * 'config_path' - path to the configuration file
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {

    let toml = fs::read_to_string(config_path)?;
    let mut config: Config = toml::from_str(&toml)?;

    check_schedules(&config)?;

    config.installation.raw_yield = load_raw_yield(&config.files.raw_yield_dir)?;

    Ok(config)
}

/// Checks that all schedules tile the year, that offer names are unique and that offers only
/// reference known schedules
///
/// # Arguments
///
/// * 'config' - the parsed configuration
fn check_schedules(config: &Config) -> Result<(), ConfigError> {
    for (name, schedule) in &config.schedules {
        validate_schedule(schedule).map_err(|e| ConfigError(format!("schedule '{}': {}", name, e)))?;
    }

    let mut names = HashSet::new();
    for offer in &config.offers {
        if !names.insert(offer.name.as_str()) {
            return Err(ConfigError(format!("duplicate offer name '{}'", offer.name)));
        }
        for schedule in [offer.tariff_schedule.as_str(), offer.power_schedule_name()] {
            if !config.schedules.contains_key(schedule) {
                return Err(ConfigError(format!("offer '{}' references unknown schedule '{}'", offer.name, schedule)));
            }
        }
    }

    Ok(())
}

/// Loads all raw yield series from json files in the given directory, keyed by panel group name
///
/// # Arguments
///
/// * 'raw_yield_dir' - directory holding one json file per panel group
fn load_raw_yield(raw_yield_dir: &str) -> Result<HashMap<String, RawYield>, ConfigError> {
    let mut result: HashMap<String, RawYield> = HashMap::new();

    let pattern = Path::new(raw_yield_dir).join("*.json");
    for entry in glob(&pattern.to_string_lossy())? {
        if let Ok(path) = entry {
            let json = fs::read_to_string(&path)?;
            let raw_yield: RawYield = serde_json::from_str(&json)
                .map_err(|e| ConfigError(format!("raw yield file {}: {}", path.display(), e)))?;

            debug!("loaded {} raw yield samples for group '{}'", raw_yield.samples.len(), raw_yield.group);
            result.insert(raw_yield.group.clone(), raw_yield);
        }
    }

    Ok(result)
}

/// Loads hourly consumption records from a json file
///
/// # Arguments
///
/// * 'consumption_file' - path to the json file
pub fn load_consumption(consumption_file: &str) -> Result<Vec<ConsumptionRecord>, ConfigError> {
    let json = fs::read_to_string(consumption_file)?;
    let records: Vec<ConsumptionRecord> = serde_json::from_str(&json)?;

    if let Some(r) = records.iter().find(|r| !(1..=24).contains(&r.hour)) {
        return Err(ConfigError(format!("consumption record {} has hour {} outside 1-24", r.date, r.hour)));
    }
    if let Some(r) = records.iter().find(|r| r.kwh < 0.0 || !r.kwh.is_finite()) {
        return Err(ConfigError(format!("consumption record {} hour {} has invalid energy {}", r.date, r.hour, r.kwh)));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[general]
log_path = "solarbill.log"
log_level = "info"
log_to_stdout = true

[files]
consumption_file = "consumption.json"
raw_yield_dir = "RAW_DIR"
results_dir = "results"

[installation]
latitude = 37.4
longitude = -5.9
system_loss_percent = 14.0

[[installation.panel_groups]]
name = "roof"
peak_power_kw = 4.0
tilt_deg = 30.0
azimuth_deg = 180.0

[[installation.panel_groups.obstacles]]
name = "chimney"
height_m = 2.0
direction = "S"
width_m = 1.0
distance_m = 3.0

[schedules.regulated]
type = "regulated"

[schedules.power]
type = "regulated_power"

[schedules.seasons]
type = "custom"

[[schedules.seasons.ranges]]
start = { month = 1, day = 1 }
end = { month = 12, day = 31 }
weekend = { specific = "cheap" }
slots = [
    { name = "cheap", start_hour = 0, end_hour = 8 },
    { name = "dear", start_hour = 8, end_hour = 24 },
]

[[offers]]
name = "Regulated"
tariff_schedule = "regulated"
power_schedule = "power"
energy_prices = { punta = 0.3, llano = 0.2, valle = 0.1 }
contracted_power = 4.6

[[offers]]
name = "Two periods"
tariff_schedule = "seasons"
energy_prices = { cheap = 0.1, dear = 0.2 }
contracted_power = { cheap = 3.0, dear = 5.0 }
has_virtual_battery = true

[[batteries]]
name = "5 kWh"
capacity_kwh = 5.0
max_power_w = 2500.0
round_trip_efficiency_percent = 90.0
price_eur = 3000.0
"#;

    fn write_config(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("config.toml");
        let raw_dir = dir.path().join("raw");
        fs::create_dir_all(&raw_dir).unwrap();
        fs::write(&path, content.replace("RAW_DIR", &raw_dir.to_string_lossy())).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn loads_full_config() {
        let dir = TempDir::new().unwrap();
        let raw = r#"{"group":"roof","fetch_parameters":{"peak_power_kw":4.0,"tilt_deg":30.0,"azimuth_deg":180.0,"system_loss_percent":14.0},
            "samples":[{"time":"2020-06-01T10:00:00Z","power_w":2500.0}]}"#;
        let path = write_config(&dir, CONFIG);
        fs::write(dir.path().join("raw").join("roof.json"), raw).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.general.log_level, LevelFilter::Info);
        assert_eq!(config.general.keep_reports_days, 30);
        assert_eq!(config.schedules.len(), 3);
        assert_eq!(config.offers.len(), 2);
        assert_eq!(config.offers[1].contracted_power.for_period("dear"), 5.0);
        assert!(config.offers[1].surplus_capped);
        assert_eq!(config.batteries[0].price_eur, Some(3000.0));
        assert_eq!(config.installation.panel_groups[0].obstacles[0].center_azimuth_deg, 180.0);
        assert_eq!(config.installation.raw_yield["roof"].samples.len(), 1);
    }

    #[test]
    fn rejects_unknown_schedule_reference() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, &CONFIG.replace(r#"power_schedule = "power""#, r#"power_schedule = "missing""#));

        let err = load_config(&path).err().unwrap();
        assert!(err.to_string().contains("unknown schedule 'missing'"));
    }

    #[test]
    fn rejects_duplicate_offer_names() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, &CONFIG.replace(r#"name = "Two periods""#, r#"name = "Regulated""#));

        let err = load_config(&path).err().unwrap();
        assert!(err.to_string().contains("duplicate offer name 'Regulated'"));
    }

    #[test]
    fn rejects_schedule_with_gaps() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, &CONFIG.replace("end_hour = 24 }", "end_hour = 23 }"));

        let err = load_config(&path).err().unwrap();
        assert!(err.to_string().contains("schedule 'seasons'"));
    }

    #[test]
    fn loads_and_checks_consumption() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        fs::write(&good, r#"[{"date":"2023-01-01","hour":1,"kwh":0.4},{"date":"2023-01-01","hour":24,"kwh":0.2}]"#).unwrap();
        fs::write(&bad, r#"[{"date":"2023-01-01","hour":0,"kwh":0.4}]"#).unwrap();

        assert_eq!(load_consumption(&good.to_string_lossy()).unwrap().len(), 2);
        assert!(load_consumption(&bad.to_string_lossy()).is_err());
    }
}
