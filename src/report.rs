use std::fs;
use std::path::Path;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use glob::glob;
use log::{debug, warn};
use serde::Serialize;
use crate::errors::ReportError;
use crate::models::results::SimulationResult;
use crate::production::StaleYield;

const REPORT_SUFFIX: &str = "_report.json";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Serialize)]
struct Report<'a> {
    created: DateTime<Utc>,
    stale_yield: &'a [StaleYield],
    results: &'a [SimulationResult],
}

/// Saves simulation results as a timestamped json report and removes reports older than the
/// given number of days. Returns the path of the saved report.
///
/// # Arguments
///
/// * 'results_dir' - the directory to save the report to
/// * 'results' - all simulation results of the run
/// * 'stale_yield' - raw yield diagnostics from building the production index
/// * 'keep_days' - reports older than this are deleted
pub fn save_report(
    results_dir: &str,
    results: &[SimulationResult],
    stale_yield: &[StaleYield],
    keep_days: i64) -> Result<String, ReportError> {

    fs::create_dir_all(results_dir)?;

    let now = Utc::now();
    let file_path = Path::new(results_dir).join(format!("{}{}", now.format(TIMESTAMP_FORMAT), REPORT_SUFFIX));

    let report = Report { created: now, stale_yield, results };
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&file_path, json)?;

    remove_old_reports(results_dir, now, keep_days)?;

    Ok(file_path.to_string_lossy().to_string())
}

/// Removes report files whose timestamp prefix is older than the given number of days
///
/// # Arguments
///
/// * 'results_dir' - the directory holding reports
/// * 'now' - current time
/// * 'keep_days' - age limit in days
fn remove_old_reports(results_dir: &str, now: DateTime<Utc>, keep_days: i64) -> Result<(), ReportError> {
    let pattern = Path::new(results_dir).join(format!("*{}", REPORT_SUFFIX));

    for entry in glob(&pattern.to_string_lossy())? {
        if let Ok(path) = entry {
            if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                let created = filename
                    .get(0..14)
                    .and_then(|ts| NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok())
                    .map(|dt| dt.and_utc());

                match created {
                    Some(created) if now - created > Duration::days(keep_days) => {
                        debug!("removing old report {}", filename);
                        fs::remove_file(&path)?;
                    },
                    Some(_) => {},
                    None => warn!("skipping report file without timestamp: {}", filename),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn saves_report_and_removes_old_ones() {
        let dir = TempDir::new().unwrap();
        let results_dir = dir.path().to_str().unwrap();
        let old = dir.path().join("20000101000000_report.json");
        let foreign = dir.path().join("my_report.json");
        let recent = dir.path().join(format!("{}_report.json", Utc::now().format(TIMESTAMP_FORMAT)));
        fs::write(&old, "{}").unwrap();
        fs::write(&foreign, "{}").unwrap();
        fs::write(&recent, "{}").unwrap();

        let path = save_report(results_dir, &[], &[], 30).unwrap();

        assert!(Path::new(&path).exists());
        assert!(!old.exists());
        assert!(foreign.exists());

        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(saved["results"].as_array().unwrap().is_empty());
        assert!(saved["created"].is_string());
    }

    #[test]
    fn creates_missing_results_dir() {
        let dir = TempDir::new().unwrap();
        let results_dir = dir.path().join("nested").join("results");

        let path = save_report(&results_dir.to_string_lossy(), &[], &[], 1).unwrap();
        assert!(Path::new(&path).starts_with(&results_dir));
    }
}
