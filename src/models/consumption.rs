use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One metered hour of household consumption.
///
/// `hour` follows the 1-24 convention used by utility meter exports, i.e. hour N
/// covers the local interval [N-1, N).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConsumptionRecord {
    pub date: NaiveDate,
    pub hour: u32,
    pub kwh: f64,
}

impl ConsumptionRecord {
    pub fn new(date: NaiveDate, hour: u32, kwh: f64) -> Self {
        Self { date, hour, kwh }
    }
}

/// Sorts consumption records chronologically, in place
///
/// # Arguments
///
/// * 'records' - the records to sort
pub fn sort_chronologically(records: &mut [ConsumptionRecord]) {
    records.sort_by(|a, b| a.date.cmp(&b.date).then(a.hour.cmp(&b.hour)));
}
