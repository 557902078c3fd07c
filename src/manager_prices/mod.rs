use std::fs;
use chrono::NaiveDate;
use log::info;
use crate::errors::PriceError;
use crate::models::market_prices::{DayPrices, MarketPrices};

/// Anything that can deliver hourly market prices for a date range in one batch
pub trait PriceSource {
    /// Returns prices for all days from 'from' to 'to', both inclusive, that the source knows of
    ///
    /// # Arguments
    ///
    /// * 'from' - first date
    /// * 'to' - last date
    fn prices(&self, from: NaiveDate, to: NaiveDate) -> Result<MarketPrices, PriceError>;
}

/// Market prices read from a JSON file holding a list of days with 24 hourly prices each
pub struct FilePrices {
    path: String,
}

impl FilePrices {
    pub fn new(path: &str) -> FilePrices {
        FilePrices { path: path.to_string() }
    }

    /// Transforms the day records to a price table
    ///
    /// # Arguments
    ///
    /// * 'days' - day records as read from file
    fn days_to_table(days: &[DayPrices]) -> Result<MarketPrices, PriceError> {
        let mut table = MarketPrices::new();

        for day in days {
            let prices: [f64; 24] = day.prices
                .as_slice()
                .try_into()
                .map_err(|_| PriceError(format!("number of hourly prices for {} not equal to 24", day.date)))?;
            table.insert(day.date, prices);
        }

        Ok(table)
    }
}

impl PriceSource for FilePrices {
    fn prices(&self, from: NaiveDate, to: NaiveDate) -> Result<MarketPrices, PriceError> {
        let json = fs::read_to_string(&self.path)?;
        let days: Vec<DayPrices> = serde_json::from_str(&json)?;

        let table = FilePrices::days_to_table(&days)?.restrict(from, to);
        info!("loaded market prices for {} days between {} and {}", table.len(), from, to);

        Ok(table)
    }
}
