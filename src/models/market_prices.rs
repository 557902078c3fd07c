use std::collections::BTreeMap;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of hourly market prices as delivered by the price source
#[derive(Serialize, Deserialize, Debug)]
pub struct DayPrices {
    pub date: NaiveDate,
    pub prices: Vec<f64>,
}

/// Prefetched table of hourly market prices in currency per kWh
///
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MarketPrices {
    days: BTreeMap<NaiveDate, [f64; 24]>,
}

impl MarketPrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the prices for one day
    ///
    /// # Arguments
    ///
    /// * 'date' - the delivery date
    /// * 'prices' - 24 prices, index 0 being the hour starting at midnight
    pub fn insert(&mut self, date: NaiveDate, prices: [f64; 24]) {
        self.days.insert(date, prices);
    }

    /// Returns the price for the given date and hour (1-24 convention), None if not in the table
    ///
    /// # Arguments
    ///
    /// * 'date' - the date
    /// * 'hour' - hour 1-24
    pub fn price(&self, date: NaiveDate, hour: u32) -> Option<f64> {
        if !(1..=24).contains(&hour) {
            return None;
        }
        self.days.get(&date).map(|p| p[hour as usize - 1])
    }

    /// Keeps only days within the given range, both ends inclusive. A range ending before it
    /// starts keeps nothing.
    ///
    /// # Arguments
    ///
    /// * 'from' - first date to keep
    /// * 'to' - last date to keep
    pub fn restrict(&self, from: NaiveDate, to: NaiveDate) -> MarketPrices {
        if from > to {
            return MarketPrices::new();
        }
        let days = self.days.range(from..=to).map(|(d, p)| (*d, *p)).collect();
        MarketPrices { days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    fn table() -> MarketPrices {
        let mut prices = MarketPrices::new();
        for day in 1..=5 {
            prices.insert(date(3, day), [day as f64 / 10.0; 24]);
        }
        prices
    }

    #[test]
    fn price_uses_one_based_hours() {
        let prices = table();
        assert_eq!(prices.price(date(3, 2), 1), Some(0.2));
        assert_eq!(prices.price(date(3, 2), 24), Some(0.2));
        assert_eq!(prices.price(date(3, 2), 0), None);
        assert_eq!(prices.price(date(3, 2), 25), None);
        assert_eq!(prices.price(date(4, 1), 10), None);
    }

    #[test]
    fn restrict_keeps_inclusive_range() {
        let restricted = table().restrict(date(3, 2), date(3, 4));
        assert_eq!(restricted.len(), 3);
        assert_eq!(restricted.price(date(3, 1), 1), None);
        assert_eq!(restricted.price(date(3, 4), 1), Some(0.4));
    }

    #[test]
    fn restrict_with_reversed_range_is_empty() {
        let restricted = table().restrict(date(3, 4), date(3, 2));
        assert!(restricted.is_empty());
    }
}
