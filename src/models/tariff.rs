use std::collections::HashMap;
use serde::{Deserialize, Serialize};

/// A month and day of month, used as date range bounds independent of year
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }
}

/// What a date range does on weekends and national holidays
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeekendBehavior {
    /// Weekends follow the same time slots as working days
    #[default]
    Same,
    /// The whole day is billed in the named slot
    Specific(String),
}

/// A named hour window, `start_hour` inclusive and `end_hour` exclusive in 0-based clock hours.
/// A window with `end_hour <= start_hour` wraps around midnight.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimeSlot {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
}

/// A part of the year sharing one set of time slots. `end` is inclusive and may lie before
/// `start`, in which case the range wraps over new year.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DateRange {
    pub start: MonthDay,
    pub end: MonthDay,
    #[serde(default)]
    pub weekend: WeekendBehavior,
    pub slots: Vec<TimeSlot>,
}

/// The rules deciding which price period applies to an hour
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TariffSchedule {
    /// One price all day, every day
    Flat,
    /// Regulated residential 3-period energy schedule (punta/llano/valle)
    Regulated,
    /// Regulated 2-period schedule used for contracted power (punta/valle)
    RegulatedPower,
    Custom { ranges: Vec<DateRange> },
}

/// Contracted power, either the same for all periods or given per period
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ContractedPower {
    Scalar(f64),
    PerPeriod(HashMap<String, f64>),
}

impl Default for ContractedPower {
    fn default() -> Self {
        ContractedPower::Scalar(0.0)
    }
}

impl ContractedPower {
    /// Returns contracted power in kW for the given period, 0.0 if the period is not listed
    ///
    /// # Arguments
    ///
    /// * 'period' - name of the power period
    pub fn for_period(&self, period: &str) -> f64 {
        match self {
            ContractedPower::Scalar(kw) => *kw,
            ContractedPower::PerPeriod(map) => map.get(period).copied().unwrap_or(0.0),
        }
    }
}

fn default_true() -> bool {
    true
}

/// An electricity contract as offered by a retailer
///
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CompanyOffer {
    pub name: String,
    pub tariff_schedule: String,
    #[serde(default)]
    pub energy_prices: HashMap<String, f64>,
    #[serde(default)]
    pub use_market_price: bool,
    #[serde(default)]
    pub surplus_compensation_per_kwh: f64,
    #[serde(default = "default_true")]
    pub surplus_capped: bool,
    #[serde(default)]
    pub has_virtual_battery: bool,
    #[serde(default)]
    pub virtual_battery_monthly_fee: f64,
    #[serde(default)]
    pub contracted_power: ContractedPower,
    pub power_schedule: Option<String>,
    #[serde(default)]
    pub power_prices: HashMap<String, f64>,
    #[serde(default)]
    pub meter_rental_per_day: f64,
    #[serde(default)]
    pub electricity_tax_percent: f64,
    #[serde(default)]
    pub vat_percent: f64,
}

impl CompanyOffer {
    /// Returns a bare offer on the given schedule with all prices, fees and taxes at zero
    ///
    /// # Arguments
    ///
    /// * 'name' - name of the offer
    /// * 'tariff_schedule' - name of the energy tariff schedule
    pub fn new(name: &str, tariff_schedule: &str) -> Self {
        Self {
            name: name.to_string(),
            tariff_schedule: tariff_schedule.to_string(),
            energy_prices: HashMap::new(),
            use_market_price: false,
            surplus_compensation_per_kwh: 0.0,
            surplus_capped: true,
            has_virtual_battery: false,
            virtual_battery_monthly_fee: 0.0,
            contracted_power: ContractedPower::default(),
            power_schedule: None,
            power_prices: HashMap::new(),
            meter_rental_per_day: 0.0,
            electricity_tax_percent: 0.0,
            vat_percent: 0.0,
        }
    }

    /// Name of the schedule used for the power term, the energy schedule unless set
    ///
    pub fn power_schedule_name(&self) -> &str {
        self.power_schedule.as_deref().unwrap_or(&self.tariff_schedule)
    }

    /// Energy price per kWh for the given period, unknown periods are priced at zero
    ///
    /// # Arguments
    ///
    /// * 'period' - the energy period name
    pub fn energy_price(&self, period: &str) -> f64 {
        self.energy_prices.get(period).copied().unwrap_or(0.0)
    }

    /// Power price per kW and day for the given period, unknown periods are priced at zero
    ///
    /// # Arguments
    ///
    /// * 'period' - the power period name
    pub fn power_price(&self, period: &str) -> f64 {
        self.power_prices.get(period).copied().unwrap_or(0.0)
    }
}
