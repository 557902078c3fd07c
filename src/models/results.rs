use std::fmt;
use std::fmt::Formatter;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome of one simulated hour
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HourlyResult {
    pub date: NaiveDate,
    pub hour: u32,
    pub consumption_kwh: f64,
    pub production_kwh: f64,
    pub battery_charge_kwh: f64,
    pub battery_discharge_kwh: f64,
    pub battery_level_kwh: f64,
    pub grid_purchase_kwh: f64,
    pub grid_surplus_kwh: f64,
    pub energy_period: String,
    pub power_period: String,
    pub energy_price: f64,
    pub power_price: f64,
    pub contracted_power_kw: f64,
    pub energy_cost: f64,
    pub surplus_value: f64,
    pub power_cost: f64,
}

/// Monetary breakdown of one calendar month
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct MonthlyBill {
    pub year: i32,
    pub month: u32,
    pub days: u32,
    pub consumption_kwh: f64,
    pub production_kwh: f64,
    pub grid_purchase_kwh: f64,
    pub grid_surplus_kwh: f64,
    pub energy_cost: f64,
    pub power_term: f64,
    pub surplus_generated: f64,
    pub surplus_compensation: f64,
    pub net_energy_cost: f64,
    pub leftover_surplus: f64,
    pub meter_rental: f64,
    pub electricity_tax: f64,
    pub virtual_battery_fee: f64,
    pub subtotal: f64,
    pub vat: f64,
    pub total_before_credit: f64,
    pub credit_used: f64,
    pub total: f64,
    pub starting_balance: f64,
    pub ending_balance: f64,
}

impl fmt::Display for MonthlyBill {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}-{:02}: Cons {:>7.1} kWh, Prod {:>7.1} kWh, Buy {:>7.1} kWh, Sell {:>7.1} kWh, Energy {:>7.2}, Power {:>6.2}, Comp {:>7.2}, Credit {:>6.2}, Total {:>7.2}, Balance {:>7.2}",
               self.year, self.month,
               self.consumption_kwh, self.production_kwh,
               self.grid_purchase_kwh, self.grid_surplus_kwh,
               self.energy_cost, self.power_term, self.surplus_compensation,
               self.credit_used, self.total, self.ending_balance)
    }
}

/// Totals over all simulated months
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct AnnualTotals {
    pub consumption_kwh: f64,
    pub production_kwh: f64,
    pub grid_purchase_kwh: f64,
    pub grid_surplus_kwh: f64,
    pub battery_charge_kwh: f64,
    pub battery_discharge_kwh: f64,
    pub energy_cost: f64,
    pub power_term: f64,
    pub surplus_compensation: f64,
    pub meter_rental: f64,
    pub electricity_tax: f64,
    pub virtual_battery_fee: f64,
    pub vat: f64,
    pub credit_used: f64,
    pub total: f64,
}

/// Complete outcome for one (offer, battery) combination
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SimulationResult {
    pub offer: String,
    pub battery: Option<String>,
    pub hourly: Vec<HourlyResult>,
    pub monthly: Vec<MonthlyBill>,
    pub annual: AnnualTotals,
    pub self_consumption_ratio: f64,
    pub ending_balance: f64,
    pub billing_passes: usize,
    pub converged: bool,
    pub baseline_total: f64,
    pub annual_savings: f64,
    pub battery_payback_years: Option<f64>,
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let caption = format!("{} / {} ", self.offer, self.battery.as_deref().unwrap_or("no battery"));
        writeln!(f, "{:=<120}", caption)?;
        for m in &self.monthly {
            writeln!(f, "{}", m)?;
        }
        write!(f, "Total {:.2} (baseline {:.2}, savings {:.2}), self consumption {:.1}%, balance {:.2}, passes {}",
               self.annual.total, self.baseline_total, self.annual_savings,
               self.self_consumption_ratio * 100.0, self.ending_balance, self.billing_passes)?;
        if let Some(years) = self.battery_payback_years {
            write!(f, ", battery payback {:.1} years", years)?;
        }

        Ok(())
    }
}
