use std::collections::HashMap;
use chrono::Datelike;
use log::{debug, info, warn};
use rayon::prelude::*;
use crate::billing::calculate_bill;
use crate::charge::Dispatcher;
use crate::errors::SimulationError;
use crate::models::battery::Battery;
use crate::models::consumption::{sort_chronologically, ConsumptionRecord};
use crate::models::market_prices::MarketPrices;
use crate::models::results::{AnnualTotals, HourlyResult, MonthlyBill, SimulationResult};
use crate::models::tariff::{CompanyOffer, TariffSchedule};
use crate::periods::{resolve_period, UNKNOWN};
use crate::production::ProductionIndex;

/// Max number of full year billing passes when settling the virtual battery balance
pub const MAX_BILLING_PASSES: usize = 10;

/// Balance change between two passes below which the balance is considered settled
pub const CONVERGENCE_TOLERANCE: f64 = 0.01;

/// Everything a simulation run reads, shared between all (offer, battery) combinations
pub struct SimulationInput<'a> {
    pub consumption: &'a [ConsumptionRecord],
    pub production: &'a ProductionIndex,
    pub schedules: &'a HashMap<String, TariffSchedule>,
    pub market_prices: Option<&'a MarketPrices>,
}

/// Billing outcome of the convergence loop
struct Billing {
    monthly: Vec<MonthlyBill>,
    passes: usize,
    converged: bool,
}

/// Runs one simulation of an offer, optionally with a battery, over the full consumption series.
///
/// # Arguments
///
/// * 'input' - consumption, production index, schedules and prefetched market prices
/// * 'offer' - the contract to bill with
/// * 'battery' - the battery to dispatch, if any
pub fn simulate(input: &SimulationInput, offer: &CompanyOffer, battery: Option<&Battery>) -> Result<SimulationResult, SimulationError> {
    let mut records = input.consumption.to_vec();
    sort_chronologically(&mut records);

    let baseline = baseline_total(input, &records, offer)?;
    simulate_sorted(input, &records, offer, battery, baseline)
}

/// Annual total of an offer without production and without battery, i.e. what the household
/// pays before any PV is installed
///
/// # Arguments
///
/// * 'input' - schedules and market prices
/// * 'records' - chronologically sorted consumption
/// * 'offer' - the contract to bill with
fn baseline_total(input: &SimulationInput, records: &[ConsumptionRecord], offer: &CompanyOffer) -> Result<f64, SimulationError> {
    let hours = simulate_hours(input, records, offer, None, None)?;
    Ok(converge_billing(&hours, offer).monthly.iter().map(|b| b.total).sum())
}

/// Simulates one combination against an already computed baseline
///
/// # Arguments
///
/// * 'input' - consumption, production index, schedules and prefetched market prices
/// * 'records' - chronologically sorted consumption
/// * 'offer' - the contract to bill with
/// * 'battery' - the battery to dispatch, if any
/// * 'baseline_total' - annual total of the same offer without PV and battery
fn simulate_sorted(
    input: &SimulationInput,
    records: &[ConsumptionRecord],
    offer: &CompanyOffer,
    battery: Option<&Battery>,
    baseline_total: f64) -> Result<SimulationResult, SimulationError> {

    let hourly = simulate_hours(input, records, offer, Some(input.production), battery)?;
    let billing = converge_billing(&hourly, offer);

    let annual = annual_totals(&hourly, &billing.monthly);
    let self_consumption_ratio = if annual.consumption_kwh > 0.0 {
        (annual.production_kwh - annual.grid_surplus_kwh) / annual.consumption_kwh
    } else {
        0.0
    };
    let ending_balance = billing.monthly.last().map_or(0.0, |b| b.ending_balance);

    let result = SimulationResult {
        offer: offer.name.clone(),
        battery: battery.map(|b| b.name.clone()),
        annual_savings: baseline_total - annual.total,
        hourly,
        monthly: billing.monthly,
        annual,
        self_consumption_ratio,
        ending_balance,
        billing_passes: billing.passes,
        converged: billing.converged,
        baseline_total,
        battery_payback_years: None,
    };

    info!("simulated '{}' with {}: total {:.2}, savings {:.2}, self consumption {:.1}%",
        result.offer, result.battery.as_deref().unwrap_or("no battery"),
        result.annual.total, result.annual_savings, result.self_consumption_ratio * 100.0);

    Ok(result)
}

/// Runs all combinations of offers and batteries, each offer also being simulated without a
/// battery. The baseline of every offer is computed once and shared by its combinations.
/// Combinations run in parallel and share nothing mutable. If any of them fails the whole batch
/// fails with that error and no results are returned.
///
/// # Arguments
///
/// * 'input' - consumption, production index, schedules and prefetched market prices
/// * 'offers' - offers to simulate
/// * 'batteries' - batteries to simulate
pub fn run_all(input: &SimulationInput, offers: &[CompanyOffer], batteries: &[Battery]) -> Result<Vec<SimulationResult>, SimulationError> {
    if input.consumption.is_empty() {
        return Err(SimulationError::NoConsumption);
    }
    if offers.is_empty() {
        return Err(SimulationError::NoOffers);
    }

    let mut records = input.consumption.to_vec();
    sort_chronologically(&mut records);

    let baselines = offers
        .par_iter()
        .map(|offer| baseline_total(input, &records, offer))
        .collect::<Result<Vec<f64>, SimulationError>>()?;

    let combinations: Vec<(usize, Option<&Battery>)> = (0..offers.len())
        .flat_map(|i| std::iter::once(None).chain(batteries.iter().map(Some)).map(move |b| (i, b)))
        .collect();

    info!("running {} simulations over {} consumption hours", combinations.len(), records.len());

    let mut results = combinations
        .par_iter()
        .map(|(i, battery)| simulate_sorted(input, &records, &offers[*i], *battery, baselines[*i]))
        .collect::<Result<Vec<SimulationResult>, SimulationError>>()?;
    fill_battery_payback(&mut results, &combinations);

    Ok(results)
}

/// Sets the simple payback time for every result with a priced battery, measured against the same
/// offer without battery
///
/// # Arguments
///
/// * 'results' - all simulation results, in the order of 'combinations'
/// * 'combinations' - offer index and battery of every result
fn fill_battery_payback(results: &mut [SimulationResult], combinations: &[(usize, Option<&Battery>)]) {
    let without: HashMap<usize, f64> = results
        .iter()
        .zip(combinations)
        .filter(|(_, (_, battery))| battery.is_none())
        .map(|(r, (i, _))| (*i, r.annual.total))
        .collect();

    for (result, (i, battery)) in results.iter_mut().zip(combinations) {
        let price = battery.and_then(|b| b.price_eur);
        let reference = without.get(i);

        if let (Some(price), Some(reference)) = (price, reference) {
            let yearly = reference - result.annual.total;
            if yearly > 0.0 {
                result.battery_payback_years = Some(price / yearly);
            }
        }
    }
}

/// Walks the consumption series hour by hour: production lookup, battery dispatch, period
/// resolution and hourly cost fields.
///
/// # Arguments
///
/// * 'input' - schedules and market prices
/// * 'records' - chronologically sorted consumption
/// * 'offer' - the contract
/// * 'production' - production index, None to simulate without PV
/// * 'battery' - the battery, if any
fn simulate_hours(
    input: &SimulationInput,
    records: &[ConsumptionRecord],
    offer: &CompanyOffer,
    production: Option<&ProductionIndex>,
    battery: Option<&Battery>) -> Result<Vec<HourlyResult>, SimulationError> {

    let energy_schedule = lookup_schedule(input, offer, &offer.tariff_schedule)?;
    let power_schedule = lookup_schedule(input, offer, offer.power_schedule_name())?;
    let market_prices = if offer.use_market_price {
        Some(input.market_prices.ok_or_else(|| SimulationError::MissingMarketPrices(offer.name.clone()))?)
    } else {
        None
    };

    let mut dispatcher = Dispatcher::new(battery);
    let mut missing_prices = 0usize;
    let mut unknown_periods = 0usize;
    let mut hourly = Vec::with_capacity(records.len());

    for record in records {
        let produced = production.map_or(0.0, |p| p.production(record.date, record.hour));
        let outcome = dispatcher.dispatch(record.kwh, produced);

        let energy_period = resolve_period(energy_schedule, record.date, record.hour);
        let power_period = resolve_period(power_schedule, record.date, record.hour);
        if energy_period == UNKNOWN || power_period == UNKNOWN {
            unknown_periods += 1;
        }

        let energy_price = match market_prices {
            Some(prices) => prices.price(record.date, record.hour).unwrap_or_else(|| {
                debug!("no market price for {} hour {}, using 0", record.date, record.hour);
                missing_prices += 1;
                0.0
            }),
            None => offer.energy_price(energy_period),
        };
        let power_price = offer.power_price(power_period);
        let contracted_power_kw = offer.contracted_power.for_period(power_period);

        hourly.push(HourlyResult {
            date: record.date,
            hour: record.hour,
            consumption_kwh: record.kwh,
            production_kwh: produced,
            battery_charge_kwh: outcome.charged,
            battery_discharge_kwh: outcome.discharged,
            battery_level_kwh: outcome.level_after,
            grid_purchase_kwh: outcome.grid_purchase,
            grid_surplus_kwh: outcome.grid_surplus,
            energy_period: energy_period.to_string(),
            power_period: power_period.to_string(),
            energy_price,
            power_price,
            contracted_power_kw,
            energy_cost: outcome.grid_purchase * energy_price,
            surplus_value: outcome.grid_surplus * offer.surplus_compensation_per_kwh,
            power_cost: power_price * contracted_power_kw / 24.0,
        });
    }

    if missing_prices > 0 {
        warn!("offer '{}': {} hours without market price were priced at 0", offer.name, missing_prices);
    }
    if unknown_periods > 0 {
        warn!("offer '{}': {} hours could not be assigned a tariff period and were priced at 0", offer.name, unknown_periods);
    }

    Ok(hourly)
}

fn lookup_schedule<'a>(input: &SimulationInput<'a>, offer: &CompanyOffer, name: &str) -> Result<&'a TariffSchedule, SimulationError> {
    input.schedules
        .get(name)
        .ok_or_else(|| SimulationError::UnknownSchedule { offer: offer.name.clone(), schedule: name.to_string() })
}

/// Splits chronologically sorted hours into calendar months
///
/// # Arguments
///
/// * 'hourly' - sorted hourly results
fn group_by_month(hourly: &[HourlyResult]) -> Vec<(i32, u32, &[HourlyResult])> {
    hourly
        .chunk_by(|a, b| a.date.year() == b.date.year() && a.date.month() == b.date.month())
        .map(|chunk| (chunk[0].date.year(), chunk[0].date.month(), chunk))
        .collect()
}

/// Bills all months once, carrying the virtual battery balance from month to month
///
/// # Arguments
///
/// * 'months' - hours grouped per month
/// * 'offer' - the contract
/// * 'starting_balance' - balance before the first month
fn billing_pass(months: &[(i32, u32, &[HourlyResult])], offer: &CompanyOffer, starting_balance: f64) -> Vec<MonthlyBill> {
    let mut balance = starting_balance;
    months
        .iter()
        .map(|(year, month, hours)| {
            let bill = calculate_bill(*year, *month, hours, offer, balance);
            balance = bill.ending_balance;
            bill
        })
        .collect()
}

/// Bills the year until the virtual battery balance settles.
///
/// January's bill depends on what is left in the virtual battery at the end of December of the
/// same simulated year, so the year is billed repeatedly, each pass starting with the previous
/// pass's ending balance. Without a virtual battery a single pass is enough. The iteration is
/// capped at MAX_BILLING_PASSES; hitting the cap is logged and reported as not converged.
///
/// # Arguments
///
/// * 'hourly' - sorted hourly results
/// * 'offer' - the contract
fn converge_billing(hourly: &[HourlyResult], offer: &CompanyOffer) -> Billing {
    let months = group_by_month(hourly);
    let mut starting_balance = 0.0;
    let mut passes = 0;

    loop {
        passes += 1;
        let monthly = billing_pass(&months, offer, starting_balance);
        if !offer.has_virtual_battery {
            return Billing { monthly, passes, converged: true };
        }

        let ending_balance = monthly.last().map_or(starting_balance, |b| b.ending_balance);
        if (ending_balance - starting_balance).abs() < CONVERGENCE_TOLERANCE {
            debug!("offer '{}': virtual battery balance settled at {:.2} after {} passes", offer.name, ending_balance, passes);
            return Billing { monthly, passes, converged: true };
        }
        if passes >= MAX_BILLING_PASSES {
            warn!("offer '{}': virtual battery balance did not settle after {} passes, last change {:.2}",
                offer.name, passes, ending_balance - starting_balance);
            return Billing { monthly, passes, converged: false };
        }

        starting_balance = ending_balance;
    }
}

/// Rolls hourly results and monthly bills up to annual totals
///
/// # Arguments
///
/// * 'hourly' - hourly results
/// * 'monthly' - monthly bills
fn annual_totals(hourly: &[HourlyResult], monthly: &[MonthlyBill]) -> AnnualTotals {
    let mut totals = AnnualTotals {
        battery_charge_kwh: hourly.iter().map(|h| h.battery_charge_kwh).sum(),
        battery_discharge_kwh: hourly.iter().map(|h| h.battery_discharge_kwh).sum(),
        ..Default::default()
    };

    for m in monthly {
        totals.consumption_kwh += m.consumption_kwh;
        totals.production_kwh += m.production_kwh;
        totals.grid_purchase_kwh += m.grid_purchase_kwh;
        totals.grid_surplus_kwh += m.grid_surplus_kwh;
        totals.energy_cost += m.energy_cost;
        totals.power_term += m.power_term;
        totals.surplus_compensation += m.surplus_compensation;
        totals.meter_rental += m.meter_rental;
        totals.electricity_tax += m.electricity_tax;
        totals.virtual_battery_fee += m.virtual_battery_fee;
        totals.vat += m.vat;
        totals.credit_used += m.credit_used;
        totals.total += m.total;
    }

    totals
}
