use std::collections::HashSet;
use log::debug;
use crate::models::results::{HourlyResult, MonthlyBill};
use crate::models::tariff::CompanyOffer;

/// Calculates the bill for one calendar month.
///
/// Surplus compensation is capped at the energy cost when the offer says so. Whatever surplus
/// value is left after the cap is credited to the virtual battery balance if the offer has one,
/// and that balance is drawn from to pay the month's total before moving on. A negative month
/// total (uncapped compensation exceeding the costs) is banked in the balance as well.
///
/// An empty month yields an all zero bill and leaves the balance untouched.
///
/// # Arguments
///
/// * 'year' - the year of the month
/// * 'month' - the month 1-12
/// * 'hours' - simulated hours belonging to the month
/// * 'offer' - the contract to bill with
/// * 'starting_balance' - virtual battery balance carried from the previous month
pub fn calculate_bill(year: i32, month: u32, hours: &[HourlyResult], offer: &CompanyOffer, starting_balance: f64) -> MonthlyBill {
    if hours.is_empty() {
        return MonthlyBill {
            year,
            month,
            starting_balance,
            ending_balance: starting_balance,
            ..Default::default()
        };
    }

    let days = hours.iter().map(|h| h.date).collect::<HashSet<_>>().len() as u32;

    let energy_cost = hours.iter().map(|h| h.energy_cost).sum::<f64>();
    let power_term = hours.iter().map(|h| h.power_cost).sum::<f64>();
    let surplus_generated = hours.iter().map(|h| h.surplus_value).sum::<f64>();

    let surplus_compensation = if offer.surplus_capped {
        surplus_generated.min(energy_cost)
    } else {
        surplus_generated
    };
    let net_energy_cost = energy_cost - surplus_compensation;
    let leftover_surplus = surplus_generated - surplus_compensation;

    let electricity_tax = (power_term + net_energy_cost) * offer.electricity_tax_percent / 100.0;
    let meter_rental = days as f64 * offer.meter_rental_per_day;
    let virtual_battery_fee = if offer.has_virtual_battery { offer.virtual_battery_monthly_fee } else { 0.0 };

    let subtotal = net_energy_cost + power_term + meter_rental + electricity_tax + virtual_battery_fee;
    let vat = subtotal * offer.vat_percent / 100.0;
    let total_before_credit = subtotal + vat;

    let (credit_used, ending_balance) = if offer.has_virtual_battery {
        let used = starting_balance.min(total_before_credit);
        (used, starting_balance - used + leftover_surplus)
    } else {
        (0.0, starting_balance)
    };
    let total = total_before_credit - credit_used;

    debug!("{} {}-{:02}: energy {:.2}, power {:.2}, compensation {:.2}, leftover {:.2}, total {:.2}",
        offer.name, year, month, energy_cost, power_term, surplus_compensation, leftover_surplus, total);

    MonthlyBill {
        year,
        month,
        days,
        consumption_kwh: hours.iter().map(|h| h.consumption_kwh).sum(),
        production_kwh: hours.iter().map(|h| h.production_kwh).sum(),
        grid_purchase_kwh: hours.iter().map(|h| h.grid_purchase_kwh).sum(),
        grid_surplus_kwh: hours.iter().map(|h| h.grid_surplus_kwh).sum(),
        energy_cost,
        power_term,
        surplus_generated,
        surplus_compensation,
        net_energy_cost,
        leftover_surplus,
        meter_rental,
        electricity_tax,
        virtual_battery_fee,
        subtotal,
        vat,
        total_before_credit,
        credit_used,
        total,
        starting_balance,
        ending_balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn hour(day: u32, purchase: f64, surplus: f64, energy_price: f64, compensation: f64, power_cost: f64) -> HourlyResult {
        HourlyResult {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            hour: 12,
            consumption_kwh: purchase,
            production_kwh: surplus,
            battery_charge_kwh: 0.0,
            battery_discharge_kwh: 0.0,
            battery_level_kwh: 0.0,
            grid_purchase_kwh: purchase,
            grid_surplus_kwh: surplus,
            energy_period: "flat".to_string(),
            power_period: "flat".to_string(),
            energy_price,
            power_price: 0.0,
            contracted_power_kw: 0.0,
            energy_cost: purchase * energy_price,
            surplus_value: surplus * compensation,
            power_cost,
        }
    }

    fn offer() -> CompanyOffer {
        let mut offer = CompanyOffer::new("test", "flat");
        offer.energy_prices.insert("flat".to_string(), 0.2);
        offer.surplus_compensation_per_kwh = 0.1;
        offer
    }

    #[test]
    fn empty_month_is_zero_and_keeps_balance() {
        let mut o = offer();
        o.has_virtual_battery = true;
        o.virtual_battery_monthly_fee = 2.0;
        o.meter_rental_per_day = 0.03;

        let bill = calculate_bill(2024, 3, &[], &o, 12.5);
        assert_eq!(bill.total, 0.0);
        assert_eq!(bill.days, 0);
        assert_eq!(bill.ending_balance, 12.5);
    }

    #[test]
    fn capped_compensation_never_exceeds_energy_cost() {
        let hours = vec![hour(1, 10.0, 0.0, 0.2, 0.1, 0.0), hour(2, 0.0, 50.0, 0.2, 0.1, 0.0)];
        let bill = calculate_bill(2024, 3, &hours, &offer(), 0.0);

        assert!((bill.energy_cost - 2.0).abs() < 1e-12);
        assert!((bill.surplus_generated - 5.0).abs() < 1e-12);
        assert!((bill.surplus_compensation - 2.0).abs() < 1e-12);
        assert!((bill.leftover_surplus - 3.0).abs() < 1e-12);
        assert_eq!(bill.total, 0.0);
        // No virtual battery, the leftover is lost
        assert_eq!(bill.ending_balance, 0.0);
    }

    #[test]
    fn uncapped_compensation_can_go_negative() {
        let mut o = offer();
        o.surplus_capped = false;
        let hours = vec![hour(1, 10.0, 50.0, 0.2, 0.1, 0.0)];
        let bill = calculate_bill(2024, 3, &hours, &o, 0.0);

        assert!((bill.net_energy_cost + 3.0).abs() < 1e-12);
        assert_eq!(bill.leftover_surplus, 0.0);
    }

    #[test]
    fn taxes_fees_and_rental() {
        let mut o = offer();
        o.electricity_tax_percent = 5.0;
        o.vat_percent = 21.0;
        o.meter_rental_per_day = 0.1;
        let hours = vec![hour(1, 10.0, 0.0, 0.2, 0.1, 0.5), hour(1, 0.0, 0.0, 0.2, 0.1, 0.5), hour(2, 0.0, 0.0, 0.2, 0.1, 0.5)];
        let bill = calculate_bill(2024, 3, &hours, &o, 0.0);

        assert_eq!(bill.days, 2);
        assert!((bill.power_term - 1.5).abs() < 1e-12);
        assert!((bill.electricity_tax - 0.175).abs() < 1e-12);
        assert!((bill.meter_rental - 0.2).abs() < 1e-12);
        let subtotal = 2.0 + 1.5 + 0.2 + 0.175;
        assert!((bill.subtotal - subtotal).abs() < 1e-12);
        assert!((bill.total - subtotal * 1.21).abs() < 1e-12);
    }

    #[test]
    fn virtual_battery_credits_and_pays() {
        let mut o = offer();
        o.has_virtual_battery = true;
        o.virtual_battery_monthly_fee = 1.0;

        // Leftover 3.0 is credited, fee 1.0 is paid from the starting balance
        let hours = vec![hour(1, 10.0, 50.0, 0.2, 0.1, 0.0)];
        let bill = calculate_bill(2024, 3, &hours, &o, 4.0);
        assert!((bill.total_before_credit - 1.0).abs() < 1e-12);
        assert!((bill.credit_used - 1.0).abs() < 1e-12);
        assert_eq!(bill.total, 0.0);
        assert!((bill.ending_balance - 6.0).abs() < 1e-12);

        // Not enough balance to pay everything
        let hours = vec![hour(1, 100.0, 0.0, 0.2, 0.1, 0.0)];
        let bill = calculate_bill(2024, 3, &hours, &o, 4.0);
        assert!((bill.credit_used - 4.0).abs() < 1e-12);
        assert!((bill.total - 17.0).abs() < 1e-12);
        assert_eq!(bill.ending_balance, 0.0);
    }

    #[test]
    fn uncapped_credit_goes_to_virtual_battery() {
        let mut o = offer();
        o.surplus_capped = false;
        o.has_virtual_battery = true;

        // Energy 2.0 against surplus 5.0 leaves a negative bill that is banked instead
        let hours = vec![hour(1, 10.0, 50.0, 0.2, 0.1, 0.0)];
        let bill = calculate_bill(2024, 3, &hours, &o, 0.0);
        assert!((bill.total_before_credit + 3.0).abs() < 1e-12);
        assert!((bill.credit_used + 3.0).abs() < 1e-12);
        assert!(bill.total.abs() < 1e-12);
        assert!((bill.ending_balance - 3.0).abs() < 1e-12);

        // An existing balance is kept and the credit added on top
        let bill = calculate_bill(2024, 3, &hours, &o, 1.5);
        assert!(bill.total.abs() < 1e-12);
        assert!((bill.ending_balance - 4.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn capped_compensation_is_bounded(
            values in proptest::collection::vec((0.0f64..10.0, 0.0f64..10.0), 1..50),
            price in 0.0f64..0.5,
            compensation in 0.0f64..0.5,
        ) {
            let hours: Vec<HourlyResult> = values.iter()
                .enumerate()
                .map(|(i, (p, s))| hour(i as u32 % 28 + 1, *p, *s, price, compensation, 0.0))
                .collect();
            let bill = calculate_bill(2024, 3, &hours, &offer(), 0.0);

            prop_assert!(bill.surplus_compensation <= bill.energy_cost + 1e-12);
            prop_assert!(bill.total >= -1e-9);
        }
    }
}
