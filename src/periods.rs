use chrono::{Datelike, NaiveDate, Weekday};
use crate::errors::ScheduleError;
use crate::models::tariff::{DateRange, MonthDay, TariffSchedule, TimeSlot, WeekendBehavior};

pub const FLAT: &str = "flat";
pub const PUNTA: &str = "punta";
pub const LLANO: &str = "llano";
pub const VALLE: &str = "valle";
pub const UNKNOWN: &str = "unknown";

/// Fixed date national holidays (month, day), billed as off-peak all day
const NATIONAL_HOLIDAYS: [(u32, u32); 9] = [
    (1, 1), (1, 6), (5, 1), (8, 15), (10, 12), (11, 1), (12, 6), (12, 8), (12, 25),
];

/// Leap year used when checking that date ranges cover all 366 possible days
const VALIDATION_YEAR: i32 = 2024;

/// True if the given date is a Saturday or Sunday
///
/// # Arguments
///
/// * 'date' - the date to check
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// True if the given date is one of the fixed date national holidays
///
/// # Arguments
///
/// * 'date' - the date to check
pub fn is_holiday(date: NaiveDate) -> bool {
    NATIONAL_HOLIDAYS.contains(&(date.month(), date.day()))
}

/// Resolves which price period applies to the given date and hour.
///
/// This is a total function: an hour no custom time slot covers resolves to `"unknown"`, which
/// prices at zero further down the line.
///
/// # Arguments
///
/// * 'schedule' - the tariff schedule
/// * 'date' - the local date
/// * 'hour' - hour 1-24, hour N being the interval [N-1, N)
pub fn resolve_period(schedule: &TariffSchedule, date: NaiveDate, hour: u32) -> &str {
    match schedule {
        TariffSchedule::Flat => FLAT,
        TariffSchedule::Regulated => regulated_energy_period(date, hour),
        TariffSchedule::RegulatedPower => regulated_power_period(date, hour),
        TariffSchedule::Custom { ranges } => custom_period(ranges, date, hour),
    }
}

/// Regulated 3-period residential energy schedule
fn regulated_energy_period(date: NaiveDate, hour: u32) -> &'static str {
    if is_weekend(date) || is_holiday(date) {
        return VALLE;
    }
    match hour {
        1..=8 => VALLE,
        11..=14 | 19..=22 => PUNTA,
        _ => LLANO,
    }
}

/// Regulated 2-period schedule for the contracted power term
fn regulated_power_period(date: NaiveDate, hour: u32) -> &'static str {
    if is_weekend(date) || is_holiday(date) {
        return VALLE;
    }
    match hour {
        1..=8 => VALLE,
        _ => PUNTA,
    }
}

fn custom_period(ranges: &[DateRange], date: NaiveDate, hour: u32) -> &str {
    let month_day = MonthDay::new(date.month(), date.day());
    let Some(range) = ranges.iter().find(|r| range_contains(r, month_day)) else {
        return UNKNOWN;
    };

    if let WeekendBehavior::Specific(slot) = &range.weekend {
        if is_weekend(date) || is_holiday(date) {
            return slot;
        }
    }

    let Some(clock_hour) = hour.checked_sub(1) else {
        return UNKNOWN;
    };

    range.slots
        .iter()
        .find(|s| slot_contains(s, clock_hour))
        .map_or(UNKNOWN, |s| s.name.as_str())
}

/// True if the date range covers the given month and day, wrapping over new year when the end
/// lies before the start
///
/// # Arguments
///
/// * 'range' - the date range
/// * 'month_day' - month and day to check
pub fn range_contains(range: &DateRange, month_day: MonthDay) -> bool {
    if range.start <= range.end {
        range.start <= month_day && month_day <= range.end
    } else {
        month_day >= range.start || month_day <= range.end
    }
}

/// True if the time slot covers the given 0-based clock hour, wrapping over midnight when the end
/// lies before the start. A slot with equal start and end covers nothing.
///
/// # Arguments
///
/// * 'slot' - the time slot
/// * 'clock_hour' - hour 0-23
pub fn slot_contains(slot: &TimeSlot, clock_hour: u32) -> bool {
    if slot.start_hour < slot.end_hour {
        slot.start_hour <= clock_hour && clock_hour < slot.end_hour
    } else if slot.start_hour > slot.end_hour {
        clock_hour >= slot.start_hour || clock_hour < slot.end_hour
    } else {
        false
    }
}

/// Checks that a schedule is well formed. For custom schedules the date ranges must cover every
/// day of a leap year exactly once, and within every date range the time slots must cover every
/// hour of the day exactly once.
///
/// # Arguments
///
/// * 'schedule' - the schedule to check
pub fn validate_schedule(schedule: &TariffSchedule) -> Result<(), ScheduleError> {
    let TariffSchedule::Custom { ranges } = schedule else {
        return Ok(());
    };

    for (i, range) in ranges.iter().enumerate() {
        validate_bounds(i, range)?;
    }

    let mut day = NaiveDate::from_ymd_opt(VALIDATION_YEAR, 1, 1);
    while let Some(date) = day.filter(|d| d.year() == VALIDATION_YEAR) {
        let month_day = MonthDay::new(date.month(), date.day());
        let count = ranges.iter().filter(|r| range_contains(r, month_day)).count();
        match count {
            0 => return Err(ScheduleError::DayNotCovered { month: month_day.month, day: month_day.day }),
            1 => {}
            _ => return Err(ScheduleError::DayOverlap { month: month_day.month, day: month_day.day, count }),
        }
        day = date.succ_opt();
    }

    for (i, range) in ranges.iter().enumerate() {
        for hour in 0..24 {
            let count = range.slots.iter().filter(|s| slot_contains(s, hour)).count();
            match count {
                0 => return Err(ScheduleError::HourNotCovered { range: i, hour }),
                1 => {}
                _ => return Err(ScheduleError::HourOverlap { range: i, hour, count }),
            }
        }
    }

    Ok(())
}

fn validate_bounds(index: usize, range: &DateRange) -> Result<(), ScheduleError> {
    let invalid = |reason: String| ScheduleError::InvalidBound { range: index, reason };

    for md in [range.start, range.end] {
        if NaiveDate::from_ymd_opt(VALIDATION_YEAR, md.month, md.day).is_none() {
            return Err(invalid(format!("{:02}-{:02} is not a calendar day", md.month, md.day)));
        }
    }
    for slot in &range.slots {
        if slot.start_hour > 23 || slot.end_hour < 1 || slot.end_hour > 24 {
            return Err(invalid(format!("slot '{}' spans {}-{}", slot.name, slot.start_hour, slot.end_hour)));
        }
    }
    if let WeekendBehavior::Specific(name) = &range.weekend {
        if name.trim().is_empty() {
            return Err(invalid("weekend slot has no name".to_string()));
        }
    }

    Ok(())
}
