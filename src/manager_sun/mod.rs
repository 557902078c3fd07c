/// Sun position above the horizon, both angles in degrees. Azimuth is measured clockwise
/// from north, i.e. 90 is east and 180 is south.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunPosition {
    pub elevation: f64,
    pub azimuth: f64,
}

/// Day of year used for a whole month, the middle of the month
///
/// # Arguments
///
/// * 'month' - month 1-12
pub fn mid_month_day_of_year(month: u32) -> f64 {
    (month.clamp(1, 12) - 1) as f64 * 30.4 + 15.0
}

/// Calculates the declination with the single harmonic approximation
/// 23.45 * sin(360/365 * (284 + day))
///
/// # Arguments
///
/// * 'day_of_year' - day of year, 1 being January 1st
pub fn get_declination(day_of_year: f64) -> f64 {
    23.45 * (360.0 / 365.0 * (284.0 + day_of_year)).to_radians().sin()
}

/// Hour angle for the middle of the given hour, assuming local clock time equals solar time
/// shifted half an hour. Negative before noon.
///
/// # Arguments
///
/// * 'hour' - hour 1-24, where hour N is the interval [N-1, N)
pub fn get_hour_angle(hour: u32) -> f64 {
    (hour as f64 - 12.5) * 15.0
}

/// Calculates the sun elevation and azimuth for the middle of a month. Returns None when the sun
/// is at or below the horizon.
///
/// The fixed half hour offset in the hour angle is a screening level approximation, there is
/// no equation of time or longitude correction.
///
/// # Arguments
///
/// * 'hour' - hour 1-24
/// * 'month' - month 1-12
/// * 'lat' - the latitude given in decimal format
pub fn get_elevation_and_azimuth(hour: u32, month: u32, lat: f64) -> Option<SunPosition> {
    let declination = get_declination(mid_month_day_of_year(month)).to_radians();
    let hour_angle = get_hour_angle(hour);
    let lat_r = lat.to_radians();

    let sin_elev = lat_r.sin() * declination.sin() + lat_r.cos() * declination.cos() * hour_angle.to_radians().cos();
    let elevation = sin_elev.clamp(-1.0, 1.0).asin();
    if elevation <= 0.0 {
        return None;
    }

    let denominator = elevation.cos() * lat_r.cos();
    let cos_azimuth = if denominator.abs() < 1e-12 {
        1.0
    } else {
        (declination.sin() - elevation.sin() * lat_r.sin()) / denominator
    };
    let mut azimuth = cos_azimuth.clamp(-1.0, 1.0).acos().to_degrees();
    if hour_angle > 0.0 {
        azimuth = 360.0 - azimuth;
    }

    Some(SunPosition { elevation: elevation.to_degrees(), azimuth })
}
