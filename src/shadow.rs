use std::f64::consts::PI;
use crate::manager_sun::SunPosition;
use crate::models::installation::PanelGroup;
use crate::models::obstacle::Obstacle;

/// Calculates the share of direct production left for a panel group given the sun position and
/// the obstacles around the group. 1.0 means no shading, 0.0 means fully shaded.
///
/// Obstacles combine multiplicatively, each one reducing what the previous ones left.
///
/// # Arguments
///
/// * 'group' - the panel group with its obstacles
/// * 'sun' - sun position, None if the sun is below the horizon
pub fn shadow_factor(group: &PanelGroup, sun: Option<SunPosition>) -> f64 {
    let Some(sun) = sun else {
        return 1.0;
    };

    group.obstacles
        .iter()
        .map(|o| 1.0 - obstacle_shade(group, o, sun) * (1.0 - o.kind.transparency()))
        .product::<f64>()
        .clamp(0.0, 1.0)
}

/// Calculates how much a single obstacle shades the group, before transparency is considered.
/// The result is the shaded share of the panel height weighted by how centered the sun is
/// behind the obstacle.
///
/// # Arguments
///
/// * 'group' - the panel group
/// * 'obstacle' - the obstacle to evaluate
/// * 'sun' - the sun position
pub fn obstacle_shade(group: &PanelGroup, obstacle: &Obstacle, sun: SunPosition) -> f64 {
    if obstacle.distance_m <= 0.0 || obstacle.width_m <= 0.0 {
        return 0.0;
    }

    let half_width = (obstacle.width_m / 2.0 / obstacle.distance_m).atan().to_degrees();
    let angular_distance = azimuth_distance(sun.azimuth, obstacle.center_azimuth_deg);
    if angular_distance > half_width {
        return 0.0;
    }

    let shadow_height = obstacle.height_m - obstacle.distance_m * sun.elevation.to_radians().tan();
    if shadow_height <= group.height_from_ground_m {
        return 0.0;
    }

    let shaded_fraction = shaded_fraction(group, shadow_height);
    let angular_factor = (angular_distance / half_width * PI / 2.0).cos().max(0.0);

    shaded_fraction * angular_factor
}

/// Share of the vertical extent of the panels lying below the shadow line. Without known module
/// dimensions any shadow above the ground clearance shades the whole panel.
///
/// # Arguments
///
/// * 'group' - the panel group
/// * 'shadow_height' - height above ground of the shadow line at the panel position
fn shaded_fraction(group: &PanelGroup, shadow_height: f64) -> f64 {
    let extent = group.slope_length_m()
        .map(|l| l * group.tilt_deg.to_radians().cos())
        .filter(|e| *e > 1e-9);

    match extent {
        Some(extent) => ((shadow_height - group.height_from_ground_m) / extent).clamp(0.0, 1.0),
        None => 1.0,
    }
}

/// Shortest angular distance between two azimuths, in the range [0, 180]
///
/// # Arguments
///
/// * 'a' - first azimuth in degrees
/// * 'b' - second azimuth in degrees
fn azimuth_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}
