use serde::{Deserialize, Serialize};
use crate::errors::ModelError;

/// Material of an obstacle, transparent ones (e.g. trees without leaves, fences) only
/// block part of the light
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObstacleKind {
    Solid,
    Transparent { transparency_percent: f64 },
}

impl ObstacleKind {
    /// Returns the share of light let through, 0.0 for solid obstacles
    ///
    pub fn transparency(&self) -> f64 {
        match self {
            ObstacleKind::Solid => 0.0,
            ObstacleKind::Transparent { transparency_percent } => (transparency_percent / 100.0).clamp(0.0, 1.0),
        }
    }
}

/// Canonical obstacle geometry as seen from a panel group
///
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "ObstacleRecord")]
pub struct Obstacle {
    pub name: String,
    #[serde(flatten)]
    pub kind: ObstacleKind,
    pub height_m: f64,
    pub center_azimuth_deg: f64,
    pub width_m: f64,
    pub distance_m: f64,
}

/// Obstacle as it may appear in stored configurations.
///
/// Older configurations described obstacles either by a cardinal direction instead of an
/// azimuth, or by the angular width seen from the panel instead of a physical width. Both
/// forms are converted to the canonical [`Obstacle`] here so that the shading math only ever
/// deals with azimuth and width in meters.
#[derive(Deserialize)]
pub struct ObstacleRecord {
    pub name: String,
    #[serde(flatten)]
    pub kind: Option<ObstacleKind>,
    pub height_m: f64,
    pub distance_m: f64,
    pub center_azimuth_deg: Option<f64>,
    pub direction: Option<String>,
    pub width_m: Option<f64>,
    pub angular_width_deg: Option<f64>,
}

impl TryFrom<ObstacleRecord> for Obstacle {
    type Error = ModelError;

    fn try_from(record: ObstacleRecord) -> Result<Self, Self::Error> {
        let center_azimuth_deg = match (record.center_azimuth_deg, &record.direction) {
            (Some(azimuth), _) => azimuth.rem_euclid(360.0),
            (None, Some(direction)) => cardinal_to_azimuth(direction)
                .ok_or_else(|| ModelError(format!("obstacle '{}': unknown direction '{}'", record.name, direction)))?,
            (None, None) => return Err(ModelError(format!("obstacle '{}': missing azimuth", record.name))),
        };

        let width_m = match (record.width_m, record.angular_width_deg) {
            (Some(width), _) => width,
            (None, Some(angular)) => width_from_angle(angular, record.distance_m),
            (None, None) => return Err(ModelError(format!("obstacle '{}': missing width", record.name))),
        };

        Ok(Obstacle {
            name: record.name,
            kind: record.kind.unwrap_or(ObstacleKind::Solid),
            height_m: record.height_m,
            center_azimuth_deg,
            width_m,
            distance_m: record.distance_m,
        })
    }
}

/// Translates a compass direction (N, NE, E, ... , NNW) to an azimuth where 0 is north
/// and 180 is south
///
/// # Arguments
///
/// * 'direction' - the compass direction, case insensitive
fn cardinal_to_azimuth(direction: &str) -> Option<f64> {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE",
        "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
    ];
    let upper = direction.trim().to_uppercase();

    POINTS.iter().position(|p| *p == upper).map(|i| i as f64 * 22.5)
}

/// Physical width that spans the given angle when seen from the given distance
///
/// # Arguments
///
/// * 'angular_width_deg' - full angular width in degrees
/// * 'distance_m' - distance from the panel to the obstacle
fn width_from_angle(angular_width_deg: f64, distance_m: f64) -> f64 {
    2.0 * distance_m * (angular_width_deg / 2.0).to_radians().tan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_obstacle_is_kept_as_is() {
        let json = r#"{"name":"tree","type":"transparent","transparency_percent":40.0,
            "height_m":8.0,"distance_m":10.0,"center_azimuth_deg":200.0,"width_m":4.0}"#;
        let obstacle: Obstacle = serde_json::from_str(json).unwrap();

        assert_eq!(obstacle.center_azimuth_deg, 200.0);
        assert_eq!(obstacle.width_m, 4.0);
        assert_eq!(obstacle.kind, ObstacleKind::Transparent { transparency_percent: 40.0 });
        assert!((obstacle.kind.transparency() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn legacy_cardinal_direction_is_normalized() {
        let json = r#"{"name":"house","height_m":6.0,"distance_m":12.0,"direction":"sw","width_m":9.0}"#;
        let obstacle: Obstacle = serde_json::from_str(json).unwrap();

        assert_eq!(obstacle.center_azimuth_deg, 225.0);
        assert_eq!(obstacle.kind, ObstacleKind::Solid);
    }

    #[test]
    fn legacy_angular_width_is_normalized() {
        let json = r#"{"name":"wall","height_m":3.0,"distance_m":5.0,"center_azimuth_deg":180.0,"angular_width_deg":90.0}"#;
        let obstacle: Obstacle = serde_json::from_str(json).unwrap();

        assert!((obstacle.width_m - 10.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let json = r#"{"name":"x","height_m":3.0,"distance_m":5.0,"direction":"up","width_m":1.0}"#;

        assert!(serde_json::from_str::<Obstacle>(json).is_err());
    }
}
