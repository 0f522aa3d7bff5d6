use serde::Deserialize;

use crate::models::Coordinate;

/// What the client's geolocation source reported.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum LocationReport {
    Position { lat: f64, lng: f64 },
    Denied { denied: bool },
}

impl LocationReport {
    /// The coordinate to use as the reference location.
    ///
    /// Denials and unusable positions fall back without surfacing an error.
    pub fn resolve(self, fallback: Coordinate) -> Coordinate {
        match self {
            LocationReport::Position { lat, lng } if lat.is_finite() && lng.is_finite() => {
                Coordinate::new(lat, lng)
            }
            LocationReport::Position { lat, lng } => {
                tracing::warn!(lat, lng, "unusable position reported, using fallback");
                fallback
            }
            LocationReport::Denied { .. } => {
                tracing::info!("geolocation unavailable, using fallback location");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FALLBACK_LOCATION;

    #[test]
    fn position_is_used_as_is() {
        let report: LocationReport = serde_json::from_str(r#"{"lat": 1.5, "lng": -2.0}"#).unwrap();
        assert_eq!(report.resolve(FALLBACK_LOCATION), Coordinate::new(1.5, -2.0));
    }

    #[test]
    fn denial_uses_fallback() {
        let report: LocationReport = serde_json::from_str(r#"{"denied": true}"#).unwrap();
        assert_eq!(report.resolve(FALLBACK_LOCATION), FALLBACK_LOCATION);
    }

    #[test]
    fn non_finite_position_uses_fallback() {
        let report = LocationReport::Position {
            lat: f64::NAN,
            lng: 0.0,
        };
        assert_eq!(report.resolve(FALLBACK_LOCATION), FALLBACK_LOCATION);
    }
}
