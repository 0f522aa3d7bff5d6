use crate::models::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometers (haversine).
///
/// Inputs are degrees and are not range-checked.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn within_radius(point: Coordinate, center: Coordinate, max_radius_km: f64) -> bool {
    distance_km(point, center) <= max_radius_km
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAZZ_FESTIVAL: Coordinate = Coordinate::new(-17.8249, 31.0498);
    const HARARE: Coordinate = Coordinate::new(-17.8216, 31.0492);
    const BULAWAYO: Coordinate = Coordinate::new(-20.1559, 28.5813);

    #[test]
    fn identity_is_zero() {
        for point in [JAZZ_FESTIVAL, HARARE, BULAWAYO, Coordinate::new(89.9, -179.9)] {
            assert_eq!(distance_km(point, point), 0.0);
        }
    }

    #[test]
    fn symmetric() {
        let forward = distance_km(HARARE, BULAWAYO);
        let backward = distance_km(BULAWAYO, HARARE);
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn harare_fixtures() {
        let near = distance_km(JAZZ_FESTIVAL, HARARE);
        assert!(near > 0.0 && near < 1.0, "got {near}");

        let far = distance_km(HARARE, BULAWAYO);
        assert!(far > 300.0 && far < 500.0, "got {far}");
    }

    #[test]
    fn triangle_inequality_holds() {
        let ab = distance_km(JAZZ_FESTIVAL, HARARE);
        let bc = distance_km(HARARE, BULAWAYO);
        let ac = distance_km(JAZZ_FESTIVAL, BULAWAYO);
        assert!(ac <= ab + bc + 1e-9);
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = distance_km(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn radius_check() {
        assert!(within_radius(JAZZ_FESTIVAL, HARARE, 10.0));
        assert!(!within_radius(BULAWAYO, HARARE, 10.0));
    }
}
