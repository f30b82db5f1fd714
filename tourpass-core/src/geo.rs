//! Great-circle geometry on a spherical earth.
use serde::{Deserialize, Serialize};

use crate::constants::EARTH_RADIUS_M;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the usual latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// `lat,lng` form accepted by most directions services.
    #[must_use]
    pub fn as_query(self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// Haversine distance in meters.
#[must_use]
pub fn distance_m(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAIBUTSU: Coordinate = Coordinate::new(35.3167, 139.5358);
    const SHRINE: Coordinate = Coordinate::new(35.2993, 139.4804);

    #[test]
    fn distance_to_self_is_zero() {
        assert!(distance_m(DAIBUTSU, DAIBUTSU).abs() < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let there = distance_m(DAIBUTSU, SHRINE);
        let back = distance_m(SHRINE, DAIBUTSU);
        assert!((there - back).abs() < 1e-6);
        // roughly 5.4 km apart
        assert!((5_000.0..6_000.0).contains(&there), "got {there}");
    }

    #[test]
    fn one_millidegree_of_latitude_is_about_111_meters() {
        let north = Coordinate::new(DAIBUTSU.lat + 0.001, DAIBUTSU.lng);
        let d = distance_m(DAIBUTSU, north);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[test]
    fn validity_rejects_out_of_range() {
        assert!(SHRINE.is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert_eq!(Coordinate::new(1.5, 2.0).as_query(), "1.5,2");
    }
}
