//! # Coordinates and Distances
//!
//! WGS84 latitude/longitude pairs and great-circle distance via the
//! haversine formula on a spherical Earth.

use serde::Serialize;

use crate::error::ValidationError;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Build coordinates, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build coordinates from optional parts. Both absent is `Ok(None)`;
    /// exactly one present is [`ValidationError::IncompleteCoordinates`].
    pub fn from_parts(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, ValidationError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => Self::new(lat, lon).map(Some),
            (None, None) => Ok(None),
            _ => Err(ValidationError::IncompleteCoordinates),
        }
    }

    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        // Rounding can push `a` a hair above 1 for antipodal points.
        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }
}

/// Check a search radius: finite and non-negative.
pub fn validate_radius(radius_km: f64) -> Result<f64, ValidationError> {
    if radius_km.is_finite() && radius_km >= 0.0 {
        Ok(radius_km)
    } else {
        Err(ValidationError::InvalidRadius(radius_km))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lisbon() -> Coordinates {
        Coordinates::new(38.7223, -9.1393).unwrap()
    }

    fn porto() -> Coordinates {
        Coordinates::new(41.1579, -8.6291).unwrap()
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(
            Coordinates::new(90.5, 0.0),
            Err(ValidationError::LatitudeOutOfRange(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, -180.5),
            Err(ValidationError::LongitudeOutOfRange(_))
        ));
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn from_parts_requires_both_or_neither() {
        assert_eq!(Coordinates::from_parts(None, None).unwrap(), None);
        assert!(Coordinates::from_parts(Some(38.0), Some(-9.0)).unwrap().is_some());
        assert_eq!(
            Coordinates::from_parts(Some(38.0), None),
            Err(ValidationError::IncompleteCoordinates)
        );
    }

    #[test]
    fn lisbon_to_porto_is_about_274_km() {
        let d = lisbon().distance_km(&porto());
        assert!((d - 274.0).abs() < 3.0, "got {d}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(lisbon().distance_km(&lisbon()), 0.0);
    }

    #[test]
    fn antipodal_distance_is_half_circumference() {
        let a = Coordinates::new(0.0, 0.0).unwrap();
        let b = Coordinates::new(0.0, 180.0).unwrap();
        let expected = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((a.distance_km(&b) - expected).abs() < 1e-6);
    }

    #[test]
    fn radius_validation() {
        assert_eq!(validate_radius(0.0).unwrap(), 0.0);
        assert!(validate_radius(-0.1).is_err());
        assert!(validate_radius(f64::NAN).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn coords() -> impl Strategy<Value = Coordinates> {
        (-90.0f64..=90.0, -180.0f64..=180.0)
            .prop_map(|(lat, lon)| Coordinates::new(lat, lon).unwrap())
    }

    proptest! {
        /// Distance is symmetric.
        #[test]
        fn distance_symmetric(a in coords(), b in coords()) {
            let ab = a.distance_km(&b);
            let ba = b.distance_km(&a);
            prop_assert!((ab - ba).abs() < 1e-6, "{} vs {}", ab, ba);
        }

        /// Distance is bounded by half the circumference and never negative.
        #[test]
        fn distance_bounded(a in coords(), b in coords()) {
            let d = a.distance_km(&b);
            prop_assert!(d >= 0.0);
            prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
        }

        /// A point is always within any non-negative radius of itself.
        #[test]
        fn self_within_any_radius(a in coords(), r in 0.0f64..20_000.0) {
            prop_assert!(a.distance_km(&a) <= r);
        }
    }
}
