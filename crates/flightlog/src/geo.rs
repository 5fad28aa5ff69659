//! Coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Equatorial circumference of the Earth in statute miles.
pub const EARTH_CIRCUMFERENCE_MILES: f64 = 24_901.0;

/// A `(longitude, latitude)` pair in degrees.
///
/// Serialized as a two-element `[lon, lat]` array, the GeoJSON position order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinates {
    /// Longitude in degrees, east positive.
    pub lon: f64,
    /// Latitude in degrees, north positive.
    pub lat: f64,
}

impl Coordinates {
    /// Create a coordinate pair from longitude and latitude.
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Whether both components are finite and within geographic bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Key for exact-equality comparison, treating `-0.0` and `0.0` alike.
    #[must_use]
    pub(crate) fn exact_key(&self) -> (u64, u64) {
        ((self.lon + 0.0).to_bits(), (self.lat + 0.0).to_bits())
    }
}

impl From<[f64; 2]> for Coordinates {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinates> for [f64; 2] {
    fn from(c: Coordinates) -> Self {
        [c.lon, c.lat]
    }
}

/// Haversine distance between two points, in miles, unrounded.
#[must_use]
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Great-circle distance rounded to the nearest whole mile.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn distance_miles(a: Coordinates, b: Coordinates) -> u32 {
    // Bounded by half the circumference, so the cast cannot overflow.
    haversine_miles(a, b).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const JFK: Coordinates = Coordinates::new(-73.7781, 40.6413);
    const LHR: Coordinates = Coordinates::new(-0.4543, 51.4700);
    const CDG: Coordinates = Coordinates::new(2.5479, 49.0097);
    const SYD: Coordinates = Coordinates::new(151.1772, -33.9399);

    #[test]
    fn test_distance_jfk_lhr() {
        let d = distance_miles(JFK, LHR);
        assert!((3440..=3460).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_lhr_cdg() {
        let d = distance_miles(LHR, CDG);
        assert!((210..=220).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        for (a, b) in [(JFK, LHR), (LHR, CDG), (JFK, SYD), (SYD, CDG)] {
            assert_eq!(distance_miles(a, b), distance_miles(b, a));
        }
    }

    #[test]
    fn test_distance_is_deterministic() {
        assert_eq!(distance_miles(JFK, SYD), distance_miles(JFK, SYD));
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        assert_eq!(distance_miles(CDG, CDG), 0);
    }

    #[test]
    fn test_antipodes_are_half_circumference() {
        let d = haversine_miles(Coordinates::new(0.0, 0.0), Coordinates::new(180.0, 0.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_MILES).abs() < 1e-6);
    }

    #[test]
    fn test_coordinates_serialize_as_array() {
        let json = serde_json::to_string(&Coordinates::new(-73.5, 40.25)).unwrap();
        assert_eq!(json, "[-73.5,40.25]");

        let back: Coordinates = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Coordinates::new(-73.5, 40.25));
    }

    #[test]
    fn test_coordinates_is_valid() {
        assert!(JFK.is_valid());
        assert!(!Coordinates::new(190.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -91.0).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_exact_key_normalizes_negative_zero() {
        assert_eq!(
            Coordinates::new(-0.0, 0.0).exact_key(),
            Coordinates::new(0.0, -0.0).exact_key()
        );
    }
}
