use serde::{Deserialize, Serialize};
use serde_json::Value;

const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reads `{latitude, longitude}` or the short `{lat, lng}` form.
    pub fn from_json(value: &Value) -> Option<Self> {
        let coord = |long: &str, short: &str| {
            value
                .get(long)
                .or_else(|| value.get(short))
                .and_then(Value::as_f64)
        };
        let latitude = coord("latitude", "lat")?;
        let longitude = coord("longitude", "lng")?;
        ((-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude))
            .then_some(Self { latitude, longitude })
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Travel time in minutes at `speed_kmh`. `None` for a non-positive speed.
    pub fn travel_minutes(&self, other: &GeoPoint, speed_kmh: f64) -> Option<f64> {
        (speed_kmh > 0.0).then(|| self.distance_km(other) / speed_kmh * 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_long_and_short_coordinate_names() {
        let long = serde_json::json!({"latitude": 40.7580, "longitude": -73.9855});
        let short = serde_json::json!({"lat": 40.7580, "lng": -73.9855});
        assert_eq!(GeoPoint::from_json(&long), GeoPoint::from_json(&short));
        assert!(GeoPoint::from_json(&serde_json::json!({"lat": 91.0, "lng": 0.0})).is_none());
        assert!(GeoPoint::from_json(&serde_json::json!({"lat": 1.0})).is_none());
    }

    #[test]
    fn distance_between_identical_points_is_zero() {
        let p = GeoPoint::new(40.7580, -73.9855);
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn times_square_to_empire_state() {
        let times_square = GeoPoint::new(40.7580, -73.9855);
        let empire_state = GeoPoint::new(40.7484, -73.9857);
        let km = times_square.distance_km(&empire_state);
        assert!((km - 1.07).abs() < 0.02, "got {km}");
    }

    #[test]
    fn travel_minutes_at_thirty_kmh() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 0.0899322); // ~10 km along the equator
        let minutes = a.travel_minutes(&b, 30.0).unwrap();
        assert!((minutes - 20.0).abs() < 0.1, "got {minutes}");
        assert_eq!(a.travel_minutes(&b, 0.0), None);
    }
}
