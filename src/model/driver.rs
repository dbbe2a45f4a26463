use chrono::{DateTime, Utc};
use serde::Serialize;

use super::geo::GeoPoint;

/// Last reported position of one driver. Overwritten in place on every fix;
/// no history is kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverLocationProjection {
    pub driver_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    /// Minutes to arrival as reported by the server, if any.
    pub eta: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl DriverLocationProjection {
    pub fn new(driver_id: impl Into<String>) -> Self {
        Self {
            driver_id: driver_id.into(),
            latitude: 0.0,
            longitude: 0.0,
            heading: None,
            speed: None,
            accuracy: None,
            eta: None,
            last_updated: Utc::now(),
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}
