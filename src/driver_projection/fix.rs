use chrono::{DateTime, Utc};

use crate::model::{Envelope, GeoPoint};
use crate::router::EnvelopeError;

/// One position report for a driver, decoded from a `driver_location` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub position: GeoPoint,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub accuracy: Option<f64>,
    /// Server-provided minutes to arrival (`estimatedMinutes`).
    pub estimated_minutes: Option<f64>,
    pub at: DateTime<Utc>,
}

impl LocationFix {
    /// Decodes `(driver_id, fix)` from a `driver_location` envelope.
    pub fn from_envelope(envelope: &Envelope) -> Result<(String, Self), EnvelopeError> {
        let driver_id = envelope
            .driver_id()
            .ok_or(EnvelopeError::MissingField("driverId"))?
            .to_string();
        let position = GeoPoint::from_json(&envelope.data).ok_or_else(|| EnvelopeError::InvalidField {
            field: "latitude",
            reason: "missing or out-of-range coordinates".into(),
        })?;

        let fix = LocationFix {
            position,
            heading: envelope.data_f64("heading"),
            speed: envelope.data_f64("speed"),
            accuracy: envelope.data_f64("accuracy"),
            estimated_minutes: envelope
                .data_f64("estimatedMinutes")
                .filter(|minutes| *minutes >= 0.0),
            at: envelope.timestamp,
        };
        Ok((driver_id, fix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_short_coordinate_form() {
        let envelope = Envelope {
            driver_id: Some("d1".into()),
            ..Envelope::new("driver_location", json!({"lat": 40.7580, "lng": -73.9855, "estimatedMinutes": 12}))
        };
        let (driver_id, fix) = LocationFix::from_envelope(&envelope).unwrap();
        assert_eq!(driver_id, "d1");
        assert_eq!(fix.position, GeoPoint::new(40.7580, -73.9855));
        assert_eq!(fix.estimated_minutes, Some(12.0));
    }

    #[test]
    fn requires_driver_and_coordinates() {
        let no_driver = Envelope::new("driver_location", json!({"lat": 1.0, "lng": 1.0}));
        assert_eq!(
            LocationFix::from_envelope(&no_driver),
            Err(EnvelopeError::MissingField("driverId"))
        );

        let no_coords = Envelope::new("driver_location", json!({"driverId": "d1"}));
        assert!(matches!(
            LocationFix::from_envelope(&no_coords),
            Err(EnvelopeError::InvalidField { field: "latitude", .. })
        ));
    }
}
