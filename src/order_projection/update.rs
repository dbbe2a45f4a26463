//! Updates folded into an [`OrderProjection`](crate::model::OrderProjection),
//! and their decoding from wire envelopes.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::driver_projection::LocationFix;
use crate::model::{DriverInfo, Envelope, GeoPoint, OrderStatus};
use crate::router::EnvelopeError;

/// A driver being attached to an order.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverAssignment {
    pub driver_id: String,
    pub info: Option<DriverInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderUpdate {
    /// `order_update`: a status change, optionally carrying driver and destination.
    Status {
        status: OrderStatus,
        driver: Option<DriverAssignment>,
        destination: Option<GeoPoint>,
        at: DateTime<Utc>,
    },
    /// `driver_assignment`.
    AssignDriver {
        assignment: DriverAssignment,
        at: DateTime<Utc>,
    },
    /// A position report from the assigned driver; recomputes the ETA.
    DriverPosition {
        driver_id: String,
        position: GeoPoint,
        estimated_minutes: Option<f64>,
        speed_kmh: f64,
        at: DateTime<Utc>,
    },
}

impl OrderUpdate {
    /// Decodes `(order_id, update)` from an `order_update` envelope.
    pub fn from_order_update(envelope: &Envelope) -> Result<(String, Self), EnvelopeError> {
        let order_id = required_order_id(envelope)?;
        let raw = envelope
            .data_str("status")
            .ok_or(EnvelopeError::MissingField("status"))?;
        let status = raw.parse::<OrderStatus>().map_err(|_| EnvelopeError::UnrecognizedValue {
            field: "status",
            value: raw.to_string(),
        })?;

        let update = OrderUpdate::Status {
            status,
            driver: assignment(envelope),
            destination: destination(&envelope.data),
            at: envelope.timestamp,
        };
        Ok((order_id, update))
    }

    /// Decodes `(order_id, update)` from a `driver_assignment` envelope.
    pub fn from_driver_assignment(envelope: &Envelope) -> Result<(String, Self), EnvelopeError> {
        let order_id = required_order_id(envelope)?;
        let assignment = assignment(envelope).ok_or(EnvelopeError::MissingField("driverId"))?;
        Ok((order_id, OrderUpdate::AssignDriver { assignment, at: envelope.timestamp }))
    }

    /// ETA recomputation for whichever orders `driver_id` is delivering.
    pub fn from_fix(driver_id: impl Into<String>, fix: &LocationFix, speed_kmh: f64) -> Self {
        OrderUpdate::DriverPosition {
            driver_id: driver_id.into(),
            position: fix.position,
            estimated_minutes: fix.estimated_minutes,
            speed_kmh,
            at: fix.at,
        }
    }
}

fn required_order_id(envelope: &Envelope) -> Result<String, EnvelopeError> {
    envelope
        .order_id()
        .map(str::to_string)
        .ok_or(EnvelopeError::MissingField("orderId"))
}

fn assignment(envelope: &Envelope) -> Option<DriverAssignment> {
    let driver_id = envelope.driver_id()?.to_string();
    let info = envelope
        .data
        .get("driverInfo")
        .or_else(|| envelope.data.get("driver"))
        .and_then(|raw| serde_json::from_value::<DriverInfo>(raw.clone()).ok());
    Some(DriverAssignment { driver_id, info })
}

fn destination(data: &Value) -> Option<GeoPoint> {
    data.get("deliveryLocation")
        .and_then(GeoPoint::from_json)
        .or_else(|| {
            let latitude = data.get("deliveryLatitude")?.as_f64()?;
            let longitude = data.get("deliveryLongitude")?.as_f64()?;
            Some(GeoPoint::new(latitude, longitude))
        })
}
