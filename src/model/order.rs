use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::geo::GeoPoint;

/// Order lifecycle status.
///
/// The forward lifecycle is totally ordered:
/// `confirmed → preparing → ready → picked_up → on_the_way → delivered`.
/// `cancelled` sits outside that order and is reachable from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Confirmed,
    Preparing,
    Ready,
    PickedUp,
    OnTheWay,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The forward lifecycle, in order.
    pub const LIFECYCLE: [OrderStatus; 6] = [
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::PickedUp,
        OrderStatus::OnTheWay,
        OrderStatus::Delivered,
    ];

    /// Position in [`OrderStatus::LIFECYCLE`]; `None` for `Cancelled`.
    pub fn index(self) -> Option<usize> {
        Self::LIFECYCLE.iter().position(|s| *s == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::OnTheWay => "on_the_way",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Decides what an incoming status does to the stored one.
    pub fn evaluate(self, incoming: OrderStatus) -> StatusChange {
        if self.is_terminal() {
            return if incoming == self {
                StatusChange::Unchanged
            } else {
                StatusChange::Discarded(DiscardReason::AlreadyTerminal)
            };
        }
        if incoming == OrderStatus::Cancelled {
            return StatusChange::Cancelled;
        }
        match (self.index(), incoming.index()) {
            (Some(current), Some(next)) if next < current => {
                StatusChange::Discarded(DiscardReason::Regression)
            }
            (Some(current), Some(next)) if next == current => StatusChange::Unchanged,
            _ => StatusChange::Advanced,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::LIFECYCLE
            .into_iter()
            .chain([OrderStatus::Cancelled])
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status: {s}"))
    }
}

/// Result of evaluating a status update against the stored status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Advanced,
    Unchanged,
    Cancelled,
    Discarded(DiscardReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Lower lifecycle index than the stored status (stale or replayed event).
    Regression,
    AlreadyTerminal,
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::Regression => f.write_str("status regression"),
            DiscardReason::AlreadyTerminal => f.write_str("order already terminal"),
        }
    }
}

/// Courier details attached to an order on first assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle_type: Option<String>,
    pub license_plate: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EtaSource {
    /// `estimatedMinutes` reported by the server.
    Server,
    /// Great-circle distance at an assumed average speed.
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eta {
    pub minutes: f64,
    pub source: EtaSource,
    pub computed_at: DateTime<Utc>,
}

/// Last-known state of one order, derived from the event stream.
///
/// The assigned driver is referenced by id only; their position lives in the
/// driver location projection.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderProjection {
    pub order_id: String,
    pub status: OrderStatus,
    pub driver_id: Option<String>,
    pub driver_info: Option<DriverInfo>,
    pub eta: Option<Eta>,
    pub destination: Option<GeoPoint>,
    pub last_updated: DateTime<Utc>,
}

impl OrderProjection {
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: OrderStatus::Confirmed,
            driver_id: None,
            driver_info: None,
            eta: None,
            destination: None,
            last_updated: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_destination(mut self, destination: GeoPoint) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn has_driver(&self) -> bool {
        self.driver_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_statuses() -> Vec<OrderStatus> {
        OrderStatus::LIFECYCLE
            .into_iter()
            .chain([OrderStatus::Cancelled])
            .collect()
    }

    fn apply(current: OrderStatus, incoming: OrderStatus) -> OrderStatus {
        match current.evaluate(incoming) {
            StatusChange::Advanced | StatusChange::Cancelled => incoming,
            StatusChange::Unchanged | StatusChange::Discarded(_) => current,
        }
    }

    #[test]
    fn lifecycle_index_is_ordered() {
        for (i, status) in OrderStatus::LIFECYCLE.iter().enumerate() {
            assert_eq!(status.index(), Some(i));
        }
        assert_eq!(OrderStatus::Cancelled.index(), None);
    }

    #[test]
    fn regressions_are_discarded() {
        assert_eq!(
            OrderStatus::Ready.evaluate(OrderStatus::Preparing),
            StatusChange::Discarded(DiscardReason::Regression)
        );
        assert_eq!(OrderStatus::Ready.evaluate(OrderStatus::Ready), StatusChange::Unchanged);
        assert_eq!(OrderStatus::Ready.evaluate(OrderStatus::OnTheWay), StatusChange::Advanced);
    }

    #[test]
    fn cancel_from_any_non_terminal_status() {
        for status in OrderStatus::LIFECYCLE.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(status.evaluate(OrderStatus::Cancelled), StatusChange::Cancelled);
        }
        assert_eq!(
            OrderStatus::Delivered.evaluate(OrderStatus::Cancelled),
            StatusChange::Discarded(DiscardReason::AlreadyTerminal)
        );
        assert_eq!(
            OrderStatus::Cancelled.evaluate(OrderStatus::Preparing),
            StatusChange::Discarded(DiscardReason::AlreadyTerminal)
        );
    }

    /// Every sequence of three updates keeps the index non-decreasing,
    /// except for moves into `cancelled`.
    #[test]
    fn index_never_decreases_over_all_short_sequences() {
        let statuses = all_statuses();
        for a in &statuses {
            for b in &statuses {
                for c in &statuses {
                    let mut current = OrderStatus::Confirmed;
                    for incoming in [*a, *b, *c] {
                        let next = apply(current, incoming);
                        if next != OrderStatus::Cancelled {
                            assert!(
                                next.index() >= current.index(),
                                "{current} -> {next} after {incoming}"
                            );
                        }
                        current = next;
                    }
                }
            }
        }
    }

    #[test]
    fn status_round_trips_through_wire_name() {
        for status in all_statuses() {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}
