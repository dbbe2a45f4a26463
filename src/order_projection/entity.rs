//! [`Projection`] implementation for [`OrderProjection`].
//!
//! Rules enforced here:
//! - status never moves backwards along the lifecycle; stale updates are discarded,
//! - `cancelled` is accepted from any non-terminal status and is terminal,
//! - the first driver seen is kept until the order is explicitly reset,
//! - every position report from the assigned driver recomputes the ETA.

use chrono::{DateTime, Utc};

use crate::framework::{Outcome, Projection};
use crate::model::{Eta, EtaSource, OrderProjection, OrderStatus, StatusChange};

use super::update::{DriverAssignment, OrderUpdate};

impl Projection for OrderProjection {
    type Id = String;
    type Update = OrderUpdate;

    fn new(id: String) -> Self {
        Self::new(id)
    }

    fn id(&self) -> &String {
        &self.order_id
    }

    fn apply(&mut self, update: OrderUpdate) -> Result<Outcome, String> {
        match update {
            OrderUpdate::Status { status, driver, destination, at } => {
                let mut changed = match self.status.evaluate(status) {
                    StatusChange::Discarded(reason) => return Ok(Outcome::Discarded(reason.to_string())),
                    StatusChange::Unchanged => false,
                    StatusChange::Advanced | StatusChange::Cancelled => {
                        self.status = status;
                        true
                    }
                };
                if let Some(assignment) = driver {
                    changed |= self.assign(assignment);
                }
                if self.destination.is_none() && destination.is_some() {
                    self.destination = destination;
                    changed = true;
                }
                Ok(self.touch(changed, at))
            }
            OrderUpdate::AssignDriver { assignment, at } => {
                if self.status.is_terminal() {
                    return Ok(Outcome::Discarded(format!("order already {}", self.status)));
                }
                match self.driver_id.as_deref() {
                    Some(current) if current == assignment.driver_id => Ok(Outcome::Unchanged),
                    Some(current) => Ok(Outcome::Discarded(format!("driver {current} already assigned"))),
                    None => {
                        let changed = self.assign(assignment);
                        Ok(self.touch(changed, at))
                    }
                }
            }
            OrderUpdate::DriverPosition { driver_id, position, estimated_minutes, speed_kmh, at } => {
                if self.status.is_terminal() || self.driver_id.as_deref() != Some(driver_id.as_str()) {
                    return Ok(Outcome::Unchanged);
                }
                let eta = match estimated_minutes {
                    Some(minutes) => Some((minutes, EtaSource::Server)),
                    None => self
                        .destination
                        .and_then(|destination| position.travel_minutes(&destination, speed_kmh))
                        .map(|minutes| (minutes, EtaSource::Estimated)),
                };
                match eta {
                    Some((minutes, source)) => {
                        // ETA is not monotonic: traffic can push it back up.
                        self.eta = Some(Eta { minutes, source, computed_at: at });
                        Ok(self.touch(true, at))
                    }
                    None => Ok(Outcome::Unchanged),
                }
            }
        }
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl OrderProjection {
    /// Attaches the first driver seen. Returns whether anything changed.
    fn assign(&mut self, assignment: DriverAssignment) -> bool {
        if self.driver_id.is_some() || self.status == OrderStatus::Cancelled {
            return false;
        }
        self.driver_id = Some(assignment.driver_id);
        self.driver_info = assignment.info;
        true
    }

    fn touch(&mut self, changed: bool, at: DateTime<Utc>) -> Outcome {
        if changed {
            self.last_updated = at;
            Outcome::Changed
        } else {
            Outcome::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DriverInfo, GeoPoint};

    fn status(status: OrderStatus) -> OrderUpdate {
        OrderUpdate::Status { status, driver: None, destination: None, at: Utc::now() }
    }

    fn assign(driver_id: &str) -> OrderUpdate {
        OrderUpdate::AssignDriver {
            assignment: DriverAssignment {
                driver_id: driver_id.into(),
                info: Some(DriverInfo { name: Some(driver_id.to_uppercase()), ..Default::default() }),
            },
            at: Utc::now(),
        }
    }

    fn position(driver_id: &str, point: GeoPoint, estimated_minutes: Option<f64>) -> OrderUpdate {
        OrderUpdate::DriverPosition {
            driver_id: driver_id.into(),
            position: point,
            estimated_minutes,
            speed_kmh: 30.0,
            at: Utc::now(),
        }
    }

    #[test]
    fn out_of_order_preparing_is_discarded() {
        let mut order = <OrderProjection as Projection>::new("o1".into());
        assert_eq!(order.apply(status(OrderStatus::Preparing)), Ok(Outcome::Changed));
        assert_eq!(order.apply(status(OrderStatus::Ready)), Ok(Outcome::Changed));
        assert!(matches!(order.apply(status(OrderStatus::Preparing)), Ok(Outcome::Discarded(_))));
        assert_eq!(order.status, OrderStatus::Ready);
    }

    #[test]
    fn cancelled_is_terminal() {
        let mut order = <OrderProjection as Projection>::new("o1".into());
        order.apply(status(OrderStatus::OnTheWay)).unwrap();
        assert_eq!(order.apply(status(OrderStatus::Cancelled)), Ok(Outcome::Changed));
        assert!(matches!(order.apply(status(OrderStatus::Delivered)), Ok(Outcome::Discarded(_))));
        assert!(matches!(order.apply(assign("d1")), Ok(Outcome::Discarded(_))));
        assert!(order.is_terminal());
    }

    #[test]
    fn first_driver_wins() {
        let mut order = <OrderProjection as Projection>::new("o1".into());
        assert_eq!(order.apply(assign("d1")), Ok(Outcome::Changed));
        assert_eq!(order.apply(assign("d1")), Ok(Outcome::Unchanged));
        assert!(matches!(order.apply(assign("d2")), Ok(Outcome::Discarded(_))));
        assert_eq!(order.driver_id.as_deref(), Some("d1"));
        assert_eq!(order.driver_info.unwrap().name.as_deref(), Some("D1"));
    }

    #[test]
    fn status_event_carrying_driver_assigns_once() {
        let mut order = <OrderProjection as Projection>::new("o1".into());
        let carrying = |driver_id: &str| OrderUpdate::Status {
            status: OrderStatus::PickedUp,
            driver: Some(DriverAssignment { driver_id: driver_id.into(), info: None }),
            destination: None,
            at: Utc::now(),
        };
        order.apply(carrying("d1")).unwrap();
        assert_eq!(order.apply(carrying("d2")), Ok(Outcome::Unchanged));
        assert_eq!(order.driver_id.as_deref(), Some("d1"));
    }

    #[test]
    fn server_eta_is_always_accepted() {
        let mut order = <OrderProjection as Projection>::new("o1".into());
        order.apply(assign("d1")).unwrap();
        let here = GeoPoint::new(40.7580, -73.9855);

        order.apply(position("d1", here, Some(12.0))).unwrap();
        assert_eq!(order.eta.unwrap().minutes, 12.0);
        // traffic: ETA goes back up
        order.apply(position("d1", here, Some(15.0))).unwrap();
        let eta = order.eta.unwrap();
        assert_eq!(eta.minutes, 15.0);
        assert_eq!(eta.source, EtaSource::Server);
    }

    #[test]
    fn eta_falls_back_to_great_circle_estimate() {
        let mut order = <OrderProjection as Projection>::new("o1".into())
            .with_destination(GeoPoint::new(0.0, 0.0899322));
        order.apply(assign("d1")).unwrap();

        order.apply(position("d1", GeoPoint::new(0.0, 0.0), None)).unwrap();
        let eta = order.eta.unwrap();
        assert_eq!(eta.source, EtaSource::Estimated);
        assert!((eta.minutes - 20.0).abs() < 0.1, "got {}", eta.minutes);
    }

    #[test]
    fn other_drivers_do_not_touch_eta() {
        let mut order = <OrderProjection as Projection>::new("o1".into());
        order.apply(assign("d1")).unwrap();
        assert_eq!(
            order.apply(position("d2", GeoPoint::new(1.0, 1.0), Some(3.0))),
            Ok(Outcome::Unchanged)
        );
        assert!(order.eta.is_none());
    }

    #[test]
    fn no_destination_and_no_server_eta_leaves_eta_unset() {
        let mut order = <OrderProjection as Projection>::new("o1".into());
        order.apply(assign("d1")).unwrap();
        assert_eq!(
            order.apply(position("d1", GeoPoint::new(1.0, 1.0), None)),
            Ok(Outcome::Unchanged)
        );
    }
}
