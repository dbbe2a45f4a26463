//! Driver location projection (last-write-wins per driver).

pub mod entity;
pub mod error;
pub mod fix;

pub use error::*;
pub use fix::*;

use std::time::Duration;

use crate::clients::DriverLocationClient;
use crate::framework::ProjectionActor;
use crate::model::DriverLocationProjection;

/// Creates a new driver location actor and its client.
///
/// Drivers are never terminal; with `idle_after` set, a driver that has not
/// reported for that long is dropped at the next collection unless watched.
pub fn new(
    buffer_size: usize,
    gc_interval: Option<Duration>,
    idle_after: Option<Duration>,
) -> (ProjectionActor<DriverLocationProjection>, DriverLocationClient) {
    let (actor, generic_client) = ProjectionActor::new(buffer_size, gc_interval);
    let actor = match idle_after {
        Some(idle_after) => actor.with_idle_expiry(idle_after),
        None => actor,
    };
    (actor, DriverLocationClient::new(generic_client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ProjectionView;
    use crate::model::GeoPoint;
    use chrono::Utc;

    fn fix(minutes_ago: i64) -> LocationFix {
        LocationFix {
            position: GeoPoint::new(40.7580, -73.9855),
            heading: None,
            speed: None,
            accuracy: None,
            estimated_minutes: None,
            at: Utc::now() - chrono::Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn test_idle_drivers_are_collected_unless_watched() {
        let (actor, drivers) = new(16, None, Some(Duration::from_secs(600)));
        tokio::spawn(actor.run());

        drivers.record("gone".into(), fix(30)).await.unwrap();
        drivers.record("followed".into(), fix(30)).await.unwrap();
        drivers.record("active".into(), fix(1)).await.unwrap();
        let watcher = drivers.watch("followed".into()).await.unwrap();

        assert_eq!(drivers.inner().collect_garbage().await, Ok(1));
        assert!(drivers.get("gone".into()).await.unwrap().is_none());
        assert!(drivers.get("active".into()).await.unwrap().is_some());

        drop(watcher);
        assert_eq!(drivers.inner().collect_garbage().await, Ok(1));
        assert!(drivers.get("followed".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_without_idle_limit_drivers_are_kept() {
        let (actor, drivers) = new(16, None, None);
        tokio::spawn(actor.run());
        drivers.record("d1".into(), fix(600)).await.unwrap();
        assert_eq!(drivers.inner().collect_garbage().await, Ok(0));
    }
}
