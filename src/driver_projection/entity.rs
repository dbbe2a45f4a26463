//! [`Projection`] implementation for [`DriverLocationProjection`].
//!
//! Driver positions are last-write-wins: every fix overwrites the previous one
//! and no history is kept.

use chrono::{DateTime, Utc};

use crate::framework::{Outcome, Projection};
use crate::model::DriverLocationProjection;

use super::fix::LocationFix;

impl Projection for DriverLocationProjection {
    type Id = String;
    type Update = LocationFix;

    fn new(id: String) -> Self {
        Self::new(id)
    }

    fn id(&self) -> &String {
        &self.driver_id
    }

    fn apply(&mut self, fix: LocationFix) -> Result<Outcome, String> {
        self.latitude = fix.position.latitude;
        self.longitude = fix.position.longitude;
        self.heading = fix.heading;
        self.speed = fix.speed;
        self.accuracy = fix.accuracy;
        self.eta = fix.estimated_minutes;
        self.last_updated = fix.at;
        Ok(Outcome::Changed)
    }

    fn last_seen(&self) -> Option<DateTime<Utc>> {
        Some(self.last_updated)
    }
}
