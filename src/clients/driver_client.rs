use async_trait::async_trait;
use tracing::instrument;

use crate::clients::projection_view::ProjectionView;
use crate::driver_projection::{DriverError, LocationFix};
use crate::framework::{FrameworkError, Outcome, ProjectionClient};
use crate::model::DriverLocationProjection;

/// Client for interacting with the driver location actor.
#[derive(Clone)]
pub struct DriverLocationClient {
    inner: ProjectionClient<DriverLocationProjection>,
}

impl DriverLocationClient {
    pub fn new(inner: ProjectionClient<DriverLocationProjection>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, fix))]
    pub async fn record(&self, driver_id: String, fix: LocationFix) -> Result<Outcome, DriverError> {
        self.inner.apply(driver_id, fix).await.map_err(Self::map_error)
    }
}

#[async_trait]
impl ProjectionView<DriverLocationProjection> for DriverLocationClient {
    type Error = DriverError;

    fn inner(&self) -> &ProjectionClient<DriverLocationProjection> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::Rejected(reason) => DriverError::Rejected(reason),
            other => DriverError::ActorCommunicationError(other.to_string()),
        }
    }
}
