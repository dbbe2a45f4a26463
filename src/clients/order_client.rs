use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::clients::projection_view::ProjectionView;
use crate::driver_projection::LocationFix;
use crate::framework::{FrameworkError, Outcome, ProjectionClient};
use crate::model::{OrderProjection, OrderStatus};
use crate::order_projection::{OrderError, OrderUpdate};

/// Client for interacting with the order projection actor.
///
/// The lifecycle rules themselves live in the projection's `apply`; this client
/// only adds domain-shaped entry points.
#[derive(Clone)]
pub struct OrderClient {
    inner: ProjectionClient<OrderProjection>,
}

impl OrderClient {
    pub fn new(inner: ProjectionClient<OrderProjection>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, update))]
    pub async fn apply(&self, order_id: String, update: OrderUpdate) -> Result<Outcome, OrderError> {
        debug!(?update, "apply called");
        self.inner.apply(order_id, update).await.map_err(Self::map_error)
    }

    /// Recomputes the ETA of every live order `driver_id` is delivering.
    /// Returns the ids of orders whose ETA changed.
    #[instrument(skip(self, fix))]
    pub async fn update_eta_for_driver(
        &self,
        driver_id: &str,
        fix: &LocationFix,
        speed_kmh: f64,
    ) -> Result<Vec<String>, OrderError> {
        let wanted = driver_id.to_string();
        self.inner
            .apply_where(
                move |order: &OrderProjection| {
                    !order.status.is_terminal() && order.driver_id.as_deref() == Some(wanted.as_str())
                },
                OrderUpdate::from_fix(driver_id, fix, speed_kmh),
            )
            .await
            .map_err(Self::map_error)
    }

    pub async fn status(&self, order_id: &str) -> Result<OrderStatus, OrderError> {
        self.get(order_id.to_string())
            .await?
            .map(|order| order.status)
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// Hydrates an order from persisted state. Live state, if any, wins.
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn seed(&self, order: OrderProjection) -> Result<bool, OrderError> {
        self.inner.seed(order).await.map_err(Self::map_error)
    }

    /// Starts the order over at `confirmed` with no driver, e.g. when it is
    /// re-assigned after a cancellation.
    #[instrument(skip(self))]
    pub async fn reset_order(&self, order_id: String) -> Result<OrderProjection, OrderError> {
        self.inner.reset(order_id).await.map_err(Self::map_error)
    }

    pub async fn collect_garbage(&self) -> Result<usize, OrderError> {
        self.inner.collect_garbage().await.map_err(Self::map_error)
    }
}

#[async_trait]
impl ProjectionView<OrderProjection> for OrderClient {
    type Error = OrderError;

    fn inner(&self) -> &ProjectionClient<OrderProjection> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::Rejected(reason) => OrderError::Rejected(reason),
            other => OrderError::ActorCommunicationError(other.to_string()),
        }
    }
}
