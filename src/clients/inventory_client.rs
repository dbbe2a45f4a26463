use async_trait::async_trait;
use tracing::instrument;

use crate::clients::projection_view::ProjectionView;
use crate::framework::{FrameworkError, Outcome, ProjectionClient};
use crate::inventory_projection::{InventoryError, StockLevel};
use crate::model::{InventoryKey, InventoryProjection};

/// Client for interacting with the inventory actor.
#[derive(Clone)]
pub struct InventoryClient {
    inner: ProjectionClient<InventoryProjection>,
}

impl InventoryClient {
    pub fn new(inner: ProjectionClient<InventoryProjection>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, level))]
    pub async fn record(&self, key: InventoryKey, level: StockLevel) -> Result<Outcome, InventoryError> {
        self.inner.apply(key, level).await.map_err(Self::map_error)
    }

    /// Every known menu item of one restaurant.
    pub async fn for_restaurant(&self, restaurant_id: &str) -> Result<Vec<InventoryProjection>, InventoryError> {
        let mut items: Vec<_> = self
            .list()
            .await?
            .into_iter()
            .filter(|item| item.key.restaurant_id == restaurant_id)
            .collect();
        items.sort_by(|a, b| a.key.menu_item_id.cmp(&b.key.menu_item_id));
        Ok(items)
    }
}

#[async_trait]
impl ProjectionView<InventoryProjection> for InventoryClient {
    type Error = InventoryError;

    fn inner(&self) -> &ProjectionClient<InventoryProjection> {
        &self.inner
    }

    fn map_error(e: FrameworkError) -> Self::Error {
        match e {
            FrameworkError::Rejected(reason) => InventoryError::Rejected(reason),
            other => InventoryError::ActorCommunicationError(other.to_string()),
        }
    }
}
