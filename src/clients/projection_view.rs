use crate::framework::{FrameworkError, Projection, ProjectionClient};
use async_trait::async_trait;
use tokio::sync::watch;

/// Trait for projection-specific clients to inherit the standard read operations.
///
/// This trait reduces boilerplate by providing default implementations for
/// `get`, `watch` and `list`.
#[async_trait]
pub trait ProjectionView<T: Projection>: Send + Sync {
    /// The projection-specific error type.
    type Error: From<String> + Send + Sync;

    /// Access the inner generic ProjectionClient.
    fn inner(&self) -> &ProjectionClient<T>;

    /// Map framework errors to the specific projection error type.
    fn map_error(e: FrameworkError) -> Self::Error;

    /// Fetch the last-known value by ID.
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: T::Id) -> Result<Option<T>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().get(id).await.map_err(Self::map_error)
    }

    /// Receive every future value of one entity.
    ///
    /// Holding the receiver also keeps a terminal entity from being garbage collected.
    #[tracing::instrument(skip(self))]
    async fn watch(&self, id: T::Id) -> Result<watch::Receiver<Option<T>>, Self::Error> {
        tracing::debug!("Sending request");
        self.inner().watch(id).await.map_err(Self::map_error)
    }

    /// Snapshot of every entity currently held.
    async fn list(&self) -> Result<Vec<T>, Self::Error> {
        self.inner().list().await.map_err(Self::map_error)
    }
}
