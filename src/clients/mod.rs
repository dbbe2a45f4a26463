//! Type-safe wrappers around [`ProjectionClient`](crate::framework::ProjectionClient).

pub mod driver_client;
pub mod inventory_client;
pub mod order_client;
pub mod projection_view;

pub use driver_client::*;
pub use inventory_client::*;
pub use order_client::*;
pub use projection_view::*;
