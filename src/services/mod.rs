//! Collaborators consulted at startup only: who is connecting, and which
//! orders to hydrate projections from. Never polled.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Identity, OrderProjection};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn current_identity(&self) -> Result<Identity, ServiceError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Orders the current user should see, in their persisted state.
    async fn active_orders(&self, identity: &Identity) -> Result<Vec<OrderProjection>, ServiceError>;
}

/// An [`AuthService`] with a fixed identity.
#[derive(Debug, Clone)]
pub struct StaticAuth(pub Option<Identity>);

#[async_trait]
impl AuthService for StaticAuth {
    async fn current_identity(&self) -> Result<Identity, ServiceError> {
        self.0.clone().ok_or(ServiceError::Unauthenticated)
    }
}

/// An [`OrderRepository`] backed by a map of user id to orders.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrders {
    orders: HashMap<String, Vec<OrderProjection>>,
}

impl InMemoryOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(mut self, user_id: impl Into<String>, order: OrderProjection) -> Self {
        self.orders.entry(user_id.into()).or_default().push(order);
        self
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrders {
    async fn active_orders(&self, identity: &Identity) -> Result<Vec<OrderProjection>, ServiceError> {
        Ok(self.orders.get(&identity.user_id).cloned().unwrap_or_default())
    }
}
