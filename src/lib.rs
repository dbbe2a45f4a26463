//! # Realtime Sync
//!
//! > **The real-time synchronization core of a food delivery client.**
//!
//! Several views (order tracking, driver location, restaurant queues, inventory)
//! stay in sync with server-pushed events arriving over one unreliable WebSocket.
//! Every role (customer, driver, restaurant) derives its order view from the
//! same event stream.
//!
//! ## Control flow
//!
//! ```text
//!  transport ──frames──► router ──► projection actors (order, driver, inventory)
//!      ▲                   │
//!      │                   └──publish──► subscription registry ──► consumer callbacks
//!  sequencer (reconnect policy + heartbeat)
//! ```
//!
//! ## Module Tour
//!
//! ### 1. The Connection ([`transport`], [`connection`])
//! One sequencer task owns the transport, the reconnection policy and the
//! heartbeat, so state transitions never interleave.
//! - **Key items**: [`ConnectionManager`](connection::ConnectionManager),
//!   [`ConnectionHandle`](connection::ConnectionHandle), [`ReconnectPolicy`](connection::ReconnectPolicy).
//!
//! ### 2. The Fan-out ([`router`], [`registry`])
//! The router classifies envelopes, updates projections, then publishes on
//! topics. Each subscription has its own queue and worker, so a failing or slow
//! callback only affects itself.
//! - **Key items**: [`MessageRouter`](router::MessageRouter),
//!   [`SubscriptionRegistry`](registry::SubscriptionRegistry).
//!
//! ### 3. The Engine ([`framework`])
//! A generic `ProjectionActor<T>` holds the last-known value of every entity of
//! one kind and processes updates sequentially, without locks.
//! - **Key items**: [`Projection`](framework::Projection), [`ProjectionActor`](framework::ProjectionActor).
//!
//! ### 4. The Projections ([`order_projection`], [`driver_projection`], [`inventory_projection`])
//! Concrete implementations of the `Projection` trait. The order projection is
//! the lifecycle state machine: status never regresses, `cancelled` is terminal,
//! the first driver wins.
//!
//! ### 5. The Interface ([`clients`])
//! Domain-specific wrappers around `ProjectionClient`.
//!
//! ### 6. The Orchestrator ([`lifecycle`])
//! [`RealtimeSystem`](lifecycle::RealtimeSystem) spins everything up, wires it
//! together and shuts it down.
//!
//! ## Running the Demo
//!
//! ```bash
//! REALTIME_URL=ws://localhost:8080/ws RUST_LOG=info cargo run -- user_1 customer
//! ```

pub mod clients;
pub mod config;
pub mod connection;
pub mod driver_projection;
pub mod error;
pub mod framework;
pub mod inventory_projection;
pub mod lifecycle;
pub mod model;
pub mod order_projection;
pub mod registry;
pub mod router;
pub mod services;
pub mod transport;

pub use config::RealtimeConfig;
pub use error::RealtimeError;
pub use lifecycle::RealtimeSystem;
