//! Runtime orchestration and lifecycle management.
//!
//! # Main Components
//!
//! - [`RealtimeSystem`] - Starts, wires and shuts down every background task
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod realtime_system;
pub mod tracing;

pub use realtime_system::*;
pub use self::tracing::setup_tracing;
