//! Generic projection framework.
//!
//! This module provides the building blocks for the entity projection layer: one
//! actor per entity kind, holding the last-known value of every entity of that kind.
//!
//! # Main Components
//!
//! - [`Projection`] - Trait that derived entity types implement to be managed by actors
//! - [`ProjectionActor`] - Generic actor that owns the projections
//! - [`ProjectionClient`] - Type-safe handle used to apply updates and read state
//! - [`FrameworkError`] - Common error types

pub mod core;

// Re-export core types for convenience
pub use core::*;
