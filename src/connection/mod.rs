//! Transport lifecycle: the sequencer task, its reconnection policy and its
//! heartbeat.

pub mod heartbeat;
pub mod manager;
pub mod policy;

pub use heartbeat::HeartbeatMonitor;
pub use manager::{Command, ConnectionHandle, ConnectionManager, ConnectionSettings};
pub use policy::{Decision, ReconnectPolicy};
