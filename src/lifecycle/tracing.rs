//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`.
//!
//! ```bash
//! # Connection lifecycle and projection changes
//! RUST_LOG=info cargo run
//!
//! # Every routed envelope, discarded update and heartbeat
//! RUST_LOG=debug cargo run
//!
//! # Only the sequencer
//! RUST_LOG=realtime_sync::connection=debug cargo run
//! ```
//!
//! Log lines carry structured fields instead of module paths: `entity_type`
//! and the entity id for projection actors, `topic` and `id` for subscribers,
//! `attempt` and `delay_ms` for reconnects.
//!
//! ```text
//! INFO Connection sequencer started user_id=u1 role=customer
//! INFO Connected user_id=u1
//! INFO Updated entity_type="OrderProjection" id=o1 created=true
//! WARN Discarded entity_type="OrderProjection" id=o1 reason=status regression
//! WARN Connection dropped reason=connection closed by peer
//! WARN Reconnect scheduled error=receive failed: ... attempt=1 delay_ms=1000
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false) // structured fields identify the component
        .compact()
        .init();
}
