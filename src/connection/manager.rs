//! # Connection sequencer
//!
//! One task owns the transport, the [`ReconnectPolicy`] and the
//! [`HeartbeatMonitor`], so connection-state transitions are never interleaved.
//! Everyone else talks to it through a [`ConnectionHandle`]:
//!
//! ```text
//!  ConnectionHandle ──(bounded mpsc, try_send)──► ConnectionManager::run
//!        ▲                                            │  select! over
//!        │ watch<ConnectionSnapshot>                  │  commands, inbound frames,
//!        └────────────────────────────────────────────┤  heartbeat ticks, backoff sleeps
//!                                                     ▼
//!                                    frames ──► router      events ──► `connection` topic
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::error::RealtimeError;
use crate::model::{
    ConnectionEvent, ConnectionSnapshot, ConnectionState, Envelope, Identity, OutboundMessage,
};
use crate::registry::{topic, SubscriptionRegistry};
use crate::transport::{Connector, Transport, TransportError};

use super::heartbeat::HeartbeatMonitor;
use super::policy::{Decision, ReconnectPolicy};

/// Messages sent from a [`ConnectionHandle`] to the sequencer.
#[derive(Debug)]
pub enum Command {
    /// An already serialized envelope.
    Send(String),
    /// External trigger: reset the attempt counter and connect now.
    Reconnect,
    Close { respond_to: oneshot::Sender<()> },
}

enum Step {
    Connect,
    Open(Box<dyn Transport>),
    Backoff { attempt: u32, delay: Duration },
    Failed,
    Shutdown,
}

/// Tunables for one sequencer.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub policy: ReconnectPolicy,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub command_capacity: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            heartbeat_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            command_capacity: 256,
        }
    }
}

pub struct ConnectionManager {
    identity: Identity,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    heartbeat: HeartbeatMonitor,
    connect_timeout: Duration,
    commands: mpsc::Receiver<Command>,
    frames: mpsc::Sender<String>,
    registry: SubscriptionRegistry,
    state: watch::Sender<ConnectionSnapshot>,
}

impl ConnectionManager {
    /// Inbound text frames are forwarded on `frames` without waiting; when it is
    /// full the frame is dropped with a warning. Lifecycle events are published
    /// on `registry`.
    pub fn new(
        identity: Identity,
        connector: Arc<dyn Connector>,
        settings: ConnectionSettings,
        registry: SubscriptionRegistry,
        frames: mpsc::Sender<String>,
    ) -> (Self, ConnectionHandle) {
        let (command_tx, commands) = mpsc::channel(settings.command_capacity.max(1));
        let (state, state_rx) = watch::channel(ConnectionSnapshot::new(&identity));

        let handle = ConnectionHandle {
            user_id: identity.user_id.clone(),
            commands: command_tx,
            state: state_rx,
        };
        let manager = Self {
            identity,
            connector,
            policy: settings.policy,
            heartbeat: HeartbeatMonitor::new(settings.heartbeat_interval),
            connect_timeout: settings.connect_timeout,
            commands,
            frames,
            registry,
            state,
        };
        (manager, handle)
    }

    /// Runs until closed through a handle or until every handle is dropped.
    pub async fn run(mut self) {
        info!(user_id = %self.identity.user_id, role = %self.identity.role, "Connection sequencer started");

        let mut step = Step::Connect;
        loop {
            step = match step {
                Step::Connect => self.connect().await,
                Step::Open(transport) => self.serve(transport).await,
                Step::Backoff { attempt, delay } => self.backoff(attempt, delay).await,
                Step::Failed => self.failed().await,
                Step::Shutdown => break,
            };
        }

        self.heartbeat.stop();
        self.state.send_modify(|s| s.state = ConnectionState::Closed);
        info!(user_id = %self.identity.user_id, "Connection sequencer stopped");
    }

    async fn connect(&mut self) -> Step {
        self.policy.on_connecting();
        self.update(ConnectionState::Connecting);
        debug!(attempt = self.policy.attempt(), "Connecting");

        let connector = Arc::clone(&self.connector);
        let identity = self.identity.clone();
        let timeout = self.connect_timeout;
        let attempt = tokio::time::timeout(timeout, async move { connector.connect(&identity).await });
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                result = &mut attempt => {
                    return match result {
                        Ok(Ok(transport)) => self.opened(transport),
                        Ok(Err(e)) => self.on_failure(e),
                        Err(_) => self.on_failure(TransportError::Timeout(timeout)),
                    };
                }
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Reconnect) => {
                        // already connecting; only the counter resets
                        self.policy.reset();
                        self.update(ConnectionState::Connecting);
                    }
                    Some(cmd) => {
                        if let Some(step) = self.idle_command(cmd) {
                            return step;
                        }
                    }
                    None => return Step::Shutdown,
                }
            }
        }
    }

    fn opened(&mut self, transport: Box<dyn Transport>) -> Step {
        self.policy.on_open();
        self.heartbeat.start();
        self.update(ConnectionState::Open);
        info!(user_id = %self.identity.user_id, "Connected");
        self.publish(&ConnectionEvent::Connected);
        Step::Open(transport)
    }

    async fn serve(&mut self, mut transport: Box<dyn Transport>) -> Step {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Send(frame)) => {
                        if let Err(e) = transport.send(frame).await {
                            return self.dropped(e.to_string());
                        }
                    }
                    Some(Command::Reconnect) => {
                        info!("Reconnect requested");
                        transport.close().await;
                        self.heartbeat.stop();
                        self.policy.reset();
                        self.update(ConnectionState::Closed);
                        self.publish(&ConnectionEvent::Disconnected { reason: "reconnect requested".into() });
                        return Step::Connect;
                    }
                    Some(Command::Close { respond_to }) => {
                        self.update(ConnectionState::Closing);
                        transport.close().await;
                        self.heartbeat.stop();
                        self.update(ConnectionState::Closed);
                        self.publish(&ConnectionEvent::Disconnected { reason: "closed by client".into() });
                        let _ = respond_to.send(());
                        return Step::Shutdown;
                    }
                    None => {
                        transport.close().await;
                        return Step::Shutdown;
                    }
                },
                frame = transport.recv() => match frame {
                    // Never awaits the router; a full queue drops the frame.
                    Some(Ok(text)) => match self.frames.try_send(text) {
                        Ok(()) => {}
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!("Router queue full, dropping inbound frame");
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {
                            warn!("Router gone, dropping inbound frame");
                        }
                    },
                    Some(Err(e)) => return self.dropped(e.to_string()),
                    None => return self.dropped(TransportError::Closed.to_string()),
                },
                _ = self.heartbeat.tick() => {
                    let beat = self.heartbeat.beat(&self.identity.user_id);
                    let frame = match beat.to_json() {
                        Ok(frame) => frame,
                        Err(e) => {
                            error!(error = %e, "Failed to encode heartbeat");
                            continue;
                        }
                    };
                    if let Err(e) = transport.send(frame).await {
                        return self.dropped(e.to_string());
                    }
                    let sent = self.heartbeat.last_sent();
                    self.state.send_modify(|s| s.last_heartbeat = sent);
                    debug!("Heartbeat sent");
                }
            }
        }
    }

    /// An open connection failed.
    fn dropped(&mut self, reason: String) -> Step {
        warn!(%reason, "Connection dropped");
        self.heartbeat.stop();
        self.update(ConnectionState::Closed);
        self.publish(&ConnectionEvent::Disconnected { reason: reason.clone() });
        self.on_failure(TransportError::Receive(reason))
    }

    fn on_failure(&mut self, error: TransportError) -> Step {
        match self.policy.on_failure() {
            Decision::Retry { attempt, delay } => {
                warn!(error = %error, attempt, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
                self.update(ConnectionState::Closed);
                self.publish(&ConnectionEvent::Reconnecting {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
                Step::Backoff { attempt, delay }
            }
            Decision::GiveUp { attempts } => {
                error!(error = %RealtimeError::ReconnectExhausted { attempts }, last_error = %error, "Giving up");
                self.update(ConnectionState::Closed);
                let event = ConnectionEvent::Failed { attempts };
                self.publish(&event);
                self.registry.publish(topic::CONNECTION_FAILED, event.to_value());
                Step::Failed
            }
        }
    }

    async fn backoff(&mut self, attempt: u32, delay: Duration) -> Step {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => {
                    debug!(attempt, "Backoff elapsed");
                    return Step::Connect;
                }
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Reconnect) => {
                        self.policy.reset();
                        return Step::Connect;
                    }
                    Some(cmd) => {
                        if let Some(step) = self.idle_command(cmd) {
                            return step;
                        }
                    }
                    None => return Step::Shutdown,
                }
            }
        }
    }

    /// Parked until an external reconnect trigger.
    async fn failed(&mut self) -> Step {
        loop {
            match self.commands.recv().await {
                Some(Command::Reconnect) => {
                    info!("Reconnect requested after giving up");
                    self.policy.reset();
                    return Step::Connect;
                }
                Some(cmd) => {
                    if let Some(step) = self.idle_command(cmd) {
                        return step;
                    }
                }
                None => return Step::Shutdown,
            }
        }
    }

    /// Commands other than `Reconnect` while no transport is open.
    fn idle_command(&mut self, cmd: Command) -> Option<Step> {
        match cmd {
            Command::Send(_) => {
                warn!("Send while not connected, dropping message");
                None
            }
            Command::Close { respond_to } => {
                self.update(ConnectionState::Closed);
                let _ = respond_to.send(());
                Some(Step::Shutdown)
            }
            Command::Reconnect => Some(Step::Connect),
        }
    }

    fn update(&self, state: ConnectionState) {
        let phase = self.policy.phase();
        let retry_count = self.policy.attempt();
        self.state.send_modify(|s| {
            s.state = state;
            s.phase = phase;
            s.retry_count = retry_count;
        });
    }

    fn publish(&self, event: &ConnectionEvent) {
        self.registry.publish(topic::CONNECTION, event.to_value());
    }
}

/// Cheap, cloneable access to the connection. Never exposes the transport.
#[derive(Clone)]
pub struct ConnectionHandle {
    user_id: String,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionSnapshot>,
}

impl ConnectionHandle {
    /// Fire-and-forget. A no-op (with a warning) while the connection is not open.
    ///
    /// Returns whether the message was queued for the transport.
    pub fn send(&self, kind: &str, data: Value) -> bool {
        let envelope = Envelope {
            user_id: Some(self.user_id.clone()),
            ..Envelope::new(kind, data)
        };
        self.send_envelope(&envelope)
    }

    pub fn send_outbound(&self, message: &OutboundMessage) -> bool {
        match message.payload() {
            Ok(data) => self.send(message.kind(), data),
            Err(e) => {
                error!(kind = message.kind(), error = %e, "Failed to encode outbound message");
                false
            }
        }
    }

    pub fn send_envelope(&self, envelope: &Envelope) -> bool {
        if !self.state.borrow().is_open() {
            warn!(kind = %envelope.kind, "Send while not connected, dropping message");
            return false;
        }
        let frame = match envelope.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                error!(kind = %envelope.kind, error = %e, "Failed to encode envelope");
                return false;
            }
        };
        match self.commands.try_send(Command::Send(frame)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(kind = %envelope.kind, "Command queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(kind = %envelope.kind, "Connection stopped, dropping message");
                false
            }
        }
    }

    /// Resets the attempt counter and reconnects now, even after giving up.
    pub fn reconnect(&self) {
        if self.commands.try_send(Command::Reconnect).is_err() {
            warn!("Could not queue reconnect request");
        }
    }

    /// Closes the transport and stops the sequencer.
    pub async fn close(&self) {
        let (respond_to, done) = oneshot::channel();
        if self.commands.send(Command::Close { respond_to }).await.is_ok() {
            let _ = done.await;
        }
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.state.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open()
    }
}
