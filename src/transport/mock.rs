//! # Scripted connector for tests
//!
//! [`MockConnector`] answers each `connect` call with the next scripted
//! expectation, in order:
//!
//! ```rust,ignore
//! let connector = MockConnector::new();
//! connector.expect_connect().refuse(TransportError::Connect("down".into()));
//! let remote = connector.expect_connect().accept();
//!
//! // ... start the connection sequencer with `connector.clone()` ...
//!
//! remote.push(r#"{"type":"order_update", ...}"#);   // server → client
//! let sent = remote.next_outbound().await;          // client → server
//! drop(remote);                                     // server hangs up
//!
//! connector.verify();
//! ```
//!
//! Every attempt is timestamped with `tokio::time::Instant`, so tests running
//! with a paused clock can assert the exact backoff gaps.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::model::Identity;

use super::{Connector, Transport, TransportError};

enum Expectation {
    Accept(MockTransport),
    Refuse(TransportError),
    /// Never completes; exercises the connect timeout.
    Hang,
}

#[derive(Default)]
struct Script {
    expectations: VecDeque<Expectation>,
    attempts: Vec<(Instant, Identity)>,
    unexpected: usize,
}

#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<Script>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_connect(&self) -> ConnectExpectationBuilder {
        ConnectExpectationBuilder {
            script: self.script.clone(),
        }
    }

    /// Number of `connect` calls so far.
    pub fn attempts(&self) -> usize {
        self.script.lock().unwrap().attempts.len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.script.lock().unwrap().attempts.iter().map(|(at, _)| *at).collect()
    }

    /// Gaps between consecutive attempts.
    pub fn attempt_gaps(&self) -> Vec<Duration> {
        self.attempt_times().windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.script.lock().unwrap().attempts.iter().map(|(_, id)| id.clone()).collect()
    }

    pub fn verify(&self) {
        let script = self.script.lock().unwrap();
        if !script.expectations.is_empty() {
            panic!("Not all expectations were met. {} remaining", script.expectations.len());
        }
        if script.unexpected > 0 {
            panic!("{} unexpected connect attempts", script.unexpected);
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, identity: &Identity) -> Result<Box<dyn Transport>, TransportError> {
        let expectation = {
            let mut script = self.script.lock().unwrap();
            script.attempts.push((Instant::now(), identity.clone()));
            let next = script.expectations.pop_front();
            if next.is_none() {
                script.unexpected += 1;
            }
            next
        };

        match expectation {
            Some(Expectation::Accept(transport)) => Ok(Box::new(transport)),
            Some(Expectation::Refuse(error)) => Err(error),
            Some(Expectation::Hang) => std::future::pending().await,
            None => Err(TransportError::Connect("no connect expectation scripted".into())),
        }
    }
}

pub struct ConnectExpectationBuilder {
    script: Arc<Mutex<Script>>,
}

impl ConnectExpectationBuilder {
    /// Accepts the attempt; the returned [`MockRemote`] plays the server.
    pub fn accept(self) -> MockRemote {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let transport = MockTransport {
            inbound: inbound_rx,
            outbound: outbound_tx,
            closed: closed.clone(),
        };
        self.script
            .lock()
            .unwrap()
            .expectations
            .push_back(Expectation::Accept(transport));

        MockRemote {
            inbound: inbound_tx,
            outbound: outbound_rx,
            closed,
        }
    }

    pub fn refuse(self, error: TransportError) {
        self.script.lock().unwrap().expectations.push_back(Expectation::Refuse(error));
    }

    pub fn hang(self) {
        self.script.lock().unwrap().expectations.push_back(Expectation::Hang);
    }
}

struct MockTransport {
    inbound: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Send("remote gone".into()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// The server side of an accepted mock connection. Dropping it hangs up.
pub struct MockRemote {
    inbound: mpsc::UnboundedSender<Result<String, TransportError>>,
    outbound: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MockRemote {
    /// Delivers a text frame to the client.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.inbound.send(Ok(frame.into()));
    }

    /// Makes the client's next receive fail.
    pub fn fail(&self, error: TransportError) {
        let _ = self.inbound.send(Err(error));
    }

    /// Next frame the client sent.
    pub async fn next_outbound(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Frames sent so far, without waiting.
    pub fn drain_outbound(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Whether the client closed the connection.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
