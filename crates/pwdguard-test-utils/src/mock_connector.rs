// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A scripted connector whose far end is driven by the test.
//!
//! Every successful connect hands a [`MockSession`] to the test: it sees
//! what the client sent and decides what, if anything, the "host" answers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pwdguard_core::{Connector, Port, PwdGuardError, WireMessage};
use tokio::sync::{Mutex, mpsc};

/// The host end of one mock transport session.
pub struct MockSession {
    sent: mpsc::Receiver<WireMessage>,
    reply: mpsc::Sender<WireMessage>,
}

impl MockSession {
    /// Next message the client wrote, if one arrives within `within`.
    pub async fn next_sent(&mut self, within: Duration) -> Option<WireMessage> {
        tokio::time::timeout(within, self.sent.recv())
            .await
            .ok()
            .flatten()
    }

    /// Deliver a message to the client as if the host sent it.
    pub async fn reply(&self, message: WireMessage) -> Result<(), PwdGuardError> {
        self.reply
            .send(message)
            .await
            .map_err(|_| PwdGuardError::transport("client side of mock session is gone"))
    }

    /// End the session as if the host exited.
    pub fn close(self) {}
}

/// Connector that hands each session's far end to the test.
pub struct MockConnector {
    failures: AtomicUsize,
    attempts: AtomicUsize,
    sessions_tx: mpsc::UnboundedSender<MockSession>,
    sessions_rx: Mutex<mpsc::UnboundedReceiver<MockSession>>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        Self {
            failures: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            sessions_tx,
            sessions_rx: Mutex::new(sessions_rx),
        }
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Connect attempts so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the next established session.
    pub async fn next_session(&self) -> Option<MockSession> {
        self.sessions_rx.lock().await.recv().await
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<Port, PwdGuardError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PwdGuardError::transport("mock host unavailable"));
        }

        let (outbound, sent) = mpsc::channel(32);
        let (reply, inbound) = mpsc::channel(32);
        self.sessions_tx
            .send(MockSession { sent, reply })
            .map_err(|_| PwdGuardError::Internal("mock session receiver dropped".to_string()))?;

        Ok(Port { outbound, inbound })
    }
}
