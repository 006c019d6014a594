// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request correlation: each outbound request gets a UUIDv4 id and a
//! oneshot slot that its response fills exactly once.
//!
//! A pending entry is removed exactly once: by the matching response, by
//! its timeout, or when its waiter is dropped. Responses for ids that are
//! no longer pending are dropped by the caller.

use std::time::Duration;

use dashmap::DashMap;
use pwdguard_core::{CorrelationId, MessageKind, PwdGuardError, WireMessage};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// An in-flight request awaiting its response.
#[derive(Debug)]
pub struct PendingRequest {
    pub kind: MessageKind,
    /// Domain the request concerns, when there is one.
    pub domain: Option<String>,
    pub issued_at: Instant,
    pub deadline: Instant,
    sink: oneshot::Sender<WireMessage>,
}

impl PendingRequest {
    /// Deliver the response. Returns false if the waiter already gave up.
    pub fn resolve(self, response: WireMessage) -> bool {
        let waited = self.issued_at.elapsed();
        let delivered = self.sink.send(response).is_ok();
        debug!(kind = %self.kind, ?waited, delivered, "request resolved");
        delivered
    }
}

/// Table of pending requests keyed by correlation id.
#[derive(Debug)]
pub struct Correlator {
    pending: DashMap<CorrelationId, PendingRequest>,
    timeout: Duration,
}

impl Correlator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Open a pending entry under a fresh id.
    pub fn register(
        &self,
        kind: MessageKind,
        domain: Option<&str>,
    ) -> (CorrelationId, oneshot::Receiver<WireMessage>) {
        let id = CorrelationId::generate();
        let (sink, rx) = oneshot::channel();
        let issued_at = Instant::now();
        self.pending.insert(
            id.clone(),
            PendingRequest {
                kind,
                domain: domain.map(str::to_string),
                issued_at,
                deadline: issued_at + self.timeout,
                sink,
            },
        );
        (id, rx)
    }

    /// Remove and return the entry for `id` if it is still pending.
    pub fn take(&self, id: &CorrelationId) -> Option<PendingRequest> {
        self.pending.remove(id).map(|(_, pending)| pending)
    }

    /// Resolve the entry for `id` with `response`. Returns false for ids
    /// that are unknown or already released.
    pub fn complete(&self, id: &CorrelationId, response: WireMessage) -> bool {
        match self.take(id) {
            Some(pending) => pending.resolve(response),
            None => {
                debug!(%id, kind = %response.kind(), "discarding response for released request");
                false
            }
        }
    }

    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending entry. Their waiters see a transport error.
    pub fn clear(&self) {
        self.pending.clear();
    }

    /// Register a request, hand its id to `send`, and await the response.
    ///
    /// One deadline bounds both the send and the wait. Dropping the
    /// returned future releases the entry, so an abandoned request never
    /// lingers in the table.
    pub async fn request<F, Fut>(
        &self,
        kind: MessageKind,
        domain: Option<&str>,
        send: F,
    ) -> Result<WireMessage, PwdGuardError>
    where
        F: FnOnce(CorrelationId) -> Fut,
        Fut: Future,
    {
        let (id, rx) = self.register(kind, domain);
        let _release = Release {
            correlator: self,
            id: &id,
        };
        let deadline = Instant::now() + self.timeout;

        if tokio::time::timeout_at(deadline, send(id.clone()))
            .await
            .is_err()
        {
            return self.expire(&id, rx).await;
        }
        self.receive(&id, rx, deadline).await
    }

    /// Await the response for an id from [`Correlator::register`], bounded
    /// by the correlator timeout.
    ///
    /// On timeout, or if this future is dropped, the entry is released so a
    /// late response has no effect.
    pub async fn wait(
        &self,
        id: &CorrelationId,
        rx: oneshot::Receiver<WireMessage>,
    ) -> Result<WireMessage, PwdGuardError> {
        let _release = Release {
            correlator: self,
            id,
        };
        self.receive(id, rx, Instant::now() + self.timeout).await
    }

    async fn receive(
        &self,
        id: &CorrelationId,
        mut rx: oneshot::Receiver<WireMessage>,
        deadline: Instant,
    ) -> Result<WireMessage, PwdGuardError> {
        match tokio::time::timeout_at(deadline, &mut rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(abandoned()),
            Err(_) => self.expire(id, rx).await,
        }
    }

    async fn expire(
        &self,
        id: &CorrelationId,
        rx: oneshot::Receiver<WireMessage>,
    ) -> Result<WireMessage, PwdGuardError> {
        if self.take(id).is_some() {
            warn!(%id, timeout = ?self.timeout, "request timed out");
            return Err(PwdGuardError::Timeout {
                duration: self.timeout,
            });
        }
        // The response claimed the entry just as the timer fired.
        rx.await.map_err(|_| abandoned())
    }
}

fn abandoned() -> PwdGuardError {
    PwdGuardError::transport("request abandoned before a response arrived")
}

/// Releases a pending entry when its waiter goes away early.
struct Release<'a> {
    correlator: &'a Correlator,
    id: &'a CorrelationId,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        if let Some(pending) = self.correlator.take(self.id) {
            debug!(id = %self.id, kind = %pending.kind, "waiter dropped, request released");
        }
    }
}
