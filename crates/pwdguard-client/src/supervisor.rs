// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection supervisor: keeps a transport to the host alive.
//!
//! One task loops `connect -> pump inbound -> disconnected -> wait -> retry`.
//! A failed connect moves to [`ConnectionState::Error`]; both `Error` and
//! `Disconnected` retry after the same fixed delay, with no backoff.
//!
//! While no transport is live, outbound messages queue in FIFO order. A new
//! transport drains the queue before the state flips to `Connected`, so
//! queued messages always reach the host ahead of newer ones. Host replies
//! keep flowing while the queue drains, and queued messages the owner no
//! longer wants are dropped instead of sent.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use pwdguard_core::{ConnectionState, Connector, Port, WireMessage};
use tokio::sync::{Mutex, Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What happened to a message handed to [`Supervisor::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the live transport.
    Sent,
    /// Held until the next transport comes up.
    Queued,
}

type QueueFilter = dyn Fn(&WireMessage) -> bool + Send + Sync;

#[derive(Debug, Default)]
struct Link {
    outbound: Option<mpsc::Sender<WireMessage>>,
    queue: VecDeque<WireMessage>,
}

struct Shared {
    connector: Arc<dyn Connector>,
    retry_delay: Duration,
    state: watch::Sender<ConnectionState>,
    link: Mutex<Link>,
    reconnect: Notify,
    keep_queued: Box<QueueFilter>,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            info!(from = %prev, to = %next, connector = self.connector.name(), "connection state changed");
        }
    }

    fn prune(&self, link: &mut Link) {
        let before = link.queue.len();
        link.queue.retain(|message| (self.keep_queued)(message));
        let dropped = before - link.queue.len();
        if dropped > 0 {
            debug!(dropped, "dropped stale queued messages");
        }
    }

    fn enqueue(&self, link: &mut Link, message: WireMessage) {
        self.prune(link);
        link.queue.push_back(message);
    }

    /// Next queued message still worth sending.
    fn next_queued(&self, link: &mut Link) -> Option<WireMessage> {
        while let Some(message) = link.queue.pop_front() {
            if (self.keep_queued)(&message) {
                return Some(message);
            }
            debug!(kind = %message.kind(), "skipping stale queued message");
        }
        None
    }
}

/// Handle to the supervisor. Cloning shares the same transport.
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("connector", &self.shared.connector.name())
            .field("state", &*self.shared.state.borrow())
            .field("retry_delay", &self.shared.retry_delay)
            .finish()
    }
}

impl Supervisor {
    pub fn new(connector: Arc<dyn Connector>, retry_delay: Duration) -> Self {
        Self::with_queue_filter(connector, retry_delay, |_| true)
    }

    /// Like [`Supervisor::new`], but queued messages for which `keep`
    /// returns false are dropped rather than sent on the next transport.
    pub fn with_queue_filter<F>(connector: Arc<dyn Connector>, retry_delay: Duration, keep: F) -> Self
    where
        F: Fn(&WireMessage) -> bool + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                connector,
                retry_delay,
                state,
                link: Mutex::new(Link::default()),
                reconnect: Notify::new(),
                keep_queued: Box::new(keep),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Skip the rest of the current retry delay.
    pub fn request_reconnect(&self) {
        self.shared.reconnect.notify_one();
    }

    /// Number of messages still waiting for a transport.
    pub async fn queued(&self) -> usize {
        let mut link = self.shared.link.lock().await;
        self.shared.prune(&mut link);
        link.queue.len()
    }

    /// Send on the live transport, or queue when there is none.
    ///
    /// The link lock is never held while waiting for channel capacity. A
    /// send that fails on a transport that just died re-queues the message
    /// for the next connection.
    pub async fn send(&self, mut message: WireMessage) -> Delivery {
        loop {
            let outbound = {
                let mut link = self.shared.link.lock().await;
                match link.outbound.clone() {
                    Some(outbound) => outbound,
                    None => {
                        debug!(kind = %message.kind(), "no transport, queueing");
                        self.shared.enqueue(&mut link, message);
                        return Delivery::Queued;
                    }
                }
            };

            match outbound.send(message).await {
                Ok(()) => return Delivery::Sent,
                Err(mpsc::error::SendError(returned)) => {
                    warn!(kind = %returned.kind(), "transport closed during send");
                    let mut link = self.shared.link.lock().await;
                    if link
                        .outbound
                        .as_ref()
                        .is_some_and(|live| live.same_channel(&outbound))
                    {
                        link.outbound = None;
                    }
                    message = returned;
                }
            }
        }
    }

    /// Spawn the supervision loop. Inbound host messages go to `inbound`.
    pub fn spawn(
        &self,
        inbound: mpsc::Sender<WireMessage>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(run(shared, inbound, cancel))
    }
}

async fn run(shared: Arc<Shared>, inbound: mpsc::Sender<WireMessage>, cancel: CancellationToken) {
    info!(connector = shared.connector.name(), "connection supervisor started");

    loop {
        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = shared.connector.connect() => attempt,
        };

        match attempt {
            Ok(port) => {
                if !pump(&shared, port, &inbound, &cancel).await {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, retry_in = ?shared.retry_delay, "connect failed");
                shared.set_state(ConnectionState::Error);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(shared.retry_delay) => {}
            _ = shared.reconnect.notified() => debug!("reconnect requested"),
        }
    }

    shared.link.lock().await.outbound = None;
    shared.set_state(ConnectionState::Disconnected);
    info!("connection supervisor stopped");
}

/// Drive one transport session. Returns false when the loop should stop.
///
/// The queue drains one message per reserved slot while inbound messages
/// are forwarded, so a host blocked on writing replies never stalls the
/// drain. Sends made during the drain keep queueing behind it; the
/// transport is published only once the queue is empty.
async fn pump(
    shared: &Shared,
    port: Port,
    inbound: &mpsc::Sender<WireMessage>,
    cancel: &CancellationToken,
) -> bool {
    let Port {
        outbound,
        inbound: mut from_host,
    } = port;

    let mut draining = true;
    let mut drained = 0usize;

    let keep_running = loop {
        tokio::select! {
            _ = cancel.cancelled() => break false,
            slot = outbound.reserve(), if draining => {
                let Ok(slot) = slot else {
                    warn!(drained, "transport closed while draining queue");
                    break true;
                };
                let mut link = shared.link.lock().await;
                match shared.next_queued(&mut link) {
                    Some(message) => {
                        slot.send(message);
                        drained += 1;
                    }
                    None => {
                        drop(slot);
                        link.outbound = Some(outbound.clone());
                        draining = false;
                        if drained > 0 {
                            debug!(drained, "flushed queued messages");
                        }
                        shared.set_state(ConnectionState::Connected);
                    }
                }
            }
            message = from_host.recv() => match message {
                Some(message) => {
                    if inbound.send(message).await.is_err() {
                        debug!("inbound consumer gone");
                        break false;
                    }
                }
                None => break true,
            },
        }
    };

    shared.link.lock().await.outbound = None;
    if keep_running {
        info!(retry_in = ?shared.retry_delay, "transport closed");
        shared.set_state(ConnectionState::Disconnected);
    }
    keep_running
}
