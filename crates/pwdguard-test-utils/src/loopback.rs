// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A connector that runs the real host serve loop in-process.
//!
//! Each connect opens an in-memory duplex pipe and spawns
//! [`pwdguard_host::serve`] on the far end, so the whole stack (frame codec,
//! router, vault) is exercised without launching a process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pwdguard_client::spawn_framed_port;
use pwdguard_core::frame::DEFAULT_MAX_FRAME_LEN;
use pwdguard_core::{Connector, Port, PwdGuardError};
use pwdguard_host::{Router, serve};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const PIPE_CAPACITY: usize = 64 * 1024;

/// In-process connector backed by a [`Router`].
pub struct LoopbackConnector {
    router: Arc<Router>,
    connects: AtomicUsize,
    refuse: AtomicUsize,
    sessions: Mutex<Vec<CancellationToken>>,
}

impl LoopbackConnector {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            connects: AtomicUsize::new(0),
            refuse: AtomicUsize::new(0),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Number of successful connects so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Make the next `n` connect attempts fail.
    pub fn refuse_next(&self, n: usize) {
        self.refuse.store(n, Ordering::SeqCst);
    }

    /// Stop every running host session, as if the host process exited.
    pub fn kill_sessions(&self) {
        if let Ok(mut sessions) = self.sessions.lock() {
            for token in sessions.drain(..) {
                token.cancel();
            }
        }
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn connect(&self) -> Result<Port, PwdGuardError> {
        if self
            .refuse
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(PwdGuardError::transport("loopback host refused connection"));
        }

        let (client_end, host_end) = tokio::io::duplex(PIPE_CAPACITY);
        let (host_read, host_write) = tokio::io::split(host_end);
        let (client_read, client_write) = tokio::io::split(client_end);

        let shutdown = CancellationToken::new();
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.push(shutdown.clone());
        }

        let router = Arc::clone(&self.router);
        tokio::spawn(async move {
            let exit = serve(host_read, host_write, router, DEFAULT_MAX_FRAME_LEN, shutdown).await;
            debug!(?exit, "loopback host session ended");
        });

        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(spawn_framed_port(
            client_read,
            client_write,
            DEFAULT_MAX_FRAME_LEN,
            16,
        ))
    }
}
