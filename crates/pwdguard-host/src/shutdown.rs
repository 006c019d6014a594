// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for the host process.
//!
//! SIGTERM and SIGINT cancel a [`CancellationToken`] that the serve loop
//! watches. The browser sends SIGTERM when it tears the port down.

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Install handlers for SIGTERM and SIGINT.
///
/// Handlers are registered before this returns, so a signal that arrives
/// while the host is still starting is not lost. The returned token is
/// cancelled when either signal arrives.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let signal = listen();

    tokio::spawn(async move {
        signal.await;
        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
fn listen() -> impl Future<Output = ()> + Send + 'static {
    use tokio::signal::unix::{Signal, SignalKind, signal};
    use tracing::{info, warn};

    fn register(kind: SignalKind, name: &str) -> Option<Signal> {
        signal(kind)
            .map_err(|e| warn!(signal = name, error = %e, "could not install signal handler"))
            .ok()
    }

    async fn next(signal: &mut Option<Signal>) {
        match signal {
            Some(signal) => {
                signal.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    let mut sigterm = register(SignalKind::terminate(), "SIGTERM");
    let mut sigint = register(SignalKind::interrupt(), "SIGINT");

    async move {
        tokio::select! {
            _ = next(&mut sigterm) => info!("received SIGTERM, shutting down"),
            _ = next(&mut sigint) => info!("received SIGINT, shutting down"),
        }
    }
}

#[cfg(not(unix))]
fn listen() -> impl Future<Output = ()> + Send + 'static {
    async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("received Ctrl+C, shutting down");
    }
}
