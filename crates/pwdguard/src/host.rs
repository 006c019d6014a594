// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pwdguard host` command implementation.
//!
//! Stdout carries the frame stream, so every log line goes to stderr.

use pwdguard_config::PwdGuardConfig;
use pwdguard_core::PwdGuardError;
use pwdguard_host::{ServeExit, install_signal_handler, run_stdio};
use tracing::info;

/// Serve the browser until it closes the port or a signal arrives.
pub async fn run_host(
    config: &PwdGuardConfig,
    launch_args: &[String],
    parent_window: Option<&str>,
) -> Result<(), PwdGuardError> {
    init_tracing(&config.host.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        origin = launch_args.last().map(String::as_str).unwrap_or("-"),
        parent_window = parent_window.unwrap_or("-"),
        "starting native host"
    );

    let shutdown = install_signal_handler();
    match run_stdio(config, shutdown).await? {
        ServeExit::EndOfInput => info!("browser closed the port, exiting"),
        ServeExit::Shutdown => info!("shutdown requested, exiting"),
    }
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let level = log_level.trim().to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pwdguard={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
