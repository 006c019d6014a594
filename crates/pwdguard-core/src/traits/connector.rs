// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector trait for establishing a message transport to the native host.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::PwdGuardError;
use crate::message::WireMessage;

/// One established transport session to the host.
///
/// Mirrors a browser runtime port: messages posted on `outbound` are
/// delivered to the host, host messages arrive on `inbound`. The session is
/// over when `inbound` yields `None` or a send on `outbound` fails.
#[derive(Debug)]
pub struct Port {
    pub outbound: mpsc::Sender<WireMessage>,
    pub inbound: mpsc::Receiver<WireMessage>,
}

/// Opens transport sessions to the native host.
///
/// The connection supervisor calls [`Connector::connect`] on startup and
/// again after every disconnect.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Establish a new session.
    async fn connect(&self) -> Result<Port, PwdGuardError>;
}
