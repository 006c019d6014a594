// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The sandboxed side of the PwdGuard bridge.
//!
//! [`ConnectionManager`] keeps a transport to the native host alive,
//! correlates requests with responses, and caches fetched credentials per
//! domain. The transport comes from a [`Connector`](pwdguard_core::Connector);
//! [`ProcessConnector`] launches the host binary over piped stdio.

pub mod cache;
pub mod correlator;
pub mod manager;
pub mod process;
pub mod supervisor;

pub use cache::ResponseCache;
pub use correlator::{Correlator, PendingRequest};
pub use manager::{ConnectionManager, ConnectionProbe, SaveStatus};
pub use process::{ProcessConnector, spawn_framed_port};
pub use supervisor::{Delivery, Supervisor};
