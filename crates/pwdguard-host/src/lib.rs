// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The privileged side of the PwdGuard bridge.
//!
//! The browser launches the host and talks to it over stdin/stdout using
//! length-prefixed JSON frames. The [`Router`] maps each request onto a
//! vault operation and [`serve`] drives the frame loop until the browser
//! closes the port or a termination signal arrives.

pub mod host;
pub mod router;
pub mod shutdown;

pub use host::{ServeExit, run_stdio, serve};
pub use router::{HOST_VERSION, Router};
pub use shutdown::install_signal_handler;
