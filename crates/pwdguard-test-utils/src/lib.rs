// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for PwdGuard integration tests.
//!
//! # Components
//!
//! - [`TempVault`] - vault, router and config in a temporary directory
//! - [`LoopbackConnector`] - runs the real host loop in-process
//! - [`MockConnector`] - scripted transport whose host end the test drives

pub mod harness;
pub mod loopback;
pub mod mock_connector;

pub use harness::TempVault;
pub use loopback::LoopbackConnector;
pub use mock_connector::{MockConnector, MockSession};
