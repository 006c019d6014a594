// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the extension-side client and its transports.

pub mod connector;

pub use connector::{Connector, Port};
