// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted credential vault for the PwdGuard native host.
//!
//! Credentials live in one JSON file per domain. Passwords are encrypted
//! with AES-256-CBC under a single random key kept in a key file next to
//! the records. An append-only event log tells the desktop app what the
//! host did.

pub mod crypto;
pub mod event_log;
pub mod key;
pub mod store;
pub mod vault;

pub use event_log::{AppEvent, EventLog};
pub use key::{EncryptionKey, load_or_create_key};
pub use store::{DomainStore, StoredCredential, normalize_domain};
pub use vault::{Vault, VaultStats};
