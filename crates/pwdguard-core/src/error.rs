// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by the host and the extension-side client.

use thiserror::Error;

/// A failure to encode or decode a single frame.
///
/// Decode failures are scoped to one frame: the codec yields them as items
/// and keeps reading. Only [`FrameError::Io`] ends a frame stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The declared (or encoded) length is larger than the configured bound.
    #[error("frame length {size} exceeds maximum of {max} bytes")]
    TooLarge { size: usize, max: usize },

    /// The payload bytes are not a valid UTF-8 JSON document.
    #[error("frame payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// A message could not be serialized into a frame.
    #[error("failed to serialize frame payload: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The underlying byte stream failed.
    #[error("frame i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the encrypted credential store.
///
/// Every variant is recoverable: the router reports it in a response with
/// `success: false` instead of propagating it.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Filesystem access failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A domain file exists but cannot be parsed as a record set.
    #[error("corrupted record set for `{domain}`: {reason}")]
    Corrupt { domain: String, reason: String },

    /// Encryption failed (random source or cipher setup).
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// The stored blob could not be decrypted (malformed, tampered, or wrong key).
    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// The key file exists but does not hold a 256-bit key.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// The domain string cannot name a record set.
    #[error("invalid domain `{0}`")]
    InvalidDomain(String),

    /// A record set could not be serialized for writing.
    #[error("failed to serialize record set: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// The primary error type used across PwdGuard crates.
#[derive(Debug, Error)]
pub enum PwdGuardError {
    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A frame could not be encoded or decoded.
    #[error("framing error: {0}")]
    Framing(#[from] FrameError),

    /// Vault operation failed.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// A decoded message carried a `type` outside the protocol.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// A known message type was missing fields or had the wrong shape.
    #[error("malformed `{kind}` message: {reason}")]
    MalformedMessage { kind: String, reason: String },

    /// The transport to the host is gone or could not be established.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A request was not answered in time.
    #[error("request timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PwdGuardError {
    /// Shorthand for a transport error without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }
}
