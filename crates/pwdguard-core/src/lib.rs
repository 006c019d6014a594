// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for PwdGuard's native messaging bridge.
//!
//! Holds what both sides of the browser/host boundary share: the wire
//! message types, the length-prefixed frame codec, the error taxonomy, and
//! the [`Connector`] trait the extension-side client uses to reach the host.

pub mod error;
pub mod frame;
pub mod message;
pub mod traits;
pub mod types;

pub use error::{FrameError, PwdGuardError, VaultError};
pub use frame::{encode_frame, DecodedFrame, FrameCodec};
pub use message::{MessageKind, WireMessage};
pub use traits::{Connector, Port};
pub use types::{now_millis, ConnectionState, CorrelationId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_has_all_variants() {
        let _framing = PwdGuardError::Framing(FrameError::TooLarge { size: 2, max: 1 });
        let _vault = PwdGuardError::Vault(VaultError::InvalidDomain("..".into()));
        let _unknown = PwdGuardError::UnknownMessageType("nope".into());
        let _malformed = PwdGuardError::MalformedMessage {
            kind: "save-credentials".into(),
            reason: "missing field".into(),
        };
        let _transport = PwdGuardError::transport("port closed");
        let _timeout = PwdGuardError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        let _config = PwdGuardError::Config("bad".into());
        let _internal = PwdGuardError::Internal("bug".into());
    }

    #[test]
    fn unknown_type_error_reads_like_the_wire_message() {
        let err = PwdGuardError::UnknownMessageType("bogus".into());
        assert_eq!(err.to_string(), "Unknown message type: bogus");
    }

    #[test]
    fn connector_trait_is_object_safe() {
        fn _assert_connector(_: &dyn Connector) {}
    }
}
