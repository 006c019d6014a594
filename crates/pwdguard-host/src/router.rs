// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request router: one decoded frame in, one response message out.
//!
//! Handlers never fail. Vault errors become `success: false` (or an empty
//! credential list) with a readable `error`; undecodable frames and unknown
//! types become an `error` message. Every response echoes the request's
//! `messageId`.

use std::sync::Arc;

use pwdguard_core::message::{
    AllCredentialsResponse, ConnectionTest, CredentialsResponse, DeleteCredential, DeleteResponse,
    GetAllCredentials, GetCredentials, SaveCredentials, SaveResponse,
};
use pwdguard_core::{CorrelationId, DecodedFrame, PwdGuardError, WireMessage, now_millis};
use pwdguard_vault::{AppEvent, EventLog, Vault, normalize_domain};
use serde_json::Value;
use tracing::{debug, warn};

/// Version reported in `connection-test` replies.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dispatches requests to vault operations.
#[derive(Debug, Clone)]
pub struct Router {
    vault: Arc<Vault>,
    events: EventLog,
}

impl Router {
    pub fn new(vault: Arc<Vault>, events: EventLog) -> Self {
        Self { vault, events }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Handle a frame as produced by the codec.
    pub fn handle_frame(&self, frame: DecodedFrame) -> WireMessage {
        match frame {
            Ok(value) => self.handle_value(value),
            Err(e) => {
                warn!(error = %e, "rejecting undecodable frame");
                WireMessage::error(format!("Invalid message: {e}"), None)
            }
        }
    }

    /// Validate a JSON payload and dispatch it.
    pub fn handle_value(&self, value: Value) -> WireMessage {
        let message_id = value
            .get("messageId")
            .and_then(|id| serde_json::from_value::<CorrelationId>(id.clone()).ok());

        match WireMessage::from_value(value) {
            Ok(message) => self.handle(message),
            Err(e @ PwdGuardError::UnknownMessageType(_)) => {
                warn!(error = %e, "unknown message type");
                WireMessage::error(e.to_string(), message_id)
            }
            Err(e) => {
                warn!(error = %e, "malformed message");
                WireMessage::error(e.to_string(), message_id)
            }
        }
    }

    /// Dispatch a typed message.
    pub fn handle(&self, message: WireMessage) -> WireMessage {
        debug!(kind = %message.kind(), "handling message");
        match message {
            WireMessage::SaveCredentials(req) => self.save(req),
            WireMessage::GetCredentials(req) => self.get(req),
            WireMessage::DeleteCredential(req) => self.delete(req),
            WireMessage::GetAllCredentials(req) => self.get_all(req),
            WireMessage::ConnectionTest(req) => WireMessage::ConnectionTest(ConnectionTest {
                success: Some(true),
                version: Some(HOST_VERSION.to_string()),
                timestamp: Some(now_millis()),
                message_id: req.message_id,
            }),
            other => {
                let kind = other.kind();
                warn!(%kind, "response message sent to host");
                WireMessage::error(
                    format!("Unexpected message type: {kind}"),
                    other.message_id().cloned(),
                )
            }
        }
    }

    fn save(&self, req: SaveCredentials) -> WireMessage {
        let result = self.vault.save(
            &req.domain,
            &req.username,
            &req.password,
            req.form_type.as_deref(),
            req.timestamp,
        );

        let error = match result {
            Ok(saved) => {
                self.events.record(AppEvent::CredentialSaved {
                    domain: &saved.domain,
                    username: &saved.username,
                });
                None
            }
            Err(e) => {
                warn!(domain = %req.domain, error = %e, "save failed");
                Some(e.to_string())
            }
        };

        WireMessage::SaveResponse(SaveResponse {
            success: error.is_none(),
            domain: Some(req.domain),
            timestamp: Some(now_millis()),
            error,
            message_id: req.message_id,
        })
    }

    fn get(&self, req: GetCredentials) -> WireMessage {
        let (credentials, error) = match self.vault.list(&req.domain) {
            Ok(credentials) => (credentials, None),
            Err(e) => {
                warn!(domain = %req.domain, error = %e, "fetch failed");
                (Vec::new(), Some(e.to_string()))
            }
        };

        WireMessage::CredentialsResponse(CredentialsResponse {
            credentials,
            domain: Some(req.domain),
            message_id: req.message_id,
            timestamp: Some(now_millis()),
            error,
        })
    }

    fn delete(&self, req: DeleteCredential) -> WireMessage {
        let domain = normalize_domain(&req.domain).unwrap_or_else(|_| req.domain.clone());
        let error = match self.vault.delete(&req.domain, &req.credential_id) {
            Ok(true) => {
                self.events.record(AppEvent::CredentialDeleted {
                    domain: &domain,
                    id: &req.credential_id,
                });
                None
            }
            Ok(false) => Some(format!(
                "No credential with id {} for {}",
                req.credential_id, req.domain
            )),
            Err(e) => {
                warn!(domain = %req.domain, error = %e, "delete failed");
                Some(e.to_string())
            }
        };

        WireMessage::DeleteResponse(DeleteResponse {
            success: error.is_none(),
            domain: Some(domain),
            timestamp: Some(now_millis()),
            error,
            message_id: req.message_id,
        })
    }

    fn get_all(&self, req: GetAllCredentials) -> WireMessage {
        let (credentials, error) = match self.vault.list_all() {
            Ok(credentials) => (credentials, None),
            Err(e) => {
                warn!(error = %e, "listing all credentials failed");
                (Vec::new(), Some(e.to_string()))
            }
        };

        WireMessage::AllCredentialsResponse(AllCredentialsResponse {
            credentials,
            timestamp: Some(now_millis()),
            error,
            message_id: req.message_id,
        })
    }
}
