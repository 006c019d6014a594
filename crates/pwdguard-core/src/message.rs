// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire messages exchanged between the extension and the native host.
//!
//! Every frame carries one JSON object with a `type` discriminator. The set
//! of types is closed: [`WireMessage::from_value`] rejects unknown types with
//! [`PwdGuardError::UnknownMessageType`] instead of falling through.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::error::PwdGuardError;
use crate::types::CorrelationId;

/// The `type` discriminator of a wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum MessageKind {
    SaveCredentials,
    SaveResponse,
    GetCredentials,
    CredentialsResponse,
    DeleteCredential,
    DeleteResponse,
    GetAllCredentials,
    AllCredentialsResponse,
    ConnectionTest,
    Error,
}

/// A decoded protocol message, one variant per `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WireMessage {
    SaveCredentials(SaveCredentials),
    SaveResponse(SaveResponse),
    GetCredentials(GetCredentials),
    CredentialsResponse(CredentialsResponse),
    DeleteCredential(DeleteCredential),
    DeleteResponse(DeleteResponse),
    GetAllCredentials(GetAllCredentials),
    AllCredentialsResponse(AllCredentialsResponse),
    ConnectionTest(ConnectionTest),
    Error(ErrorResponse),
}

/// Request to store (or replace) one credential.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCredentials {
    pub domain: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

impl fmt::Debug for SaveCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveCredentials")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("form_type", &self.form_type)
            .field("timestamp", &self.timestamp)
            .field("message_id", &self.message_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCredentials {
    pub domain: String,
    pub message_id: CorrelationId,
}

/// Decrypted credential as delivered to the extension.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialEntry {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub last_used: Option<i64>,
    pub id: String,
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("last_used", &self.last_used)
            .field("id", &self.id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsResponse {
    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub message_id: CorrelationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCredential {
    pub domain: String,
    pub credential_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetAllCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

/// A stored credential without its password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub domain: String,
    pub username: String,
    #[serde(default)]
    pub last_used: Option<i64>,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllCredentialsResponse {
    #[serde(default)]
    pub credentials: Vec<CredentialSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

/// Liveness probe; the host echoes it back with `success` and `version` set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<CorrelationId>,
}

impl WireMessage {
    /// Validate and convert a decoded JSON payload into a typed message.
    pub fn from_value(value: Value) -> Result<Self, PwdGuardError> {
        let kind = match value.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(PwdGuardError::MalformedMessage {
                    kind: other.to_string(),
                    reason: "`type` must be a string".to_string(),
                });
            }
            None => {
                return Err(PwdGuardError::MalformedMessage {
                    kind: "<missing>".to_string(),
                    reason: "message has no `type` field".to_string(),
                });
            }
        };

        if kind.parse::<MessageKind>().is_err() {
            return Err(PwdGuardError::UnknownMessageType(kind));
        }

        serde_json::from_value(value).map_err(|e| PwdGuardError::MalformedMessage {
            kind,
            reason: e.to_string(),
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Self::SaveCredentials(_) => MessageKind::SaveCredentials,
            Self::SaveResponse(_) => MessageKind::SaveResponse,
            Self::GetCredentials(_) => MessageKind::GetCredentials,
            Self::CredentialsResponse(_) => MessageKind::CredentialsResponse,
            Self::DeleteCredential(_) => MessageKind::DeleteCredential,
            Self::DeleteResponse(_) => MessageKind::DeleteResponse,
            Self::GetAllCredentials(_) => MessageKind::GetAllCredentials,
            Self::AllCredentialsResponse(_) => MessageKind::AllCredentialsResponse,
            Self::ConnectionTest(_) => MessageKind::ConnectionTest,
            Self::Error(_) => MessageKind::Error,
        }
    }

    /// Whether this message flows from the extension to the host.
    ///
    /// `connection-test` travels both ways and counts as a request here.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Self::SaveCredentials(_)
                | Self::GetCredentials(_)
                | Self::DeleteCredential(_)
                | Self::GetAllCredentials(_)
                | Self::ConnectionTest(_)
        )
    }

    /// The correlation id carried by this message, if any.
    pub fn message_id(&self) -> Option<&CorrelationId> {
        match self {
            Self::SaveCredentials(m) => m.message_id.as_ref(),
            Self::SaveResponse(m) => m.message_id.as_ref(),
            Self::GetCredentials(m) => Some(&m.message_id),
            Self::CredentialsResponse(m) => Some(&m.message_id),
            Self::DeleteCredential(m) => m.message_id.as_ref(),
            Self::DeleteResponse(m) => m.message_id.as_ref(),
            Self::GetAllCredentials(m) => m.message_id.as_ref(),
            Self::AllCredentialsResponse(m) => m.message_id.as_ref(),
            Self::ConnectionTest(m) => m.message_id.as_ref(),
            Self::Error(m) => m.message_id.as_ref(),
        }
    }

    /// Attach a correlation id, replacing any existing one.
    pub fn set_message_id(&mut self, id: CorrelationId) {
        match self {
            Self::SaveCredentials(m) => m.message_id = Some(id),
            Self::SaveResponse(m) => m.message_id = Some(id),
            Self::GetCredentials(m) => m.message_id = id,
            Self::CredentialsResponse(m) => m.message_id = id,
            Self::DeleteCredential(m) => m.message_id = Some(id),
            Self::DeleteResponse(m) => m.message_id = Some(id),
            Self::GetAllCredentials(m) => m.message_id = Some(id),
            Self::AllCredentialsResponse(m) => m.message_id = Some(id),
            Self::ConnectionTest(m) => m.message_id = Some(id),
            Self::Error(m) => m.message_id = Some(id),
        }
    }

    /// Build a generic `error` response.
    pub fn error(message: impl Into<String>, message_id: Option<CorrelationId>) -> Self {
        Self::Error(ErrorResponse {
            error: message.into(),
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_credentials_uses_wire_field_names() {
        let msg = WireMessage::SaveCredentials(SaveCredentials {
            domain: "example.com".into(),
            username: "alice".into(),
            password: "P@ss1".into(),
            form_type: Some("login".into()),
            timestamp: 1_700_000_000_000,
            message_id: None,
        });

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "save-credentials");
        assert_eq!(value["formType"], "login");
        assert_eq!(value["timestamp"], 1_700_000_000_000_i64);
        assert!(value.get("messageId").is_none());
    }

    #[test]
    fn get_credentials_accepts_numeric_message_id() {
        let value = json!({
            "type": "get-credentials",
            "domain": "example.com",
            "messageId": 1718000000123_u64
        });

        let msg = WireMessage::from_value(value).unwrap();
        assert_eq!(msg.kind(), MessageKind::GetCredentials);
        assert_eq!(msg.message_id().unwrap().as_str(), "1718000000123");
    }

    #[test]
    fn get_all_credentials_needs_no_fields() {
        let msg = WireMessage::from_value(json!({ "type": "get-all-credentials" })).unwrap();
        assert_eq!(msg, WireMessage::GetAllCredentials(GetAllCredentials::default()));
    }

    #[test]
    fn unknown_type_is_rejected_explicitly() {
        let err = WireMessage::from_value(json!({ "type": "sync-everything" })).unwrap_err();
        match err {
            PwdGuardError::UnknownMessageType(kind) => assert_eq!(kind, "sync-everything"),
            other => panic!("expected UnknownMessageType, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = WireMessage::from_value(json!({ "type": "save-credentials", "domain": "a.com" }))
            .unwrap_err();
        assert!(matches!(
            err,
            PwdGuardError::MalformedMessage { ref kind, .. } if kind == "save-credentials"
        ));
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = WireMessage::from_value(json!({ "domain": "a.com" })).unwrap_err();
        assert!(matches!(err, PwdGuardError::MalformedMessage { .. }));
    }

    #[test]
    fn set_message_id_on_optional_and_required_variants() {
        let mut save = WireMessage::GetAllCredentials(GetAllCredentials::default());
        save.set_message_id(CorrelationId::from("x-1"));
        assert_eq!(save.message_id().unwrap().as_str(), "x-1");

        let mut get = WireMessage::GetCredentials(GetCredentials {
            domain: "a.com".into(),
            message_id: CorrelationId::from("old"),
        });
        get.set_message_id(CorrelationId::from("new"));
        assert_eq!(get.message_id().unwrap().as_str(), "new");
    }

    #[test]
    fn debug_output_redacts_passwords() {
        let entry = CredentialEntry {
            username: "alice".into(),
            password: "hunter2".into(),
            last_used: None,
            id: "abc".into(),
        };
        let debug = format!("{entry:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn responses_are_not_requests() {
        let response = WireMessage::error("boom", None);
        assert!(!response.is_request());
        assert_eq!(response.kind().to_string(), "error");
        assert!(WireMessage::ConnectionTest(ConnectionTest::default()).is_request());
    }
}
