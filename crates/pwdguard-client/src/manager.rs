// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The extension-side entry point for talking to the native host.
//!
//! [`ConnectionManager`] owns the supervisor, the correlator, the response
//! cache and the inbound dispatch task. Callers construct one, `start` it,
//! and share it; every operation resolves to a plain value so a slow or
//! missing host reads as "no saved credentials" rather than an error.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use pwdguard_config::ClientConfig;
use pwdguard_core::message::{
    ConnectionTest, CredentialEntry, CredentialSummary, DeleteCredential, GetAllCredentials,
    GetCredentials, SaveCredentials,
};
use pwdguard_core::{
    ConnectionState, Connector, MessageKind, PwdGuardError, WireMessage, now_millis,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{ResponseCache, cache_key};
use crate::correlator::Correlator;
use crate::supervisor::Supervisor;

/// Outcome of [`ConnectionManager::save_credentials`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// The domain is on the never-save list; nothing was sent.
    Skipped,
    /// The host refused or failed the save.
    Failed(String),
    /// No response within the request timeout.
    TimedOut,
}

/// Result of [`ConnectionManager::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProbe {
    pub state: ConnectionState,
    /// Whether the host answered (or a transport came up in time).
    pub reachable: bool,
    /// Host version, when it answered a round-trip.
    pub version: Option<String>,
    pub round_trip: Option<Duration>,
}

struct Running {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Connection, correlation and caching for one extension instance.
pub struct ConnectionManager {
    config: ClientConfig,
    supervisor: Supervisor,
    correlator: Arc<Correlator>,
    cache: Arc<ResponseCache>,
    /// Normalized domains that are never saved.
    never_save: RwLock<BTreeSet<String>>,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("supervisor", &self.supervisor)
            .field("pending", &self.correlator.len())
            .field("cached_domains", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, config: ClientConfig) -> Self {
        let correlator = Arc::new(Correlator::new(config.request_timeout()));

        // A queued request whose waiter already gave up is not worth sending.
        let pending = Arc::clone(&correlator);
        let supervisor =
            Supervisor::with_queue_filter(connector, config.retry_delay(), move |message| {
                message.message_id().is_none_or(|id| pending.is_pending(id))
            });

        let never_save: BTreeSet<String> = config
            .never_save
            .iter()
            .map(String::as_str)
            .map(cache_key)
            .filter(|key| !key.is_empty())
            .collect();

        Self {
            config,
            supervisor,
            correlator,
            cache: Arc::new(ResponseCache::new()),
            never_save: RwLock::new(never_save),
            running: Mutex::new(None),
        }
    }

    /// Start the supervisor and dispatch tasks. Calling it twice is a no-op.
    pub fn start(&self) {
        let Ok(mut running) = self.running.lock() else {
            warn!("connection manager lock poisoned, not starting");
            return;
        };
        if running.is_some() {
            debug!("connection manager already running");
            return;
        }

        let cancel = CancellationToken::new();
        let (inbound_tx, inbound_rx) = mpsc::channel(self.config.outbound_buffer.max(1));

        let supervisor_task = self.supervisor.spawn(inbound_tx, cancel.clone());
        let dispatch_task = tokio::spawn(dispatch_loop(
            inbound_rx,
            Arc::clone(&self.correlator),
            Arc::clone(&self.cache),
        ));

        *running = Some(Running {
            cancel,
            tasks: vec![supervisor_task, dispatch_task],
        });
        info!("connection manager started");
    }

    /// Stop all tasks, abandon pending requests and clear the cache.
    pub async fn stop(&self) {
        let running = match self.running.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(running) = running else {
            return;
        };

        running.cancel.cancel();
        for task in running.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "connection manager task failed");
            }
        }
        self.correlator.clear();
        self.cache.clear();
        info!("connection manager stopped");
    }

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.subscribe()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn pending_requests(&self) -> usize {
        self.correlator.len()
    }

    /// Messages waiting for a transport.
    pub async fn queued_requests(&self) -> usize {
        self.supervisor.queued().await
    }

    /// Stop offering to save credentials for `domain`. Returns false when
    /// it was already on the list or normalizes to nothing.
    pub fn add_to_never_save(&self, domain: &str) -> bool {
        let key = cache_key(domain);
        if key.is_empty() {
            return false;
        }
        let added = self
            .never_save
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        if added {
            info!(domain, "domain added to the never-save list");
        }
        added
    }

    pub fn is_never_save(&self, domain: &str) -> bool {
        self.never_save
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&cache_key(domain))
    }

    /// The never-save list, normalized and sorted.
    pub fn never_save_domains(&self) -> Vec<String> {
        self.never_save
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Saved credentials for `domain`, from the cache when possible.
    ///
    /// A timeout or host error yields an empty list.
    pub async fn get_credentials(&self, domain: &str) -> Vec<CredentialEntry> {
        if let Some(hit) = self.cache.get(domain) {
            debug!(domain, count = hit.len(), "credentials served from cache");
            return hit;
        }

        let reply = self
            .correlator
            .request(MessageKind::GetCredentials, Some(domain), |id| {
                self.supervisor
                    .send(WireMessage::GetCredentials(GetCredentials {
                        domain: domain.to_string(),
                        message_id: id,
                    }))
            })
            .await;

        match reply {
            Ok(WireMessage::CredentialsResponse(resp)) => {
                if let Some(error) = resp.error {
                    warn!(domain, %error, "host could not fetch credentials");
                }
                resp.credentials
            }
            Ok(other) => {
                log_unexpected(MessageKind::GetCredentials, &other);
                Vec::new()
            }
            Err(e) => {
                log_failure(MessageKind::GetCredentials, &e);
                Vec::new()
            }
        }
    }

    /// Ask the host to store a credential.
    pub async fn save_credentials(
        &self,
        domain: &str,
        username: &str,
        password: &str,
        form_type: Option<&str>,
    ) -> SaveStatus {
        if self.is_never_save(domain) {
            info!(domain, "domain is on the never-save list, skipping");
            return SaveStatus::Skipped;
        }

        let reply = self
            .correlator
            .request(MessageKind::SaveCredentials, Some(domain), |id| {
                self.supervisor
                    .send(WireMessage::SaveCredentials(SaveCredentials {
                        domain: domain.to_string(),
                        username: username.to_string(),
                        password: password.to_string(),
                        form_type: form_type.map(str::to_string),
                        timestamp: now_millis(),
                        message_id: Some(id),
                    }))
            })
            .await;

        match reply {
            Ok(WireMessage::SaveResponse(resp)) if resp.success => SaveStatus::Saved,
            Ok(WireMessage::SaveResponse(resp)) => SaveStatus::Failed(
                resp.error
                    .unwrap_or_else(|| "host reported failure".to_string()),
            ),
            Ok(WireMessage::Error(e)) => SaveStatus::Failed(e.error),
            Ok(other) => {
                log_unexpected(MessageKind::SaveCredentials, &other);
                SaveStatus::Failed(format!("unexpected {} reply", other.kind()))
            }
            Err(PwdGuardError::Timeout { .. }) => SaveStatus::TimedOut,
            Err(e) => {
                log_failure(MessageKind::SaveCredentials, &e);
                SaveStatus::Failed(e.to_string())
            }
        }
    }

    /// Delete one credential. True when the host removed it.
    ///
    /// The cache entry for the domain is invalidated by the dispatcher, so
    /// a delete that succeeds after its caller gave up still takes effect.
    pub async fn delete_credential(&self, domain: &str, credential_id: &str) -> bool {
        let reply = self
            .correlator
            .request(MessageKind::DeleteCredential, Some(domain), |id| {
                self.supervisor
                    .send(WireMessage::DeleteCredential(DeleteCredential {
                        domain: domain.to_string(),
                        credential_id: credential_id.to_string(),
                        message_id: Some(id),
                    }))
            })
            .await;

        match reply {
            Ok(WireMessage::DeleteResponse(resp)) => {
                if let Some(error) = resp.error.filter(|_| !resp.success) {
                    warn!(domain, %error, "host did not delete credential");
                }
                resp.success
            }
            Ok(other) => {
                log_unexpected(MessageKind::DeleteCredential, &other);
                false
            }
            Err(e) => {
                log_failure(MessageKind::DeleteCredential, &e);
                false
            }
        }
    }

    /// Every stored credential, without passwords.
    pub async fn get_all_credentials(&self) -> Vec<CredentialSummary> {
        let reply = self
            .correlator
            .request(MessageKind::GetAllCredentials, None, |id| {
                self.supervisor
                    .send(WireMessage::GetAllCredentials(GetAllCredentials {
                        message_id: Some(id),
                    }))
            })
            .await;

        match reply {
            Ok(WireMessage::AllCredentialsResponse(resp)) => {
                if let Some(error) = resp.error {
                    warn!(%error, "host could not list credentials");
                }
                resp.credentials
            }
            Ok(other) => {
                log_unexpected(MessageKind::GetAllCredentials, &other);
                Vec::new()
            }
            Err(e) => {
                log_failure(MessageKind::GetAllCredentials, &e);
                Vec::new()
            }
        }
    }

    /// Check that the host is reachable.
    ///
    /// Connected: a correlated `connection-test` round-trip. Otherwise a
    /// reconnect is requested and the state is reported after the probe
    /// window.
    pub async fn test_connection(&self) -> ConnectionProbe {
        if !self.state().is_connected() {
            self.supervisor.request_reconnect();
            let mut state = self.subscribe_state();
            let _ = tokio::time::timeout(
                self.config.connect_probe(),
                state.wait_for(|s| s.is_connected()),
            )
            .await;
            let state = self.state();
            return ConnectionProbe {
                state,
                reachable: state.is_connected(),
                version: None,
                round_trip: None,
            };
        }

        let started = tokio::time::Instant::now();
        let reply = self
            .correlator
            .request(MessageKind::ConnectionTest, None, |id| {
                self.supervisor.send(WireMessage::ConnectionTest(ConnectionTest {
                    timestamp: Some(now_millis()),
                    message_id: Some(id),
                    ..ConnectionTest::default()
                }))
            })
            .await;
        let state = self.state();
        match reply {
            Ok(WireMessage::ConnectionTest(resp)) => ConnectionProbe {
                state,
                reachable: resp.success.unwrap_or(true),
                version: resp.version,
                round_trip: Some(started.elapsed()),
            },
            Ok(other) => {
                log_unexpected(MessageKind::ConnectionTest, &other);
                ConnectionProbe {
                    state,
                    reachable: false,
                    version: None,
                    round_trip: None,
                }
            }
            Err(e) => {
                log_failure(MessageKind::ConnectionTest, &e);
                ConnectionProbe {
                    state,
                    reachable: false,
                    version: None,
                    round_trip: None,
                }
            }
        }
    }
}

fn log_unexpected(request: MessageKind, reply: &WireMessage) {
    match reply {
        WireMessage::Error(e) => warn!(%request, error = %e.error, "host returned an error"),
        other => warn!(%request, reply = %other.kind(), "unexpected reply type"),
    }
}

fn log_failure(request: MessageKind, error: &PwdGuardError) {
    match error {
        PwdGuardError::Timeout { .. } => debug!(%request, %error, "request got no response"),
        _ => warn!(%request, %error, "request failed"),
    }
}

/// Route host messages to their waiters and keep the cache coherent.
async fn dispatch_loop(
    mut inbound: mpsc::Receiver<WireMessage>,
    correlator: Arc<Correlator>,
    cache: Arc<ResponseCache>,
) {
    while let Some(message) = inbound.recv().await {
        dispatch(message, &correlator, &cache);
    }
    debug!("dispatch loop finished");
}

fn dispatch(message: WireMessage, correlator: &Correlator, cache: &ResponseCache) {
    match &message {
        WireMessage::CredentialsResponse(resp) => {
            let Some(pending) = correlator.take(&resp.message_id) else {
                debug!(id = %resp.message_id, "discarding late credentials response");
                return;
            };
            if resp.error.is_none()
                && let Some(domain) = pending.domain.as_deref().or(resp.domain.as_deref())
            {
                cache.put(domain, resp.credentials.clone());
            }
            pending.resolve(message);
        }
        WireMessage::SaveResponse(resp) => {
            if resp.success
                && let Some(domain) = &resp.domain
            {
                cache.invalidate(domain);
            }
            resolve_by_id(message, correlator);
        }
        WireMessage::DeleteResponse(resp) => {
            let pending = resp.message_id.as_ref().and_then(|id| correlator.take(id));
            if resp.success
                && let Some(domain) = pending
                    .as_ref()
                    .and_then(|p| p.domain.as_deref())
                    .or(resp.domain.as_deref())
            {
                cache.invalidate(domain);
            }
            match pending {
                Some(pending) => {
                    pending.resolve(message);
                }
                None => debug!(success = resp.success, "delete response without a waiter"),
            }
        }
        _ => resolve_by_id(message, correlator),
    }
}

fn resolve_by_id(message: WireMessage, correlator: &Correlator) {
    match message.message_id().cloned() {
        Some(id) => {
            correlator.complete(&id, message);
        }
        None => debug!(kind = %message.kind(), "uncorrelated message from host"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwdguard_core::CorrelationId;
    use pwdguard_core::message::{CredentialsResponse, DeleteResponse, SaveResponse};

    fn entry(username: &str) -> CredentialEntry {
        CredentialEntry {
            username: username.to_string(),
            password: "pw".to_string(),
            last_used: None,
            id: "1".to_string(),
        }
    }

    fn creds_response(id: &CorrelationId, error: Option<&str>) -> WireMessage {
        WireMessage::CredentialsResponse(CredentialsResponse {
            credentials: vec![entry("alice")],
            domain: Some("example.com".to_string()),
            message_id: id.clone(),
            timestamp: None,
            error: error.map(str::to_string),
        })
    }

    #[test]
    fn live_response_populates_cache() {
        let correlator = Correlator::new(Duration::from_secs(5));
        let cache = ResponseCache::new();
        let (id, _rx) = correlator.register(MessageKind::GetCredentials, Some("example.com"));

        dispatch(creds_response(&id, None), &correlator, &cache);
        assert_eq!(cache.get("example.com").unwrap().len(), 1);
        assert!(correlator.is_empty());
    }

    #[test]
    fn late_response_does_not_populate_cache() {
        let correlator = Correlator::new(Duration::from_secs(5));
        let cache = ResponseCache::new();

        dispatch(creds_response(&CorrelationId::from("gone"), None), &correlator, &cache);
        assert!(cache.get("example.com").is_none());
    }

    #[test]
    fn error_response_is_not_cached() {
        let correlator = Correlator::new(Duration::from_secs(5));
        let cache = ResponseCache::new();
        let (id, _rx) = correlator.register(MessageKind::GetCredentials, Some("example.com"));

        dispatch(creds_response(&id, Some("decryption failed")), &correlator, &cache);
        assert!(cache.get("example.com").is_none());
    }

    #[test]
    fn successful_save_invalidates_even_when_uncorrelated() {
        let correlator = Correlator::new(Duration::from_secs(5));
        let cache = ResponseCache::new();
        cache.put("example.com", vec![entry("alice")]);

        let failed = WireMessage::SaveResponse(SaveResponse {
            success: false,
            domain: Some("example.com".to_string()),
            timestamp: None,
            error: Some("disk full".to_string()),
            message_id: None,
        });
        dispatch(failed, &correlator, &cache);
        assert!(cache.get("example.com").is_some());

        let saved = WireMessage::SaveResponse(SaveResponse {
            success: true,
            domain: Some("example.com".to_string()),
            timestamp: None,
            error: None,
            message_id: None,
        });
        dispatch(saved, &correlator, &cache);
        assert!(cache.get("example.com").is_none());
    }

    fn delete_response(
        success: bool,
        domain: Option<&str>,
        id: Option<&CorrelationId>,
    ) -> WireMessage {
        WireMessage::DeleteResponse(DeleteResponse {
            success,
            domain: domain.map(str::to_string),
            timestamp: None,
            error: (!success).then(|| "not found".to_string()),
            message_id: id.cloned(),
        })
    }

    #[test]
    fn late_successful_delete_still_invalidates() {
        let correlator = Correlator::new(Duration::from_secs(5));
        let cache = ResponseCache::new();
        cache.put("example.com", vec![entry("alice")]);

        let released = CorrelationId::from("timed-out");
        dispatch(
            delete_response(false, Some("example.com"), Some(&released)),
            &correlator,
            &cache,
        );
        assert!(cache.get("example.com").is_some());

        dispatch(
            delete_response(true, Some("Example.COM."), Some(&released)),
            &correlator,
            &cache,
        );
        assert!(cache.get("example.com").is_none());
    }

    #[tokio::test]
    async fn correlated_delete_invalidates_the_requested_domain() {
        let correlator = Correlator::new(Duration::from_secs(5));
        let cache = ResponseCache::new();
        cache.put("example.com", vec![entry("alice")]);
        let (id, rx) = correlator.register(MessageKind::DeleteCredential, Some("example.com"));

        dispatch(delete_response(true, None, Some(&id)), &correlator, &cache);
        assert!(cache.get("example.com").is_none());
        assert!(correlator.is_empty());
        assert!(matches!(
            rx.await,
            Ok(WireMessage::DeleteResponse(resp)) if resp.success
        ));
    }
}
