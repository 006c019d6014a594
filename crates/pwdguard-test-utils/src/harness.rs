// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A vault, router and config rooted in a temporary directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pwdguard_config::PwdGuardConfig;
use pwdguard_core::PwdGuardError;
use pwdguard_host::Router;
use pwdguard_vault::{EventLog, Vault};

/// Everything the host side needs, living in a temp dir that is removed on
/// drop.
pub struct TempVault {
    dir: tempfile::TempDir,
    config: PwdGuardConfig,
    vault: Arc<Vault>,
}

impl TempVault {
    /// Create a fresh vault with short client timings for tests.
    pub fn new() -> Result<Self, PwdGuardError> {
        let dir = tempfile::TempDir::new()
            .map_err(|e| PwdGuardError::Internal(format!("creating temp dir: {e}")))?;

        let mut config = PwdGuardConfig::default();
        config.storage.data_dir = dir.path().to_string_lossy().to_string();
        config.client.retry_delay_ms = 50;
        config.client.request_timeout_ms = 2_000;
        config.client.connect_probe_ms = 500;

        let vault = Arc::new(Vault::open(&config.storage)?);
        Ok(Self { dir, config, vault })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> &PwdGuardConfig {
        &self.config
    }

    /// Adjust the client request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.client.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    /// A router over this vault that writes the event log.
    pub fn router(&self) -> Arc<Router> {
        Arc::new(Router::new(
            Arc::clone(&self.vault),
            EventLog::new(self.config.storage.event_log_path()),
        ))
    }

    /// Contents of the event log, one line per entry.
    pub fn event_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.config.storage.event_log_path())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
