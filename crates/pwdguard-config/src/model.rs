// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for PwdGuard.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a mistyped key fails
//! at startup instead of being silently ignored.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level PwdGuard configuration.
///
/// Every section is optional; the defaults reproduce the stock layout under
/// the platform config directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PwdGuardConfig {
    /// Native host process settings.
    #[serde(default)]
    pub host: HostConfig,

    /// On-disk locations of the vault.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Extension-side connection settings.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Native host process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Logging level (trace, debug, info, warn, error). Logs go to stderr.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Largest accepted frame payload in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_frame_bytes() -> usize {
    pwdguard_core::frame::DEFAULT_MAX_FRAME_LEN
}

/// Vault storage configuration.
///
/// `credentials_dir`, `key_file` and `event_log` default to
/// `credentials/`, `encryption.key` and `extension.log` under `data_dir`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Root directory for all PwdGuard state.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding one `<domain>.json` record set per domain.
    #[serde(default)]
    pub credentials_dir: Option<String>,

    /// File holding the raw 256-bit encryption key.
    #[serde(default)]
    pub key_file: Option<String>,

    /// Append-only JSON-lines event log read by the desktop app.
    #[serde(default)]
    pub event_log: Option<String>,

    /// Set to `false` to stop writing the event log.
    #[serde(default = "default_true")]
    pub event_log_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            credentials_dir: None,
            key_file: None,
            event_log: None,
            event_log_enabled: true,
        }
    }
}

impl StorageConfig {
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.data_dir).join("credentials"))
    }

    pub fn key_path(&self) -> PathBuf {
        self.key_file
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.data_dir).join("encryption.key"))
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.event_log
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&self.data_dir).join("extension.log"))
    }
}

fn default_data_dir() -> String {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .map(|p| p.join("PwdGuard"))
        .unwrap_or_else(|| PathBuf::from("PwdGuard"))
        .to_string_lossy()
        .to_string()
}

fn default_true() -> bool {
    true
}

/// Extension-side client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Executable launched by the process connector.
    #[serde(default = "default_host_command")]
    pub host_command: String,

    /// Arguments passed to `host_command`.
    #[serde(default = "default_host_args")]
    pub host_args: Vec<String>,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// How long a request waits for its response.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long a connection test waits for a reconnect before reporting.
    #[serde(default = "default_connect_probe_ms")]
    pub connect_probe_ms: u64,

    /// Domains whose credentials are never sent to the host for saving.
    #[serde(default)]
    pub never_save: Vec<String>,

    /// Capacity of the channel between the client and a live transport.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host_command: default_host_command(),
            host_args: default_host_args(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_probe_ms: default_connect_probe_ms(),
            never_save: Vec::new(),
            outbound_buffer: default_outbound_buffer(),
        }
    }
}

impl ClientConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_probe(&self) -> Duration {
        Duration::from_millis(self.connect_probe_ms)
    }
}

fn default_host_command() -> String {
    "pwdguard".to_string()
}

fn default_host_args() -> Vec<String> {
    vec!["host".to_string()]
}

fn default_retry_delay_ms() -> u64 {
    5_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_connect_probe_ms() -> u64 {
    1_000
}

fn default_outbound_buffer() -> usize {
    64
}
