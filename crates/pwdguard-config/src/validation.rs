// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use pwdguard_core::frame::MAX_FRAME_HARD_LIMIT;

use crate::diagnostic::ConfigError;
use crate::model::PwdGuardConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Smallest frame bound worth configuring; below this even a save request
/// with a long password does not fit.
const MIN_FRAME_BYTES: usize = 1024;

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &PwdGuardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.host.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(format!(
            "host.log_level `{}` must be one of {}",
            config.host.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let frame = config.host.max_frame_bytes;
    if !(MIN_FRAME_BYTES..=MAX_FRAME_HARD_LIMIT).contains(&frame) {
        fail(format!(
            "host.max_frame_bytes must be between {MIN_FRAME_BYTES} and {MAX_FRAME_HARD_LIMIT}, got {frame}"
        ));
    }

    if config.storage.data_dir.trim().is_empty() {
        fail("storage.data_dir must not be empty".to_string());
    }

    for (key, value) in [
        ("storage.credentials_dir", &config.storage.credentials_dir),
        ("storage.key_file", &config.storage.key_file),
        ("storage.event_log", &config.storage.event_log),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            fail(format!("{key} must not be empty when set"));
        }
    }

    if config.client.host_command.trim().is_empty() {
        fail("client.host_command must not be empty".to_string());
    }

    for (key, value) in [
        ("client.retry_delay_ms", config.client.retry_delay_ms),
        ("client.request_timeout_ms", config.client.request_timeout_ms),
        ("client.connect_probe_ms", config.client.connect_probe_ms),
    ] {
        if value == 0 {
            fail(format!("{key} must be greater than zero"));
        }
    }

    if config.client.outbound_buffer == 0 {
        fail("client.outbound_buffer must be at least 1".to_string());
    }

    for (i, domain) in config.client.never_save.iter().enumerate() {
        if domain.trim().is_empty() {
            fail(format!("client.never_save[{i}] must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
