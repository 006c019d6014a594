// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pwdguard status` command implementation.
//!
//! Reports where the vault lives and how much it holds. Never creates the
//! key file: a vault that has not been used yet reports zero credentials.

use pwdguard_config::PwdGuardConfig;
use pwdguard_core::PwdGuardError;
use pwdguard_vault::{Vault, VaultStats};
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub version: &'static str,
    pub data_dir: String,
    pub credentials_dir: String,
    pub key_file: String,
    pub key_present: bool,
    pub event_log: Option<String>,
    pub domains: usize,
    pub credentials: usize,
}

pub fn gather(config: &PwdGuardConfig) -> Result<StatusReport, PwdGuardError> {
    let storage = &config.storage;
    let key_path = storage.key_path();
    let key_present = key_path.is_file();

    let stats = if key_present {
        Vault::open(storage)?.count()?
    } else {
        VaultStats::default()
    };

    Ok(StatusReport {
        version: env!("CARGO_PKG_VERSION"),
        data_dir: storage.data_dir.clone(),
        credentials_dir: storage.credentials_path().display().to_string(),
        key_file: key_path.display().to_string(),
        key_present,
        event_log: storage
            .event_log_enabled
            .then(|| storage.event_log_path().display().to_string()),
        domains: stats.domains,
        credentials: stats.credentials,
    })
}

/// Run the `pwdguard status` command.
pub fn run_status(config: &PwdGuardConfig, json: bool) -> Result<(), PwdGuardError> {
    let report = gather(config)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(());
    }

    println!("  pwdguard {}", report.version);
    println!("  Data dir:     {}", report.data_dir);
    println!("  Credentials:  {}", report.credentials_dir);
    println!(
        "  Key file:     {} ({})",
        report.key_file,
        if report.key_present { "present" } else { "not created yet" }
    );
    println!(
        "  Event log:    {}",
        report.event_log.as_deref().unwrap_or("disabled")
    );
    println!(
        "  Stored:       {} credential(s) across {} domain(s)",
        report.credentials, report.domains
    );
    Ok(())
}
