// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pwdguard list` and `pwdguard delete` command implementations.

use chrono::{DateTime, Utc};
use pwdguard_config::PwdGuardConfig;
use pwdguard_core::PwdGuardError;
use pwdguard_vault::{AppEvent, EventLog, StoredCredential, Vault, normalize_domain};
use serde::Serialize;

/// One row of `pwdguard list --json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListedCredential {
    pub domain: String,
    pub username: String,
    pub id: String,
    pub created_at: i64,
    pub last_used: Option<i64>,
}

impl From<StoredCredential> for ListedCredential {
    fn from(record: StoredCredential) -> Self {
        Self {
            domain: record.domain,
            username: record.username,
            id: record.id,
            created_at: record.timestamp,
            last_used: record.last_used,
        }
    }
}

/// Stored credentials newest first, optionally for one domain.
pub fn collect(
    vault: &Vault,
    domain: Option<&str>,
) -> Result<Vec<ListedCredential>, PwdGuardError> {
    let domain = domain.map(normalize_domain).transpose()?;
    Ok(vault
        .summaries_by_recency()?
        .into_iter()
        .filter(|r| domain.as_deref().is_none_or(|d| r.domain == d))
        .map(ListedCredential::from)
        .collect())
}

/// Run the `pwdguard list` command.
pub fn run_list(
    config: &PwdGuardConfig,
    domain: Option<&str>,
    json: bool,
) -> Result<(), PwdGuardError> {
    let vault = Vault::open(&config.storage)?;
    let rows = collect(&vault, domain)?;

    if json {
        let out = serde_json::to_string_pretty(&rows)
            .map_err(|e| PwdGuardError::Internal(format!("serializing list: {e}")))?;
        println!("{out}");
        return Ok(());
    }

    if rows.is_empty() {
        println!("No saved credentials.");
        return Ok(());
    }

    println!(
        "{:<32} {:<28} {:<20} {:<20} ID",
        "DOMAIN", "USERNAME", "CREATED", "LAST USED"
    );
    for row in &rows {
        println!(
            "{:<32} {:<28} {:<20} {:<20} {}",
            row.domain,
            row.username,
            format_millis(Some(row.created_at)),
            format_millis(row.last_used),
            row.id
        );
    }
    Ok(())
}

/// Run the `pwdguard delete` command.
pub fn run_delete(config: &PwdGuardConfig, domain: &str, id: &str) -> Result<(), PwdGuardError> {
    let vault = Vault::open(&config.storage)?;
    if !vault.delete(domain, id)? {
        return Err(PwdGuardError::Internal(format!(
            "no credential with id {id} for {domain}"
        )));
    }

    if config.storage.event_log_enabled {
        let domain = normalize_domain(domain)?;
        EventLog::new(config.storage.event_log_path())
            .record(AppEvent::CredentialDeleted { domain: &domain, id });
    }
    println!("Deleted credential {id} for {domain}.");
    Ok(())
}

fn format_millis(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwdguard_config::StorageConfig;

    fn temp_vault() -> (tempfile::TempDir, Vault) {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            data_dir: dir.path().to_string_lossy().to_string(),
            ..StorageConfig::default()
        };
        let vault = Vault::open(&storage).unwrap();
        (dir, vault)
    }

    #[test]
    fn collect_is_newest_first_and_filters_by_domain() {
        let (_dir, vault) = temp_vault();
        vault.save("example.com", "alice", "a", None, 1_000).unwrap();
        vault.save("other.org", "bob", "b", None, 3_000).unwrap();
        vault.save("Example.COM", "carol", "c", None, 2_000).unwrap();

        let all = collect(&vault, None).unwrap();
        let users: Vec<&str> = all.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(users, vec!["bob", "carol", "alice"]);

        let filtered = collect(&vault, Some("EXAMPLE.com")).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.domain == "example.com"));
    }

    #[test]
    fn listed_rows_never_carry_passwords() {
        let (_dir, vault) = temp_vault();
        vault.save("example.com", "alice", "hunter2", None, 1_000).unwrap();
        let json = serde_json::to_string(&collect(&vault, None).unwrap()).unwrap();
        assert!(!json.contains("password"));
        assert!(json.contains("createdAt"));
    }

    #[test]
    fn collect_rejects_bad_domain_filter() {
        let (_dir, vault) = temp_vault();
        assert!(collect(&vault, Some("../etc")).is_err());
    }

    #[test]
    fn format_millis_handles_missing_values() {
        assert_eq!(format_millis(None), "never");
        assert_eq!(format_millis(Some(0)), "1970-01-01 00:00");
    }
}
