// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault operations: save, list, delete, and the cross-domain listings.
//!
//! All calls are synchronous filesystem work. Async callers run them on the
//! blocking pool.

use pwdguard_config::StorageConfig;
use pwdguard_core::message::{CredentialEntry, CredentialSummary};
use pwdguard_core::{VaultError, now_millis};
use tracing::{debug, info, warn};

use crate::crypto;
use crate::key::{EncryptionKey, load_or_create_key};
use crate::store::{DomainStore, StoredCredential, normalize_domain};

/// Domain and credential totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VaultStats {
    pub domains: usize,
    pub credentials: usize,
}

/// The encrypted credential vault, holding the key for its lifetime.
#[derive(Debug, Clone)]
pub struct Vault {
    key: EncryptionKey,
    store: DomainStore,
}

impl Vault {
    pub fn new(key: EncryptionKey, store: DomainStore) -> Self {
        Self { key, store }
    }

    /// Open the vault described by the storage config, creating the key on
    /// first run.
    pub fn open(config: &StorageConfig) -> Result<Self, VaultError> {
        let key = load_or_create_key(&config.key_path())?;
        let store = DomainStore::new(config.credentials_path());
        debug!(dir = %store.dir().display(), "vault opened");
        Ok(Self::new(key, store))
    }

    pub fn store(&self) -> &DomainStore {
        &self.store
    }

    /// Store a credential. An existing record with the same username is
    /// updated in place, keeping its id and creation time.
    pub fn save(
        &self,
        domain: &str,
        username: &str,
        password: &str,
        form_type: Option<&str>,
        timestamp: i64,
    ) -> Result<StoredCredential, VaultError> {
        let domain = normalize_domain(domain)?;
        let mut records = self.store.load(&domain)?;
        let encrypted = crypto::encrypt(&self.key, password)?;

        let saved = match records.iter_mut().find(|r| r.username == username) {
            Some(existing) => {
                existing.password = encrypted;
                existing.form_type = form_type.map(str::to_string);
                existing.last_used = Some(timestamp);
                debug!(domain = %domain, id = %existing.id, "updated credential");
                existing.clone()
            }
            None => {
                let record = StoredCredential {
                    domain: domain.clone(),
                    username: username.to_string(),
                    password: encrypted,
                    form_type: form_type.map(str::to_string),
                    timestamp,
                    last_used: Some(timestamp),
                    id: crypto::generate_record_id()?,
                };
                debug!(domain = %domain, id = %record.id, "added credential");
                records.push(record.clone());
                record
            }
        };

        self.store.write(&domain, &records)?;
        info!(domain = %domain, "credential saved");
        Ok(saved)
    }

    /// Decrypt every credential for `domain` and stamp them as used.
    ///
    /// The returned `last_used` values are the ones from before stamping.
    pub fn list(&self, domain: &str) -> Result<Vec<CredentialEntry>, VaultError> {
        let domain = normalize_domain(domain)?;
        let mut records = self.store.load(&domain)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let entries = records
            .iter()
            .map(|r| {
                Ok(CredentialEntry {
                    username: r.username.clone(),
                    password: crypto::decrypt(&self.key, &r.password)?,
                    last_used: r.last_used,
                    id: r.id.clone(),
                })
            })
            .collect::<Result<Vec<_>, VaultError>>()?;

        let now = now_millis();
        for record in &mut records {
            record.last_used = Some(now);
        }
        self.store.write(&domain, &records)?;

        debug!(domain = %domain, count = entries.len(), "listed credentials");
        Ok(entries)
    }

    /// Remove the credential with `id`. Returns whether one was removed.
    pub fn delete(&self, domain: &str, id: &str) -> Result<bool, VaultError> {
        let domain = normalize_domain(domain)?;
        let mut records = self.store.load(&domain)?;
        let before = records.len();
        records.retain(|r| r.id != id);

        if records.len() == before {
            debug!(domain = %domain, id, "no credential to delete");
            return Ok(false);
        }

        self.store.write(&domain, &records)?;
        info!(domain = %domain, id, "credential deleted");
        Ok(true)
    }

    /// Every stored credential without passwords, by domain then record order.
    pub fn list_all(&self) -> Result<Vec<CredentialSummary>, VaultError> {
        Ok(self
            .records()?
            .into_iter()
            .map(|(domain, r)| CredentialSummary {
                domain,
                username: r.username,
                last_used: r.last_used,
                id: r.id,
            })
            .collect())
    }

    /// Every stored record, newest creation time first.
    pub fn summaries_by_recency(&self) -> Result<Vec<StoredCredential>, VaultError> {
        let mut records: Vec<StoredCredential> = self
            .records()?
            .into_iter()
            .map(|(domain, mut r)| {
                r.domain = domain;
                r
            })
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    pub fn count(&self) -> Result<VaultStats, VaultError> {
        let mut stats = VaultStats::default();
        for domain in self.store.domains()? {
            match self.store.load(&domain) {
                Ok(records) if !records.is_empty() => {
                    stats.domains += 1;
                    stats.credentials += records.len();
                }
                Ok(_) => {}
                Err(e) => warn!(domain = %domain, error = %e, "skipping unreadable record set"),
            }
        }
        Ok(stats)
    }

    /// All records paired with the domain of the file holding them.
    /// Unreadable record sets are skipped.
    fn records(&self) -> Result<Vec<(String, StoredCredential)>, VaultError> {
        let mut out = Vec::new();
        for domain in self.store.domains()? {
            match self.store.load(&domain) {
                Ok(records) => out.extend(records.into_iter().map(|r| (domain.clone(), r))),
                Err(e) => warn!(domain = %domain, error = %e, "skipping unreadable record set"),
            }
        }
        Ok(out)
    }
}
