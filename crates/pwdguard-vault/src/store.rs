// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One JSON file per domain, rewritten atomically.
//!
//! Each write goes to a temp file in the same directory and is renamed over
//! the previous file, so readers never observe a partial record set.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use pwdguard_core::VaultError;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_DOMAIN_LEN: usize = 253;
const RECORD_EXT: &str = "json";

/// A credential as persisted on disk. `password` holds the encrypted blob.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub domain: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_type: Option<String>,
    /// Creation time in milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub last_used: Option<i64>,
    pub id: String,
}

impl std::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredCredential")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("form_type", &self.form_type)
            .field("timestamp", &self.timestamp)
            .field("last_used", &self.last_used)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Normalize a domain into the name of its record set.
///
/// Trims, lowercases and drops one trailing dot. Rejects anything that
/// could escape the credentials directory.
pub fn normalize_domain(raw: &str) -> Result<String, VaultError> {
    let lowered = raw.trim().to_ascii_lowercase();
    let domain = lowered.strip_suffix('.').unwrap_or(&lowered);

    let valid = !domain.is_empty()
        && domain.len() <= MAX_DOMAIN_LEN
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && domain
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'_'));

    if valid {
        Ok(domain.to_string())
    } else {
        Err(VaultError::InvalidDomain(raw.to_string()))
    }
}

/// Directory of per-domain record sets.
#[derive(Debug, Clone)]
pub struct DomainStore {
    dir: PathBuf,
}

impl DomainStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `domain`, which must already be normalized.
    pub fn path_for(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{domain}.{RECORD_EXT}"))
    }

    /// Read a domain's record set. A missing file is an empty set.
    pub fn load(&self, domain: &str) -> Result<Vec<StoredCredential>, VaultError> {
        let path = self.path_for(domain);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io {
                    context: format!("reading {}", path.display()),
                    source: e,
                });
            }
        };

        serde_json::from_slice(&data).map_err(|e| VaultError::Corrupt {
            domain: domain.to_string(),
            reason: e.to_string(),
        })
    }

    /// Replace a domain's record set. An empty set removes the file.
    pub fn write(&self, domain: &str, records: &[StoredCredential]) -> Result<(), VaultError> {
        let path = self.path_for(domain);

        if records.is_empty() {
            return match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(domain, "removed empty record set");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(VaultError::Io {
                    context: format!("removing {}", path.display()),
                    source: e,
                }),
            };
        }

        let json = serde_json::to_vec_pretty(records).map_err(VaultError::Serialize)?;

        fs::create_dir_all(&self.dir).map_err(|e| VaultError::Io {
            context: format!("creating {}", self.dir.display()),
            source: e,
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| VaultError::Io {
            context: "creating temporary record file".to_string(),
            source: e,
        })?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| VaultError::Io {
                context: "writing temporary record file".to_string(),
                source: e,
            })?;
        tmp.persist(&path).map_err(|e| VaultError::Io {
            context: format!("replacing {}", path.display()),
            source: e.error,
        })?;

        debug!(domain, records = records.len(), "wrote record set");
        Ok(())
    }

    /// Names of all stored domains, sorted.
    pub fn domains(&self) -> Result<Vec<String>, VaultError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(VaultError::Io {
                    context: format!("listing {}", self.dir.display()),
                    source: e,
                });
            }
        };

        let mut domains = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::Io {
                context: format!("listing {}", self.dir.display()),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            // Temp files start with a dot and never normalize.
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && normalize_domain(stem).is_ok_and(|d| d == stem)
            {
                domains.push(stem.to_string());
            }
        }
        domains.sort();
        Ok(domains)
    }
}
