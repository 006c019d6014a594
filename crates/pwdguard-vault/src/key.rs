// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The process-wide 256-bit encryption key and its key file.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use pwdguard_core::VaultError;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::random_bytes;

pub const KEY_LEN: usize = 32;

/// A 256-bit AES key, zeroed on drop.
///
/// Debug output omits the key material.
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptionKey").field(&"[REDACTED]").finish()
    }
}

impl EncryptionKey {
    /// Draw a new key from the system CSPRNG.
    pub fn generate() -> Result<Self, VaultError> {
        Ok(Self(Zeroizing::new(random_bytes::<KEY_LEN>()?)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        let key: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            VaultError::InvalidKey(format!(
                "key file holds {} bytes, expected {KEY_LEN}",
                bytes.len()
            ))
        })?;
        Ok(Self(Zeroizing::new(key)))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Load the key at `path`, creating and persisting a new one on first run.
///
/// A new key is written to a temp file with owner-only permissions and
/// linked into place without overwriting, so a concurrent first run keeps
/// whichever key landed first.
pub fn load_or_create_key(path: &Path) -> Result<EncryptionKey, VaultError> {
    match fs::read(path) {
        Ok(bytes) => {
            let bytes = Zeroizing::new(bytes);
            debug!(path = %path.display(), "loaded encryption key");
            EncryptionKey::from_bytes(&bytes)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => create_key(path),
        Err(e) => Err(io_error(format!("reading key file {}", path.display()), e)),
    }
}

fn create_key(path: &Path) -> Result<EncryptionKey, VaultError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|e| io_error(format!("creating key directory {}", dir.display()), e))?;

    let key = EncryptionKey::generate()?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| io_error("creating temporary key file".to_string(), e))?;
    restrict_permissions(tmp.as_file())?;
    tmp.write_all(key.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| io_error("writing temporary key file".to_string(), e))?;

    match tmp.persist_noclobber(path) {
        Ok(_) => {
            info!(path = %path.display(), "generated new encryption key");
            Ok(key)
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "key file appeared concurrently, loading it");
            let bytes = Zeroizing::new(
                fs::read(path)
                    .map_err(|e| io_error(format!("reading key file {}", path.display()), e))?,
            );
            EncryptionKey::from_bytes(&bytes)
        }
        Err(e) => Err(io_error(
            format!("persisting key file {}", path.display()),
            e.error,
        )),
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> Result<(), VaultError> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(|e| io_error("restricting key file permissions".to_string(), e))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> Result<(), VaultError> {
    Ok(())
}

fn io_error(context: String, source: std::io::Error) -> VaultError {
    VaultError::Io { context, source }
}
