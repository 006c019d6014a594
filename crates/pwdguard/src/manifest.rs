// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pwdguard manifest` command implementation.
//!
//! Browsers locate a native host through a small JSON manifest naming the
//! executable and the extensions allowed to start it.

use std::path::{Path, PathBuf};

use pwdguard_core::PwdGuardError;
use serde::Serialize;

/// Name the extension passes to `connectNative`.
pub const HOST_NAME: &str = "com.pwdguard.native";

#[derive(Debug, Serialize)]
pub struct NativeManifest {
    pub name: &'static str,
    pub description: &'static str,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub allowed_origins: Vec<String>,
}

/// Build the manifest for `extension_id` launching `path`.
pub fn build(extension_id: &str, path: &Path) -> Result<NativeManifest, PwdGuardError> {
    let id = extension_id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PwdGuardError::Config(format!(
            "extension id `{extension_id}` must be non-empty and alphanumeric"
        )));
    }

    Ok(NativeManifest {
        name: HOST_NAME,
        description: "PwdGuard credential vault",
        path: path.display().to_string(),
        kind: "stdio",
        allowed_origins: vec![format!("chrome-extension://{id}/")],
    })
}

/// Run the `pwdguard manifest` command.
pub fn run_manifest(extension_id: &str, path: Option<PathBuf>) -> Result<(), PwdGuardError> {
    let path = match path {
        Some(path) => path,
        None => std::env::current_exe()
            .map_err(|e| PwdGuardError::Internal(format!("locating current executable: {e}")))?,
    };

    let manifest = build(extension_id, &path)?;
    let out = serde_json::to_string_pretty(&manifest)
        .map_err(|e| PwdGuardError::Internal(format!("serializing manifest: {e}")))?;
    println!("{out}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_has_browser_shape() {
        let manifest = build("abcdefghijklmnop", Path::new("/usr/bin/pwdguard")).unwrap();
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["name"], "com.pwdguard.native");
        assert_eq!(json["type"], "stdio");
        assert_eq!(json["path"], "/usr/bin/pwdguard");
        assert_eq!(
            json["allowed_origins"],
            serde_json::json!(["chrome-extension://abcdefghijklmnop/"])
        );
    }

    #[test]
    fn rejects_ids_that_would_break_the_origin() {
        assert!(build("", Path::new("/x")).is_err());
        assert!(build("abc/../def", Path::new("/x")).is_err());
    }
}
