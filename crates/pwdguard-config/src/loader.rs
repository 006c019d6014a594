// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered merging.
//!
//! Lookup order: `/etc/pwdguard/pwdguard.toml`, then
//! `<config dir>/pwdguard/pwdguard.toml`, then `./pwdguard.toml`, then
//! `PWDGUARD_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PwdGuardConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/pwdguard/pwdguard.toml";
pub(crate) const LOCAL_CONFIG: &str = "pwdguard.toml";

/// Path of the per-user config file, if the platform has a config dir.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pwdguard").join(LOCAL_CONFIG))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<PwdGuardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<PwdGuardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PwdGuardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PwdGuardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PwdGuardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PwdGuardConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// `PWDGUARD_<SECTION>_<KEY>` maps to `<section>.<key>`.
///
/// Only the first underscore after the section name is turned into a dot,
/// so `PWDGUARD_CLIENT_RETRY_DELAY_MS` becomes `client.retry_delay_ms`.
fn env_provider() -> Env {
    Env::prefixed("PWDGUARD_").map(|key| {
        let key_str = key.as_str();
        let mapped = ["host_", "storage_", "client_"]
            .iter()
            .find_map(|section| {
                key_str.strip_prefix(section).map(|rest| {
                    format!("{}.{rest}", section.trim_end_matches('_'))
                })
            })
            .unwrap_or_else(|| key_str.to_string());
        mapped.into()
    })
}
