// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-domain cache of fetched credential lists.

use dashmap::DashMap;
use pwdguard_core::message::CredentialEntry;
use tokio::time::Instant;

/// Normalize a domain into its cache key, matching how the host names
/// record sets.
pub fn cache_key(domain: &str) -> String {
    let lowered = domain.trim().to_ascii_lowercase();
    match lowered.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => lowered,
    }
}

#[derive(Debug, Clone)]
struct CachedDomainView {
    credentials: Vec<CredentialEntry>,
    fetched_at: Instant,
}

/// Last-fetched plaintext credential list per domain.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, CachedDomainView>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain: &str) -> Option<Vec<CredentialEntry>> {
        self.entries
            .get(&cache_key(domain))
            .map(|view| view.credentials.clone())
    }

    /// When the cached list for `domain` was fetched.
    pub fn fetched_at(&self, domain: &str) -> Option<Instant> {
        self.entries.get(&cache_key(domain)).map(|view| view.fetched_at)
    }

    pub fn put(&self, domain: &str, credentials: Vec<CredentialEntry>) {
        self.entries.insert(
            cache_key(domain),
            CachedDomainView {
                credentials,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Forget `domain`. Returns whether anything was cached.
    pub fn invalidate(&self, domain: &str) -> bool {
        self.entries.remove(&cache_key(domain)).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
