//! Run-wide (full_name, company) uniqueness.

use std::collections::HashSet;

use prospector_shared::dedup_key;
use tokio::sync::Mutex;

/// Check-then-insert set of emitted contacts, atomic under one lock.
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: Mutex<HashSet<(String, String)>>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the pair; `false` when it was already taken.
    pub async fn insert(&self, full_name: &str, company_name: &str) -> bool {
        let key = dedup_key(full_name, company_name);
        self.seen.lock().await.insert(key)
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }
}
