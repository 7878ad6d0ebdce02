//! In-memory seen store with a per-account size bound.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{Result, store::SeenStore};

/// Default per-account bound. A poll pass fetches at most a handful of
/// posts, so the bound only matters over long uptimes.
pub const DEFAULT_CAPACITY: usize = 512;

#[derive(Default)]
struct AccountSeen {
    ids: HashSet<String>,
    /// Insertion order, oldest first. Evicted together with `ids`.
    order: VecDeque<String>,
}

/// Bounded in-memory seen-set. Keeps up to `capacity` delivered ids per
/// account and evicts the oldest beyond that, so memory stays flat while
/// still remembering far more than one page of history. Nothing survives
/// a restart; use [`crate::SqliteSeenStore`] for that.
pub struct MemorySeenStore {
    accounts: Mutex<HashMap<String, AccountSeen>>,
    capacity: usize,
}

impl MemorySeenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` is clamped to at least 1.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for MemorySeenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SeenStore for MemorySeenStore {
    async fn is_seen(&self, handle: &str, post_id: &str) -> Result<bool> {
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        Ok(accounts
            .get(handle)
            .is_some_and(|seen| seen.ids.contains(post_id)))
    }

    async fn mark_seen(&self, handle: &str, post_id: &str) -> Result<()> {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let seen = accounts.entry(handle.to_string()).or_default();

        if !seen.ids.insert(post_id.to_string()) {
            return Ok(());
        }
        seen.order.push_back(post_id.to_string());

        while seen.order.len() > self.capacity {
            if let Some(evicted) = seen.order.pop_front() {
                seen.ids.remove(&evicted);
            }
        }
        Ok(())
    }
}
