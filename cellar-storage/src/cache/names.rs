//! Bounded display-name cache.
//!
//! Maps opaque user ids to display names with a short per-entry TTL and a
//! hard size bound, evicting oldest entries first. Deliberately not wired
//! to the staleness tracker: display names change rarely, and a
//! ten-minute-stale name is acceptable where a stale price is not.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use cellar_core::{Collection, DocumentId, NameCacheEntry, UNKNOWN_USER_NAME};

use crate::local::LocalStore;
use crate::store::DocumentStore;

/// Local persistence key for the serialized name-cache map.
pub const NAME_CACHE_KEY: &str = "user_names";

/// Bounded, time-expiring user-id to display-name cache.
pub struct NameCache<L: LocalStore> {
    local: Arc<L>,
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<DocumentId, NameCacheEntry>>,
}

impl<L: LocalStore> NameCache<L> {
    /// Create a cache, hydrating any persisted map from the local store.
    pub fn new(local: Arc<L>, ttl: Duration, max_entries: usize) -> Self {
        let entries = Self::hydrate(&local);
        Self {
            local,
            ttl,
            max_entries,
            entries: Mutex::new(entries),
        }
    }

    /// Resolve a user id to a display name.
    ///
    /// Serves the cached name while its entry is younger than the TTL;
    /// otherwise performs a point lookup of the user record. A missing
    /// record or a failed lookup yields the placeholder name and is NOT
    /// cached, so the next resolve retries the store.
    pub async fn resolve<S: DocumentStore>(&self, user_id: &str, store: &S) -> String {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(user_id) {
            let age = Utc::now()
                .signed_duration_since(entry.cached_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if age < self.ttl {
                return entry.display_name.clone();
            }
        }

        let display_name = match store.get(Collection::Users.as_str(), user_id).await {
            Ok(Some(document)) => document
                .get("display_name")
                .and_then(|v| v.as_str())
                .unwrap_or(UNKNOWN_USER_NAME)
                .to_string(),
            Ok(None) => return UNKNOWN_USER_NAME.to_string(),
            Err(error) => {
                tracing::warn!(user_id, %error, "user lookup failed, using placeholder");
                return UNKNOWN_USER_NAME.to_string();
            }
        };

        entries.insert(
            user_id.to_string(),
            NameCacheEntry {
                display_name: display_name.clone(),
                cached_at: Utc::now(),
            },
        );
        Self::enforce_bound(&mut entries, self.max_entries);
        self.persist(&entries);

        display_name
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a user id currently has a cached entry.
    pub async fn contains(&self, user_id: &str) -> bool {
        self.entries.lock().await.contains_key(user_id)
    }

    /// Evict oldest entries until the bound holds.
    fn enforce_bound(entries: &mut HashMap<DocumentId, NameCacheEntry>, max_entries: usize) {
        if entries.len() <= max_entries {
            return;
        }

        let mut by_age: Vec<(DocumentId, cellar_core::Timestamp)> = entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.cached_at))
            .collect();
        by_age.sort_by(|a, b| a.1.cmp(&b.1));

        let excess = entries.len() - max_entries;
        for (id, _) in by_age.into_iter().take(excess) {
            entries.remove(&id);
        }
    }

    fn hydrate(local: &Arc<L>) -> HashMap<DocumentId, NameCacheEntry> {
        let raw = match local.read(NAME_CACHE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return HashMap::new(),
            Err(error) => {
                tracing::warn!(%error, "failed to read persisted name cache");
                return HashMap::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(%error, "persisted name cache unreadable, starting empty");
                HashMap::new()
            }
        }
    }

    /// Persist the whole map best-effort.
    fn persist(&self, entries: &HashMap<DocumentId, NameCacheEntry>) {
        match serde_json::to_string(entries) {
            Ok(serialized) => {
                if let Err(error) = self.local.write(NAME_CACHE_KEY, &serialized) {
                    tracing::warn!(%error, "failed to persist name cache");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "failed to serialize name cache");
            }
        }
    }
}
