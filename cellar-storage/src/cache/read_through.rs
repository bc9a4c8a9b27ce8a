//! Read-through cache over collection scans.
//!
//! Routes each read either to the local snapshot or to the remote store,
//! gated by snapshot age and the collection's staleness marker. Snapshots
//! are replaced wholesale on refresh and persisted to the local store so
//! they survive restarts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use cellar_core::{CellarResult, Collection, StoreError, Timestamp};

use crate::local::LocalStore;
use crate::staleness::StalenessTracker;
use crate::store::{DocumentStore, ScanQuery};

/// One cached collection scan.
///
/// Replaced wholesale on refresh, never partially mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub documents: Vec<Value>,
    pub fetched_at: Timestamp,
}

/// How a snapshot relates to the marker and TTL.
enum Staleness {
    Fresh,
    /// Refetch; bump the marker first when it has never been primed, so
    /// the refreshed snapshot can be trusted on the next read.
    Stale { prime_marker: bool },
}

/// Read-through cache with collection-granular invalidation.
///
/// One snapshot per [`Collection`]; a fetch is served locally only when
/// the snapshot is younger than the TTL AND strictly newer than the
/// collection's staleness marker. A marker that cannot be read counts as
/// unknown staleness, which degrades to a refetch - never to trusting a
/// possibly wrong snapshot. Refreshes for the same collection are
/// serialized by a per-collection guard, so concurrent callers await one
/// in-flight fetch instead of issuing duplicate scans.
pub struct ReadThroughCache<L: LocalStore, T: StalenessTracker> {
    local: Arc<L>,
    tracker: Arc<T>,
    cache_ttl: Duration,
    entries: RwLock<HashMap<Collection, CollectionSnapshot>>,
    flights: [Mutex<()>; 4],
}

impl<L: LocalStore, T: StalenessTracker> ReadThroughCache<L, T> {
    pub fn new(local: Arc<L>, tracker: Arc<T>, cache_ttl: Duration) -> Self {
        Self {
            local,
            tracker,
            cache_ttl,
            entries: RwLock::new(HashMap::new()),
            flights: [Mutex::new(()), Mutex::new(()), Mutex::new(()), Mutex::new(())],
        }
    }

    /// Get a reference to the staleness tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Fetch a collection, serving the local snapshot when it is fresh.
    ///
    /// A store failure during an actual refetch is fatal to the call and
    /// surfaced verbatim: a failed fetch gives no guarantee that stale
    /// data is less wrong than an error.
    pub async fn fetch<S: DocumentStore>(
        &self,
        collection: Collection,
        query: &ScanQuery,
        store: &S,
    ) -> CellarResult<Vec<Value>> {
        let _flight = self.flights[collection.index()].lock().await;

        let snapshot = self.load_snapshot(collection).await;
        let staleness = self.classify(collection, snapshot.as_ref()).await;
        if let (Staleness::Fresh, Some(snapshot)) = (&staleness, snapshot) {
            tracing::debug!(collection = %collection, "snapshot fresh, serving from cache");
            return Ok(snapshot.documents);
        }

        if matches!(staleness, Staleness::Stale { prime_marker: true }) {
            if let Err(error) = self.tracker.bump(collection).await {
                tracing::warn!(collection = %collection, %error, "failed to prime staleness marker");
            }
        }

        tracing::debug!(collection = %collection, "snapshot stale, fetching from store");
        let documents = store.scan(collection.as_str(), query).await?;
        let snapshot = CollectionSnapshot {
            documents: documents.clone(),
            fetched_at: Utc::now(),
        };
        self.store_snapshot(collection, snapshot).await;
        Ok(documents)
    }

    /// Fetch a collection and deserialize its documents.
    pub async fn fetch_as<D, S>(
        &self,
        collection: Collection,
        query: &ScanQuery,
        store: &S,
    ) -> CellarResult<Vec<D>>
    where
        D: DeserializeOwned,
        S: DocumentStore,
    {
        let documents = self.fetch(collection, query, store).await?;
        documents
            .into_iter()
            .map(|document| {
                serde_json::from_value(document).map_err(|error| {
                    StoreError::Serialization {
                        collection: collection.as_str().to_string(),
                        reason: error.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }

    /// Drop the local snapshot for a collection.
    pub async fn invalidate(&self, collection: Collection) {
        self.entries.write().await.remove(&collection);
        if let Err(error) = self.local.remove(collection.snapshot_key()) {
            tracing::warn!(collection = %collection, %error, "failed to remove persisted snapshot");
        }
        if let Err(error) = self.local.remove(&collection.fetched_at_key()) {
            tracing::warn!(collection = %collection, %error, "failed to remove persisted fetch time");
        }
    }

    /// Decide hit vs. refetch for the current snapshot.
    async fn classify(
        &self,
        collection: Collection,
        snapshot: Option<&CollectionSnapshot>,
    ) -> Staleness {
        let marker = match self.tracker.last_update(collection).await {
            Ok(marker) => marker,
            Err(error) => {
                // Unknown staleness: refetch rather than trust the snapshot.
                tracing::warn!(collection = %collection, %error, "staleness marker unreadable");
                return Staleness::Stale { prime_marker: false };
            }
        };

        let Some(last_update) = marker else {
            return Staleness::Stale { prime_marker: true };
        };

        let Some(snapshot) = snapshot else {
            return Staleness::Stale { prime_marker: false };
        };

        let age = Utc::now()
            .signed_duration_since(snapshot.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age < self.cache_ttl && snapshot.fetched_at > last_update {
            Staleness::Fresh
        } else {
            Staleness::Stale { prime_marker: false }
        }
    }

    /// Load the snapshot from memory, falling back to local persistence.
    async fn load_snapshot(&self, collection: Collection) -> Option<CollectionSnapshot> {
        if let Some(snapshot) = self.entries.read().await.get(&collection) {
            return Some(snapshot.clone());
        }

        let snapshot = self.load_persisted(collection)?;
        self.entries
            .write()
            .await
            .insert(collection, snapshot.clone());
        Some(snapshot)
    }

    fn load_persisted(&self, collection: Collection) -> Option<CollectionSnapshot> {
        let raw_documents = match self.local.read(collection.snapshot_key()) {
            Ok(value) => value?,
            Err(error) => {
                tracing::warn!(collection = %collection, %error, "failed to read persisted snapshot");
                return None;
            }
        };
        let raw_fetched_at = match self.local.read(&collection.fetched_at_key()) {
            Ok(value) => value?,
            Err(error) => {
                tracing::warn!(collection = %collection, %error, "failed to read persisted fetch time");
                return None;
            }
        };

        let documents: Vec<Value> = match serde_json::from_str(&raw_documents) {
            Ok(documents) => documents,
            Err(error) => {
                tracing::warn!(collection = %collection, %error, "persisted snapshot unreadable, discarding");
                return None;
            }
        };
        let fetched_at = match DateTime::parse_from_rfc3339(&raw_fetched_at) {
            Ok(fetched_at) => fetched_at.with_timezone(&Utc),
            Err(error) => {
                tracing::warn!(collection = %collection, %error, "persisted fetch time unreadable, discarding");
                return None;
            }
        };

        Some(CollectionSnapshot {
            documents,
            fetched_at,
        })
    }

    /// Replace the snapshot in memory and persist it best-effort.
    ///
    /// The in-memory entry is authoritative; a persistence failure only
    /// costs a refetch after restart.
    async fn store_snapshot(&self, collection: Collection, snapshot: CollectionSnapshot) {
        match serde_json::to_string(&snapshot.documents) {
            Ok(serialized) => {
                if let Err(error) = self.local.write(collection.snapshot_key(), &serialized) {
                    tracing::warn!(collection = %collection, %error, "failed to persist snapshot");
                }
                if let Err(error) = self
                    .local
                    .write(&collection.fetched_at_key(), &snapshot.fetched_at.to_rfc3339())
                {
                    tracing::warn!(collection = %collection, %error, "failed to persist fetch time");
                }
            }
            Err(error) => {
                tracing::warn!(collection = %collection, %error, "failed to serialize snapshot");
            }
        }
        self.entries.write().await.insert(collection, snapshot);
    }
}
