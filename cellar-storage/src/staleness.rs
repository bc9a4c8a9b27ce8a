//! Per-collection staleness markers.
//!
//! Every mutating operation on a tracked collection bumps a marker
//! document holding a single timestamp. The read-through cache compares a
//! snapshot's fetch time against this marker to decide whether the
//! snapshot can still be trusted, which invalidates caches without
//! comparing full documents.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use cellar_core::{CellarResult, Collection, Timestamp, MARKER_COLLECTION};

use crate::store::DocumentStore;

/// Field inside a marker document holding the last server update time.
pub const MARKER_FIELD: &str = "last_update";

/// Records and reads the last-modified marker for a collection.
///
/// `last_update` returning `Ok(None)` means the marker was never bumped;
/// callers must treat that as "always stale". A read error means staleness
/// is unknown, and callers must degrade toward refetching rather than
/// trusting a local snapshot.
#[async_trait]
pub trait StalenessTracker: Send + Sync {
    /// Set the collection's marker to now. Creates the marker if missing.
    async fn bump(&self, collection: Collection) -> CellarResult<()>;

    /// Read the collection's marker.
    async fn last_update(&self, collection: Collection) -> CellarResult<Option<Timestamp>>;
}

/// Staleness tracker backed by marker documents in the remote store.
///
/// Markers live in the reserved `update_markers` collection, one document
/// per tracked collection, keyed by the collection name.
pub struct MarkerTracker<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> MarkerTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: DocumentStore> Clone for MarkerTracker<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> StalenessTracker for MarkerTracker<S> {
    async fn bump(&self, collection: Collection) -> CellarResult<()> {
        let marker = json!({ MARKER_FIELD: Utc::now().to_rfc3339() });
        self.store
            .set(MARKER_COLLECTION, collection.as_str(), marker)
            .await
    }

    async fn last_update(&self, collection: Collection) -> CellarResult<Option<Timestamp>> {
        let Some(document) = self.store.get(MARKER_COLLECTION, collection.as_str()).await? else {
            return Ok(None);
        };

        let parsed = document
            .get(MARKER_FIELD)
            .and_then(|v| v.as_str())
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc));
        if parsed.is_none() {
            // A malformed marker is indistinguishable from a missing one;
            // the next bump rewrites it.
            tracing::warn!(collection = %collection, "staleness marker unreadable, treating as never bumped");
        }
        Ok(parsed)
    }
}

/// In-memory staleness tracker for tests.
#[derive(Default)]
pub struct InMemoryTracker {
    markers: tokio::sync::RwLock<HashMap<Collection, Timestamp>>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StalenessTracker for InMemoryTracker {
    async fn bump(&self, collection: Collection) -> CellarResult<()> {
        self.markers.write().await.insert(collection, Utc::now());
        Ok(())
    }

    async fn last_update(&self, collection: Collection) -> CellarResult<Option<Timestamp>> {
        Ok(self.markers.read().await.get(&collection).copied())
    }
}
