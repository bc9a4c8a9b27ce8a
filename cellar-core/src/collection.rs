//! Collection discriminator for cache keys and staleness markers.

use serde::{Deserialize, Serialize};

/// The logical collections held by the remote store.
///
/// Every cached snapshot and every staleness marker is keyed by one of
/// these variants, so a cache entry for an unknown collection cannot be
/// constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Materials,
    Products,
    Orders,
    Users,
}

impl Collection {
    /// All tracked collections, in declaration order.
    pub const ALL: [Collection; 4] = [
        Collection::Materials,
        Collection::Products,
        Collection::Orders,
        Collection::Users,
    ];

    /// Stable collection name as used by the remote store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Materials => "materials",
            Collection::Products => "products",
            Collection::Orders => "orders",
            Collection::Users => "users",
        }
    }

    /// Dense index for fixed-size per-collection tables (lock arrays).
    pub fn index(&self) -> usize {
        match self {
            Collection::Materials => 0,
            Collection::Products => 1,
            Collection::Orders => 2,
            Collection::Users => 3,
        }
    }

    /// Local persistence key for the serialized snapshot.
    pub fn snapshot_key(&self) -> &'static str {
        self.as_str()
    }

    /// Local persistence key for the snapshot's fetch timestamp.
    pub fn fetched_at_key(&self) -> String {
        format!("{}.fetched_at", self.as_str())
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
