//! Cellar Storage - Storage Traits, Staleness Tracking, and Caches
//!
//! Defines the storage abstraction layer for Cellar: the [`DocumentStore`]
//! trait over the remote document database, device-local persistence behind
//! [`LocalStore`], the per-collection [`StalenessTracker`], and the two
//! caches (collection snapshots and display names). The remote store itself
//! is an external collaborator; [`InMemoryStore`] stands in for it in tests.

pub mod cache;
pub mod local;
pub mod staleness;
pub mod store;

pub use cache::{CollectionSnapshot, NameCache, ReadThroughCache, NAME_CACHE_KEY};
pub use local::{InMemoryLocalStore, LocalStore};
pub use staleness::{InMemoryTracker, MarkerTracker, StalenessTracker, MARKER_FIELD};
pub use store::{DocumentStore, InMemoryStore, ScanQuery, SortDirection, SortKey};
