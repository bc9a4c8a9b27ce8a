//! Cellar Core - Entity Types
//!
//! Pure data structures with no behavior. All other crates depend on this.
//! This crate contains ONLY data types - no business logic and no I/O.

pub mod collection;
pub mod config;
pub mod entities;
pub mod error;

pub use collection::Collection;
pub use config::{CatalogConfig, MARKER_COLLECTION};
pub use entities::{
    BomLine, Material, NameCacheEntry, Order, OrderLine, OrderStatus, Product, User,
    UNKNOWN_USER_NAME,
};
pub use error::{
    CellarError, CellarResult, ConfigError, DataIntegrityWarning, IntegrityWarningKind,
    LocalCacheError, StoreError,
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Document identifier as assigned by the remote store.
///
/// The store treats ids as opaque strings; new documents are minted with
/// UUIDv7 so ids stay timestamp-sortable.
pub type DocumentId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new document id (timestamp-sortable UUIDv7).
pub fn new_document_id() -> DocumentId {
    Uuid::now_v7().to_string()
}
