//! Error types for Cellar operations.

use thiserror::Error;

use crate::DocumentId;

/// Remote store errors.
///
/// Collections are identified by their store-side names here (not the
/// [`crate::Collection`] enum) because the store also holds reserved
/// collections such as the staleness markers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Document not found: {collection} with id {id}")]
    NotFound { collection: String, id: DocumentId },

    #[error("Write failed for {collection} with id {id}: {reason}")]
    WriteFailed {
        collection: String,
        id: DocumentId,
        reason: String,
    },

    #[error("Serialization failed for {collection}: {reason}")]
    Serialization { collection: String, reason: String },
}

/// Device-local cache persistence errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocalCacheError {
    #[error("Local store access failed for key {key}: {reason}")]
    Io { key: String, reason: String },

    #[error("Cached value under key {key} could not be decoded: {reason}")]
    Decode { key: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Cellar errors.
#[derive(Debug, Clone, Error)]
pub enum CellarError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Local cache error: {0}")]
    LocalCache(#[from] LocalCacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Cellar operations.
pub type CellarResult<T> = Result<T, CellarError>;

/// What went wrong with a bill-of-materials line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityWarningKind {
    /// The line references a material id with no matching document.
    MissingMaterial,
    /// The material's `unit_capacity` is not positive, so per-base-unit
    /// cost and stock coverage cannot be computed.
    NonPositiveUnitCapacity,
}

/// A recoverable data-integrity problem found during recomputation.
///
/// Warnings are collected and reported; they never abort recomputation of
/// other lines or other products.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataIntegrityWarning {
    pub product_id: DocumentId,
    pub material_id: DocumentId,
    pub kind: IntegrityWarningKind,
}

impl std::fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            IntegrityWarningKind::MissingMaterial => write!(
                f,
                "product {} references missing material {}",
                self.product_id, self.material_id
            ),
            IntegrityWarningKind::NonPositiveUnitCapacity => write!(
                f,
                "material {} used by product {} has non-positive unit capacity",
                self.material_id, self.product_id
            ),
        }
    }
}
