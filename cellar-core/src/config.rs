//! Configuration for the catalog engine and caches.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;

/// Reserved collection holding one staleness marker document per tracked
/// collection. Not itself tracked.
pub const MARKER_COLLECTION: &str = "update_markers";

/// Configuration for pricing, availability, and cache policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Flat amount added to every product price, covering shared
    /// consumables (ice, garnish, cup). Applied after rounding the raw
    /// material cost up.
    pub fixed_surcharge: f64,
    /// Minimum stock that must remain after producing one unit for a line
    /// to count as in stock. Zero means plain non-negativity.
    pub stock_buffer: f64,
    /// Minimum per-product quantity for a material to count in the
    /// "products containing these materials" filter.
    pub filter_quantity_floor: f64,
    /// Maximum age of a collection snapshot before a refetch is forced
    /// even without a marker bump.
    pub cache_ttl: Duration,
    /// Maximum age of a display-name cache entry.
    pub name_ttl: Duration,
    /// Bound on the display-name cache; oldest entries are evicted first.
    pub name_cache_max_entries: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            fixed_surcharge: 50.0,
            stock_buffer: 0.0,
            filter_quantity_floor: 15.0,
            cache_ttl: Duration::from_secs(12 * 60 * 60),
            name_ttl: Duration::from_secs(10 * 60),
            name_cache_max_entries: 100,
        }
    }
}

impl CatalogConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fixed surcharge.
    pub fn with_surcharge(mut self, surcharge: f64) -> Self {
        self.fixed_surcharge = surcharge;
        self
    }

    /// Set the minimum stock buffer.
    pub fn with_stock_buffer(mut self, buffer: f64) -> Self {
        self.stock_buffer = buffer;
        self
    }

    /// Set the snapshot TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the display-name entry TTL.
    pub fn with_name_ttl(mut self, ttl: Duration) -> Self {
        self.name_ttl = ttl;
        self
    }

    /// Set the display-name cache bound.
    pub fn with_name_cache_max_entries(mut self, max: usize) -> Self {
        self.name_cache_max_entries = max;
        self
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fixed_surcharge < 0.0 || !self.fixed_surcharge.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "fixed_surcharge".to_string(),
                value: self.fixed_surcharge.to_string(),
                reason: "must be finite and non-negative".to_string(),
            });
        }
        if self.stock_buffer < 0.0 || !self.stock_buffer.is_finite() {
            return Err(ConfigError::InvalidValue {
                field: "stock_buffer".to_string(),
                value: self.stock_buffer.to_string(),
                reason: "must be finite and non-negative".to_string(),
            });
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.name_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "name_ttl".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.name_cache_max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "name_cache_max_entries".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
