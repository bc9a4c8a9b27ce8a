//! Cellar Catalog - Derived-State Recomputation
//!
//! Recomputes each product's unit price and availability from its bill of
//! materials against current raw-material stock, and persists only the
//! products whose derived values actually changed. The computation itself
//! is a pure function ([`engine`]); [`client`] wires it to the store,
//! staleness tracker, and caches.

pub mod client;
pub mod engine;

pub use client::{CatalogClient, RefreshReport, WriteFailure};
pub use engine::{derive_product, recompute, DerivedState, ProductWrite, RecomputeOutcome};
