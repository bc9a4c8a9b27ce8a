//! Cache layer: collection snapshots and display names.
//!
//! Two caches with deliberately different policies live here:
//!
//! - [`ReadThroughCache`] holds one wholesale snapshot per collection,
//!   invalidated by the staleness marker and a 12-hour TTL. Collections
//!   change rarely relative to read volume, so a coarse collection-level
//!   gate amortizes most reads while a marker bump invalidates instantly.
//! - [`NameCache`] maps user ids to display names with a short per-entry
//!   TTL and a size bound, evicting oldest entries first. It is NOT wired
//!   to the staleness tracker: a ten-minute-stale display name is
//!   acceptable, and the policies must not be unified.

pub mod names;
pub mod read_through;

pub use names::{NameCache, NAME_CACHE_KEY};
pub use read_through::{CollectionSnapshot, ReadThroughCache};
