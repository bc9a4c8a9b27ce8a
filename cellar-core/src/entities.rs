//! Entity types for the catalog domain.
//!
//! These mirror the documents held by the remote store. Derived fields on
//! [`Product`] (`price`, `is_available`) are owned by the recomputation
//! engine; everything else is set by administrators through the CRUD layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DocumentId;

/// Placeholder display name when a user record is missing or unreadable.
pub const UNKNOWN_USER_NAME: &str = "unknown user";

/// A raw material held in stock.
///
/// `total_amount` counts natural units on hand (bottles, packs);
/// `unit_capacity` is the base-unit volume of one natural unit (ml per
/// bottle); `unit_price` is the cost of one natural unit. Cost per base
/// unit is therefore `unit_price / unit_capacity`, which requires
/// `unit_capacity > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: DocumentId,
    pub name: String,
    pub category: String,
    pub total_amount: f64,
    pub unit_capacity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub note: String,
}

impl Material {
    /// True when per-base-unit cost can be computed for this material.
    pub fn has_valid_capacity(&self) -> bool {
        self.unit_capacity > 0.0
    }
}

/// One bill-of-materials line: a material consumed by a product.
///
/// Owned by the containing [`Product`]; `material_id` is a foreign lookup
/// key into the materials collection, not an ownership edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomLine {
    pub material_id: DocumentId,
    /// Base units of the material consumed per product unit.
    pub quantity: f64,
}

/// A sellable product.
///
/// `price` and `is_available` are derived from the bill of materials and
/// current stock; the recomputation engine is the only writer of those two
/// fields. The presentation fields ride along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: DocumentId,
    pub name: String,
    /// Derived: ceil(raw material cost) + fixed surcharge.
    pub price: f64,
    /// Derived: true iff every line's material has enough stock for one unit.
    pub is_available: bool,
    pub materials: Vec<BomLine>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Base spirits this product is built on.
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub image_url: String,
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Submitted, not yet handled by staff.
    Pending,
    /// Served, payment outstanding.
    Unpaid,
    Paid,
}

/// One product position inside an order.
///
/// Name and price are copied at order time so the order stays a faithful
/// receipt even after the product changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: DocumentId,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

/// A submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: DocumentId,
    pub user_id: DocumentId,
    pub lines: Vec<OrderLine>,
    pub total_price: f64,
    #[serde(default)]
    pub note: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// An account known to the auth provider.
///
/// An empty `role` means the account has not been approved yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: DocumentId,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub role: String,
    /// Outstanding balance.
    #[serde(default)]
    pub bill: f64,
}

impl User {
    pub fn is_approved(&self) -> bool {
        !self.role.is_empty()
    }
}

/// One entry in the bounded display-name cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameCacheEntry {
    pub display_name: String,
    pub cached_at: DateTime<Utc>,
}
