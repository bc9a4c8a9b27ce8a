//! Pure recomputation of derived product fields.
//!
//! Walks every product's bill of materials against current stock and
//! recomputes the two derived fields, price and availability. No I/O
//! happens here; the caller executes the emitted writes.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use cellar_core::{
    CatalogConfig, DataIntegrityWarning, DocumentId, IntegrityWarningKind, Material, Product,
};

/// Write operation for one product's derived fields.
///
/// Names exactly the two derived fields so applying it can never clobber
/// unrelated product data.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductWrite {
    pub product_id: DocumentId,
    pub price: f64,
    pub is_available: bool,
}

impl ProductWrite {
    /// The field merge to apply against the product document.
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("price".to_string(), json!(self.price));
        fields.insert("is_available".to_string(), json!(self.is_available));
        fields
    }
}

/// Derived values for one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedState {
    pub price: f64,
    pub is_available: bool,
}

/// Result of a full catalog recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeOutcome {
    /// All products with their derived fields brought up to date.
    pub products: Vec<Product>,
    /// One write per product whose derived fields changed.
    pub writes: Vec<ProductWrite>,
    /// Data-integrity problems found along the way.
    pub warnings: Vec<DataIntegrityWarning>,
}

/// Derive price and availability for one product.
///
/// Lines are walked in the product's own order. A line whose material is
/// missing (or has a non-positive unit capacity) contributes zero cost
/// and raises a warning, but does NOT flip availability - only an
/// explicit insufficient-stock determination does. Once availability
/// flips it stays flipped, while cost keeps accumulating across the
/// remaining lines: the price must come out the same whether or not the
/// product happens to be sold out.
pub fn derive_product(
    product: &Product,
    materials_by_id: &HashMap<&str, &Material>,
    config: &CatalogConfig,
) -> (DerivedState, Vec<DataIntegrityWarning>) {
    let mut is_available = true;
    let mut raw_cost = 0.0;
    let mut warnings = Vec::new();

    for line in &product.materials {
        let Some(material) = materials_by_id.get(line.material_id.as_str()) else {
            warnings.push(DataIntegrityWarning {
                product_id: product.id.clone(),
                material_id: line.material_id.clone(),
                kind: IntegrityWarningKind::MissingMaterial,
            });
            continue;
        };

        if !material.has_valid_capacity() {
            warnings.push(DataIntegrityWarning {
                product_id: product.id.clone(),
                material_id: line.material_id.clone(),
                kind: IntegrityWarningKind::NonPositiveUnitCapacity,
            });
            continue;
        }

        let base_units = line.quantity / material.unit_capacity;
        if is_available && material.total_amount - base_units < config.stock_buffer {
            is_available = false;
        }
        raw_cost += material.unit_price * base_units;
    }

    let state = DerivedState {
        price: raw_cost.ceil() + config.fixed_surcharge,
        is_available,
    };
    (state, warnings)
}

/// Recompute derived fields for every product.
///
/// Pure over its inputs: materials are read-only, products are cloned and
/// updated in memory, and the emitted writes are returned for the caller
/// to execute. Work is O(products x average bill-of-materials length).
pub fn recompute(
    materials: &[Material],
    products: &[Product],
    config: &CatalogConfig,
) -> RecomputeOutcome {
    let materials_by_id: HashMap<&str, &Material> = materials
        .iter()
        .map(|material| (material.id.as_str(), material))
        .collect();

    let mut updated = Vec::with_capacity(products.len());
    let mut writes = Vec::new();
    let mut warnings = Vec::new();

    for product in products {
        let (derived, mut product_warnings) = derive_product(product, &materials_by_id, config);
        warnings.append(&mut product_warnings);

        let mut product = product.clone();
        if derived.price != product.price || derived.is_available != product.is_available {
            product.price = derived.price;
            product.is_available = derived.is_available;
            writes.push(ProductWrite {
                product_id: product.id.clone(),
                price: derived.price,
                is_available: derived.is_available,
            });
        }
        updated.push(product);
    }

    RecomputeOutcome {
        products: updated,
        writes,
        warnings,
    }
}
