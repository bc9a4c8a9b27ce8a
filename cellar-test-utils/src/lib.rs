//! Cellar Test Utilities
//!
//! Centralized test infrastructure for the Cellar workspace:
//! - Proptest generators for catalog entities
//! - Deterministic fixtures for common scenarios

// Re-export the in-memory doubles from their source crate
pub use cellar_storage::{InMemoryLocalStore, InMemoryStore, InMemoryTracker};

// Re-export core types for convenience
pub use cellar_core::{
    BomLine, CatalogConfig, CellarError, CellarResult, Collection, DataIntegrityWarning,
    IntegrityWarningKind, Material, Order, OrderLine, OrderStatus, Product, StoreError, User,
};

use proptest::prelude::*;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Strategy for a material with the given id.
///
/// Amounts and prices are drawn from small integer-valued ranges so the
/// cost arithmetic stays well-conditioned; capacities are strictly
/// positive (invalid capacities are injected explicitly where a test
/// wants them).
pub fn arb_material(id: String) -> impl Strategy<Value = Material> {
    (0u32..=20, 1u32..=1000, 0u32..=5000).prop_map(move |(amount, capacity, price)| Material {
        id: id.clone(),
        name: format!("material {id}"),
        category: "spirits".to_string(),
        total_amount: f64::from(amount),
        unit_capacity: f64::from(capacity),
        unit_price: f64::from(price),
        note: String::new(),
    })
}

/// Strategy for a full material list with ids `m0..mN`.
pub fn arb_materials(max_count: usize) -> impl Strategy<Value = Vec<Material>> {
    prop::collection::vec((0u32..=20, 1u32..=1000, 0u32..=5000), 1..=max_count).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (amount, capacity, price))| Material {
                id: format!("m{i}"),
                name: format!("material m{i}"),
                category: "spirits".to_string(),
                total_amount: f64::from(amount),
                unit_capacity: f64::from(capacity),
                unit_price: f64::from(price),
                note: String::new(),
            })
            .collect()
    })
}

/// Strategy for one bill-of-materials line referencing `m0..material_count`.
pub fn arb_bom_line(material_count: usize) -> impl Strategy<Value = BomLine> {
    (0..material_count, 1u32..=2000).prop_map(|(index, quantity)| BomLine {
        material_id: format!("m{index}"),
        quantity: f64::from(quantity),
    })
}

/// Strategy for a product list with ids `p0..pN` whose lines reference
/// the first `material_count` material ids.
pub fn arb_products(max_count: usize, material_count: usize) -> impl Strategy<Value = Vec<Product>> {
    prop::collection::vec(
        (
            prop::collection::vec(arb_bom_line(material_count), 0..=6),
            0u32..=5000,
            any::<bool>(),
        ),
        1..=max_count,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (lines, price, is_available))| Product {
                id: format!("p{i}"),
                name: format!("product p{i}"),
                price: f64::from(price),
                is_available,
                materials: lines,
                description: String::new(),
                categories: vec![],
                bases: vec![],
                image_url: String::new(),
            })
            .collect()
    })
}

/// Strategy for a coherent catalog: materials plus products whose bills
/// of materials only reference existing material ids.
pub fn arb_catalog() -> impl Strategy<Value = (Vec<Material>, Vec<Product>)> {
    arb_materials(8).prop_flat_map(|materials| {
        let material_count = materials.len();
        (Just(materials), arb_products(8, material_count))
    })
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A small deterministic catalog: three materials, three products, one of
/// them short on stock.
pub fn sample_catalog() -> (Vec<Material>, Vec<Product>) {
    let materials = vec![
        Material {
            id: "m-gin".to_string(),
            name: "Gin".to_string(),
            category: "spirits".to_string(),
            total_amount: 3.0,
            unit_capacity: 700.0,
            unit_price: 2000.0,
            note: String::new(),
        },
        Material {
            id: "m-lime".to_string(),
            name: "Lime juice".to_string(),
            category: "juice".to_string(),
            total_amount: 2.0,
            unit_capacity: 1000.0,
            unit_price: 600.0,
            note: String::new(),
        },
        Material {
            id: "m-cassis".to_string(),
            name: "Creme de cassis".to_string(),
            category: "liqueur".to_string(),
            total_amount: 0.0,
            unit_capacity: 700.0,
            unit_price: 1500.0,
            note: "reorder pending".to_string(),
        },
    ];
    let products = vec![
        Product {
            id: "p-gimlet".to_string(),
            name: "Gimlet".to_string(),
            price: 0.0,
            is_available: false,
            materials: vec![
                BomLine {
                    material_id: "m-gin".to_string(),
                    quantity: 45.0,
                },
                BomLine {
                    material_id: "m-lime".to_string(),
                    quantity: 15.0,
                },
            ],
            description: String::new(),
            categories: vec!["sour".to_string()],
            bases: vec!["gin".to_string()],
            image_url: String::new(),
        },
        Product {
            id: "p-cassis-soda".to_string(),
            name: "Cassis soda".to_string(),
            price: 0.0,
            is_available: true,
            materials: vec![BomLine {
                material_id: "m-cassis".to_string(),
                quantity: 45.0,
            }],
            description: String::new(),
            categories: vec!["highball".to_string()],
            bases: vec!["cassis".to_string()],
            image_url: String::new(),
        },
        Product {
            id: "p-gin-soda".to_string(),
            name: "Gin soda".to_string(),
            price: 0.0,
            is_available: false,
            materials: vec![BomLine {
                material_id: "m-gin".to_string(),
                quantity: 30.0,
            }],
            description: String::new(),
            categories: vec!["highball".to_string()],
            bases: vec!["gin".to_string()],
            image_url: String::new(),
        },
    ];
    (materials, products)
}
