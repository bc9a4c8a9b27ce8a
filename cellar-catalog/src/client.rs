//! Catalog client.
//!
//! Wires the remote store, staleness tracker, and caches together behind
//! one typed surface. Every mutating operation funnels through a single
//! write path that bumps the collection's staleness marker, so "every
//! mutation bumps its marker" holds by construction rather than by
//! convention at each call site.

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use serde_json::{json, Map, Value};

use cellar_core::{
    CatalogConfig, CellarError, CellarResult, Collection, DataIntegrityWarning, DocumentId,
    Material, Order, OrderLine, OrderStatus, Product, StoreError, User,
};
use cellar_storage::{
    DocumentStore, LocalStore, MarkerTracker, NameCache, ReadThroughCache, ScanQuery,
    StalenessTracker,
};

use crate::engine::{recompute, RecomputeOutcome};

/// One product whose derived-field write failed while others succeeded.
#[derive(Debug, Clone)]
pub struct WriteFailure {
    pub product_id: DocumentId,
    pub error: CellarError,
}

/// Result of a catalog refresh.
///
/// Failures are per-product: one failed write never aborts the others.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    /// All products with derived fields brought up to date in memory.
    pub products: Vec<Product>,
    /// How many products actually needed a write.
    pub writes_attempted: usize,
    pub failures: Vec<WriteFailure>,
    pub warnings: Vec<DataIntegrityWarning>,
}

impl RefreshReport {
    /// True when every attempted write landed and no integrity warnings
    /// were raised.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// A single mutating operation against an existing document.
enum StoreWrite {
    Set { id: DocumentId, document: Value },
    Merge { id: DocumentId, fields: Map<String, Value> },
    Delete { id: DocumentId },
}

/// Typed client over the catalog collections.
///
/// Reads of materials, products, and users go through the read-through
/// cache; orders are read directly (order history is small and rarely
/// re-read). Mutations write to the store and bump the staleness marker.
pub struct CatalogClient<S: DocumentStore, L: LocalStore> {
    store: Arc<S>,
    tracker: Arc<MarkerTracker<S>>,
    cache: ReadThroughCache<L, MarkerTracker<S>>,
    names: NameCache<L>,
    config: CatalogConfig,
}

impl<S: DocumentStore, L: LocalStore> CatalogClient<S, L> {
    /// Create a client over a store and a device-local cache store.
    pub fn new(store: Arc<S>, local: Arc<L>, config: CatalogConfig) -> Self {
        let tracker = Arc::new(MarkerTracker::new(Arc::clone(&store)));
        let cache = ReadThroughCache::new(
            Arc::clone(&local),
            Arc::clone(&tracker),
            config.cache_ttl,
        );
        let names = NameCache::new(local, config.name_ttl, config.name_cache_max_entries);
        Self {
            store,
            tracker,
            cache,
            names,
            config,
        }
    }

    /// Get the catalog configuration.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    // ========================================================================
    // CACHED READS
    // ========================================================================

    /// All materials, ordered by category (desc) then name (asc).
    pub async fn materials(&self) -> CellarResult<Vec<Material>> {
        let query = ScanQuery::new().order_by_desc("category").order_by_asc("name");
        self.cache
            .fetch_as(Collection::Materials, &query, self.store.as_ref())
            .await
    }

    /// Materials whose category contains the given fragment.
    pub async fn materials_by_category(&self, category: &str) -> CellarResult<Vec<Material>> {
        let materials = self.materials().await?;
        Ok(materials
            .into_iter()
            .filter(|material| material.category.contains(category))
            .collect())
    }

    /// All products, ordered by name.
    pub async fn products(&self) -> CellarResult<Vec<Product>> {
        let query = ScanQuery::new().order_by_asc("name");
        self.cache
            .fetch_as(Collection::Products, &query, self.store.as_ref())
            .await
    }

    /// Products filtered by current availability.
    pub async fn products_by_availability(&self, is_available: bool) -> CellarResult<Vec<Product>> {
        let products = self.products().await?;
        Ok(products
            .into_iter()
            .filter(|product| product.is_available == is_available)
            .collect())
    }

    /// Products whose bill of materials uses every given material id with
    /// at least the configured quantity floor.
    pub async fn products_using_materials(
        &self,
        material_ids: &[&str],
    ) -> CellarResult<Vec<Product>> {
        let floor = self.config.filter_quantity_floor;
        let products = self.products().await?;
        Ok(products
            .into_iter()
            .filter(|product| {
                material_ids.iter().all(|material_id| {
                    product
                        .materials
                        .iter()
                        .any(|line| line.material_id == *material_id && line.quantity >= floor)
                })
            })
            .collect())
    }

    /// All users, ordered by display name.
    pub async fn users(&self) -> CellarResult<Vec<User>> {
        let query = ScanQuery::new().order_by_asc("display_name");
        self.cache
            .fetch_as(Collection::Users, &query, self.store.as_ref())
            .await
    }

    /// Users filtered by role. `None` returns everyone; an empty role
    /// selects accounts that have not been approved yet.
    pub async fn users_by_role(&self, role: Option<&str>) -> CellarResult<Vec<User>> {
        let users = self.users().await?;
        Ok(match role {
            None => users,
            Some(role) => users.into_iter().filter(|user| user.role == role).collect(),
        })
    }

    /// Resolve a user id to a display name through the bounded name cache.
    pub async fn resolve_display_name(&self, user_id: &str) -> String {
        self.names.resolve(user_id, self.store.as_ref()).await
    }

    // ========================================================================
    // ORDER READS (uncached)
    // ========================================================================

    /// All orders, oldest first.
    pub async fn orders(&self) -> CellarResult<Vec<Order>> {
        let query = ScanQuery::new().order_by_asc("created_at");
        self.scan_orders(query).await
    }

    /// One user's orders, oldest first.
    pub async fn orders_by_user(&self, user_id: &str) -> CellarResult<Vec<Order>> {
        let query = ScanQuery::new()
            .filter_eq("user_id", json!(user_id))
            .order_by_asc("created_at");
        self.scan_orders(query).await
    }

    /// One user's orders still awaiting payment.
    pub async fn unpaid_orders_by_user(&self, user_id: &str) -> CellarResult<Vec<Order>> {
        let query = ScanQuery::new()
            .filter_eq("user_id", json!(user_id))
            .filter_eq("status", json!("unpaid"))
            .order_by_asc("created_at");
        self.scan_orders(query).await
    }

    async fn scan_orders(&self, query: ScanQuery) -> CellarResult<Vec<Order>> {
        let documents = self
            .store
            .scan(Collection::Orders.as_str(), &query)
            .await?;
        documents
            .into_iter()
            .map(|document| {
                serde_json::from_value(document).map_err(|error| {
                    StoreError::Serialization {
                        collection: Collection::Orders.as_str().to_string(),
                        reason: error.to_string(),
                    }
                    .into()
                })
            })
            .collect()
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Create a material. Returns the store-minted id.
    pub async fn add_material(&self, material: &Material) -> CellarResult<DocumentId> {
        let document = to_document(Collection::Materials, material)?;
        self.apply_insert(Collection::Materials, document).await
    }

    /// Replace a material under its existing id.
    pub async fn update_material(&self, material: &Material) -> CellarResult<()> {
        let document = to_document(Collection::Materials, material)?;
        self.apply_write(
            Collection::Materials,
            StoreWrite::Set {
                id: material.id.clone(),
                document,
            },
        )
        .await?;
        Ok(())
    }

    pub async fn delete_material(&self, id: &str) -> CellarResult<()> {
        self.apply_write(
            Collection::Materials,
            StoreWrite::Delete { id: id.to_string() },
        )
        .await?;
        Ok(())
    }

    /// Create a product. Returns the store-minted id.
    pub async fn add_product(&self, product: &Product) -> CellarResult<DocumentId> {
        let document = to_document(Collection::Products, product)?;
        self.apply_insert(Collection::Products, document).await
    }

    /// Replace a product under its existing id.
    pub async fn update_product(&self, product: &Product) -> CellarResult<()> {
        let document = to_document(Collection::Products, product)?;
        self.apply_write(
            Collection::Products,
            StoreWrite::Set {
                id: product.id.clone(),
                document,
            },
        )
        .await?;
        Ok(())
    }

    pub async fn delete_product(&self, id: &str) -> CellarResult<()> {
        self.apply_write(
            Collection::Products,
            StoreWrite::Delete { id: id.to_string() },
        )
        .await?;
        Ok(())
    }

    /// Submit a new order for a user. Returns the store-minted id.
    pub async fn create_order(
        &self,
        user_id: &str,
        lines: Vec<OrderLine>,
        note: &str,
    ) -> CellarResult<DocumentId> {
        let total_price = lines
            .iter()
            .map(|line| line.price * f64::from(line.quantity))
            .sum();
        let order = Order {
            id: String::new(),
            user_id: user_id.to_string(),
            lines,
            total_price,
            note: note.to_string(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        let document = to_document(Collection::Orders, &order)?;
        self.apply_insert(Collection::Orders, document).await
    }

    /// Move an order to a new lifecycle status.
    pub async fn update_order_status(&self, id: &str, status: OrderStatus) -> CellarResult<()> {
        let mut fields = Map::new();
        fields.insert(
            "status".to_string(),
            serde_json::to_value(status).map_err(|error| StoreError::Serialization {
                collection: Collection::Orders.as_str().to_string(),
                reason: error.to_string(),
            })?,
        );
        self.apply_write(
            Collection::Orders,
            StoreWrite::Merge {
                id: id.to_string(),
                fields,
            },
        )
        .await?;
        Ok(())
    }

    /// Replace a user record under its existing id.
    pub async fn update_user(&self, user: &User) -> CellarResult<()> {
        let document = to_document(Collection::Users, user)?;
        self.apply_write(
            Collection::Users,
            StoreWrite::Set {
                id: user.id.clone(),
                document,
            },
        )
        .await?;
        Ok(())
    }

    pub async fn delete_user(&self, id: &str) -> CellarResult<()> {
        self.apply_write(Collection::Users, StoreWrite::Delete { id: id.to_string() })
            .await?;
        Ok(())
    }

    /// The write path for new documents: insert, then bump the
    /// collection's staleness marker.
    async fn apply_insert(&self, collection: Collection, document: Value) -> CellarResult<DocumentId> {
        let id = self.store.insert(collection.as_str(), document).await?;
        self.tracker.bump(collection).await?;
        Ok(id)
    }

    /// The write path for existing documents: perform the store
    /// operation, then bump the collection's staleness marker.
    async fn apply_write(&self, collection: Collection, write: StoreWrite) -> CellarResult<()> {
        let name = collection.as_str();
        match write {
            StoreWrite::Set { id, document } => self.store.set(name, &id, document).await?,
            StoreWrite::Merge { id, fields } => self.store.update(name, &id, fields).await?,
            StoreWrite::Delete { id } => self.store.delete(name, &id).await?,
        }
        self.tracker.bump(collection).await?;
        Ok(())
    }

    // ========================================================================
    // CATALOG REFRESH
    // ========================================================================

    /// Recompute every product's derived fields and persist the deltas.
    ///
    /// The compute phase is pure; the emitted writes target disjoint
    /// product ids and are issued concurrently with no ordering between
    /// them. A failed write is collected per product and never aborts the
    /// others. The products marker is bumped once if any write landed, so
    /// every client refetches on its next read.
    pub async fn refresh_catalog(&self) -> CellarResult<RefreshReport> {
        let materials = self.materials().await?;
        let products = self.products().await?;

        let RecomputeOutcome {
            products,
            writes,
            warnings,
        } = recompute(&materials, &products, &self.config);

        for warning in &warnings {
            tracing::warn!(%warning, "data integrity warning during catalog refresh");
        }

        let results = join_all(writes.iter().map(|write| {
            let store = Arc::clone(&self.store);
            async move {
                store
                    .update(Collection::Products.as_str(), &write.product_id, write.fields())
                    .await
                    .err()
                    .map(|error| WriteFailure {
                        product_id: write.product_id.clone(),
                        error,
                    })
            }
        }))
        .await;
        let failures: Vec<WriteFailure> = results.into_iter().flatten().collect();

        if writes.len() > failures.len() {
            self.tracker.bump(Collection::Products).await?;
        }

        Ok(RefreshReport {
            products,
            writes_attempted: writes.len(),
            failures,
            warnings,
        })
    }
}

/// Serialize an entity into a store document.
fn to_document<E: serde::Serialize>(collection: Collection, entity: &E) -> CellarResult<Value> {
    serde_json::to_value(entity).map_err(|error| {
        StoreError::Serialization {
            collection: collection.as_str().to_string(),
            reason: error.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_core::BomLine;
    use cellar_storage::{InMemoryLocalStore, InMemoryStore};

    fn make_material(id: &str, total_amount: f64, unit_capacity: f64, unit_price: f64) -> Material {
        Material {
            id: id.to_string(),
            name: format!("material {id}"),
            category: "spirits".to_string(),
            total_amount,
            unit_capacity,
            unit_price,
            note: String::new(),
        }
    }

    fn make_product(id: &str, price: f64, is_available: bool, lines: Vec<BomLine>) -> Product {
        Product {
            id: id.to_string(),
            name: format!("product {id}"),
            price,
            is_available,
            materials: lines,
            description: String::new(),
            categories: vec![],
            bases: vec![],
            image_url: String::new(),
        }
    }

    fn line(material_id: &str, quantity: f64) -> BomLine {
        BomLine {
            material_id: material_id.to_string(),
            quantity,
        }
    }

    async fn seed<S: DocumentStore>(store: &S, collection: Collection, id: &str, value: Value) {
        store
            .set(collection.as_str(), id, value)
            .await
            .expect("seed should succeed");
    }

    fn make_client(store: &Arc<InMemoryStore>) -> CatalogClient<InMemoryStore, InMemoryLocalStore> {
        CatalogClient::new(
            Arc::clone(store),
            Arc::new(InMemoryLocalStore::new()),
            CatalogConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_mutation_invalidates_cached_reads() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);
        let material = make_material("m1", 2.0, 1.0, 100.0);
        seed(
            store.as_ref(),
            Collection::Materials,
            "m1",
            serde_json::to_value(&material).expect("serialize should succeed"),
        )
        .await;

        assert_eq!(client.materials().await.expect("read should succeed").len(), 1);
        assert_eq!(client.materials().await.expect("read should succeed").len(), 1);
        assert_eq!(store.scan_count("materials"), 1);

        let mut updated = material.clone();
        updated.total_amount = 5.0;
        client
            .update_material(&updated)
            .await
            .expect("update should succeed");

        let materials = client.materials().await.expect("read should succeed");
        assert_eq!(store.scan_count("materials"), 2);
        assert_eq!(materials[0].total_amount, 5.0);
    }

    #[tokio::test]
    async fn test_refresh_catalog_persists_only_deltas() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);
        seed(
            store.as_ref(),
            Collection::Materials,
            "m1",
            serde_json::to_value(make_material("m1", 2.0, 1.0, 100.0))
                .expect("serialize should succeed"),
        )
        .await;
        seed(
            store.as_ref(),
            Collection::Products,
            "p1",
            serde_json::to_value(make_product("p1", 0.0, false, vec![line("m1", 1.0)]))
                .expect("serialize should succeed"),
        )
        .await;

        let report = client.refresh_catalog().await.expect("refresh should succeed");
        assert!(report.is_clean());
        assert_eq!(report.writes_attempted, 1);

        let document = store
            .get("products", "p1")
            .await
            .expect("get should succeed")
            .expect("product should exist");
        assert_eq!(document["price"], json!(150.0));
        assert_eq!(document["is_available"], json!(true));
        // Unrelated fields survive the derived-field merge.
        assert_eq!(document["name"], json!("product p1"));

        // The bump invalidates cached products, so the next read sees the
        // refreshed values.
        let products = client.products().await.expect("read should succeed");
        assert_eq!(products[0].price, 150.0);

        // Nothing changed, so a second refresh writes nothing.
        let report = client.refresh_catalog().await.expect("refresh should succeed");
        assert_eq!(report.writes_attempted, 0);
    }

    #[tokio::test]
    async fn test_refresh_collects_partial_write_failures() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);
        seed(
            store.as_ref(),
            Collection::Materials,
            "m1",
            serde_json::to_value(make_material("m1", 10.0, 1.0, 100.0))
                .expect("serialize should succeed"),
        )
        .await;
        for id in ["p1", "p2"] {
            seed(
                store.as_ref(),
                Collection::Products,
                id,
                serde_json::to_value(make_product(id, 0.0, false, vec![line("m1", 1.0)]))
                    .expect("serialize should succeed"),
            )
            .await;
        }
        store.fail_writes_for("p2");

        let report = client.refresh_catalog().await.expect("refresh should succeed");
        assert_eq!(report.writes_attempted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].product_id, "p2");

        // The sibling write still landed.
        let document = store
            .get("products", "p1")
            .await
            .expect("get should succeed")
            .expect("product should exist");
        assert_eq!(document["price"], json!(150.0));
    }

    #[tokio::test]
    async fn test_refresh_reports_integrity_warnings() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);
        seed(
            store.as_ref(),
            Collection::Products,
            "p1",
            serde_json::to_value(make_product("p1", 0.0, true, vec![line("ghost", 1.0)]))
                .expect("serialize should succeed"),
        )
        .await;

        let report = client.refresh_catalog().await.expect("refresh should succeed");
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].material_id, "ghost");
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn test_order_lifecycle_roundtrip() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);

        let id = client
            .create_order(
                "u1",
                vec![OrderLine {
                    product_id: "p1".to_string(),
                    name: "Gimlet".to_string(),
                    quantity: 2,
                    price: 700.0,
                }],
                "no ice",
            )
            .await
            .expect("create should succeed");

        let orders = client.orders_by_user("u1").await.expect("read should succeed");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total_price, 1400.0);
        assert_eq!(orders[0].status, OrderStatus::Pending);
        assert!(client
            .unpaid_orders_by_user("u1")
            .await
            .expect("read should succeed")
            .is_empty());

        client
            .update_order_status(&id, OrderStatus::Unpaid)
            .await
            .expect("update should succeed");
        let unpaid = client
            .unpaid_orders_by_user("u1")
            .await
            .expect("read should succeed");
        assert_eq!(unpaid.len(), 1);
        assert_eq!(unpaid[0].id, id);
    }

    #[tokio::test]
    async fn test_users_by_role_distinguishes_unapproved() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);
        for (id, name, role) in [("u1", "Alice", "staff"), ("u2", "Bob", ""), ("u3", "Eve", "staff")] {
            let user = User {
                id: id.to_string(),
                display_name: name.to_string(),
                email: format!("{id}@example.com"),
                is_admin: false,
                role: role.to_string(),
                bill: 0.0,
            };
            seed(
                store.as_ref(),
                Collection::Users,
                id,
                serde_json::to_value(&user).expect("serialize should succeed"),
            )
            .await;
        }

        assert_eq!(
            client.users_by_role(None).await.expect("read should succeed").len(),
            3
        );
        assert_eq!(
            client
                .users_by_role(Some("staff"))
                .await
                .expect("read should succeed")
                .len(),
            2
        );
        let unapproved = client
            .users_by_role(Some(""))
            .await
            .expect("read should succeed");
        assert_eq!(unapproved.len(), 1);
        assert_eq!(unapproved[0].display_name, "Bob");
    }

    #[tokio::test]
    async fn test_resolve_display_name_uses_bounded_cache() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);
        let user = User {
            id: "u1".to_string(),
            display_name: "Alice".to_string(),
            email: "u1@example.com".to_string(),
            is_admin: false,
            role: "staff".to_string(),
            bill: 0.0,
        };
        seed(
            store.as_ref(),
            Collection::Users,
            "u1",
            serde_json::to_value(&user).expect("serialize should succeed"),
        )
        .await;

        assert_eq!(client.resolve_display_name("u1").await, "Alice");
        assert_eq!(client.resolve_display_name("u1").await, "Alice");
        assert_eq!(store.get_count("users"), 1);
        assert_eq!(
            client.resolve_display_name("missing").await,
            cellar_core::UNKNOWN_USER_NAME
        );
    }

    #[tokio::test]
    async fn test_products_using_materials_honors_quantity_floor() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);
        let products = [
            make_product("p1", 100.0, true, vec![line("m1", 45.0)]),
            make_product("p2", 100.0, true, vec![line("m1", 10.0)]),
            make_product("p3", 100.0, true, vec![line("m2", 45.0)]),
        ];
        for product in &products {
            seed(
                store.as_ref(),
                Collection::Products,
                &product.id,
                serde_json::to_value(product).expect("serialize should succeed"),
            )
            .await;
        }

        // Default floor is 15: p2's 10 units of m1 do not qualify.
        let matching = client
            .products_using_materials(&["m1"])
            .await
            .expect("read should succeed");
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, "p1");
    }

    #[tokio::test]
    async fn test_add_material_returns_minted_id() {
        let store = Arc::new(InMemoryStore::new());
        let client = make_client(&store);

        let id = client
            .add_material(&make_material("", 2.0, 1.0, 100.0))
            .await
            .expect("add should succeed");
        assert!(!id.is_empty());

        let materials = client.materials().await.expect("read should succeed");
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].id, id);
    }
}
