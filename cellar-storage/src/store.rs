//! Remote document store abstraction.
//!
//! The hosted document database is an external collaborator; this trait is
//! the contract Cellar needs from it: ordered collection scans, point
//! reads/writes by id, and an atomic single-document field merge.
//! [`InMemoryStore`] implements the contract for tests and local runs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{Map, Value};

use cellar_core::{new_document_id, CellarResult, DocumentId, StoreError};

/// Sort direction for one scan key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One ordering key of a collection scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// An ordered collection scan with optional equality filters.
///
/// Filters are applied before ordering; sort keys are applied left to
/// right, later keys breaking ties of earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanQuery {
    pub order_by: Vec<SortKey>,
    pub filters: Vec<(String, Value)>,
}

impl ScanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ascending sort key.
    pub fn order_by_asc(mut self, field: impl Into<String>) -> Self {
        self.order_by.push(SortKey::asc(field));
        self
    }

    /// Append a descending sort key.
    pub fn order_by_desc(mut self, field: impl Into<String>) -> Self {
        self.order_by.push(SortKey::desc(field));
        self
    }

    /// Append an equality filter on a document field.
    pub fn filter_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }
}

/// Contract for the remote document database.
///
/// Implementations must treat every call as independent: there is no
/// transaction or cancellation concept, and `update` merges exactly the
/// given fields without touching any others.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Ordered scan of a named collection.
    async fn scan(&self, collection: &str, query: &ScanQuery) -> CellarResult<Vec<Value>>;

    /// Point read by id.
    async fn get(&self, collection: &str, id: &str) -> CellarResult<Option<Value>>;

    /// Create a document with a store-minted id. Returns the new id.
    async fn insert(&self, collection: &str, document: Value) -> CellarResult<DocumentId>;

    /// Upsert a whole document under a known id.
    async fn set(&self, collection: &str, id: &str, document: Value) -> CellarResult<()>;

    /// Atomically merge the given fields into one document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> CellarResult<()>;

    /// Delete a document by id. Deleting a missing document is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> CellarResult<()>;
}

/// Order two JSON scalars the way the remote store orders sort keys.
///
/// Missing fields and nulls sort first; numbers compare numerically,
/// strings lexicographically.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// In-memory document store for tests and local development.
///
/// Keeps documents per collection in insertion-id order, answers scans by
/// filtering and sorting clones, and counts scans per collection so cache
/// tests can assert how many round trips actually happened. Failure
/// injection flips the whole store unavailable or fails writes for chosen
/// document ids.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<DocumentId, Value>>>,
    scan_counts: RwLock<HashMap<String, u64>>,
    get_counts: RwLock<HashMap<String, u64>>,
    failing_write_ids: RwLock<HashSet<DocumentId>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scans served for a collection since construction.
    pub fn scan_count(&self, collection: &str) -> u64 {
        self.scan_counts
            .read()
            .expect("scan counter lock should not be poisoned")
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    /// Number of point reads served for a collection since construction.
    pub fn get_count(&self, collection: &str) -> u64 {
        self.get_counts
            .read()
            .expect("get counter lock should not be poisoned")
            .get(collection)
            .copied()
            .unwrap_or(0)
    }

    /// Make every call fail with `StoreError::Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    /// Make writes (set/update/delete) against one document id fail.
    pub fn fail_writes_for(&self, id: &str) {
        self.failing_write_ids
            .write()
            .expect("failure set lock should not be poisoned")
            .insert(id.to_string());
    }

    fn check_available(&self) -> CellarResult<()> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable {
                reason: "store marked unavailable".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_writable(&self, collection: &str, id: &str) -> CellarResult<()> {
        let failing = self
            .failing_write_ids
            .read()
            .expect("failure set lock should not be poisoned");
        if failing.contains(id) {
            return Err(StoreError::WriteFailed {
                collection: collection.to_string(),
                id: id.to_string(),
                reason: "write failure injected".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn scan(&self, collection: &str, query: &ScanQuery) -> CellarResult<Vec<Value>> {
        self.check_available()?;
        {
            let mut counts = self
                .scan_counts
                .write()
                .expect("scan counter lock should not be poisoned");
            *counts.entry(collection.to_string()).or_insert(0) += 1;
        }

        let collections = self
            .collections
            .read()
            .expect("collection lock should not be poisoned");
        let mut documents: Vec<Value> = collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();

        documents.retain(|doc| {
            query
                .filters
                .iter()
                .all(|(field, expected)| doc.get(field) == Some(expected))
        });

        documents.sort_by(|a, b| {
            for key in &query.order_by {
                let ordering = compare_values(a.get(&key.field), b.get(&key.field));
                let ordering = match key.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> CellarResult<Option<Value>> {
        self.check_available()?;
        {
            let mut counts = self
                .get_counts
                .write()
                .expect("get counter lock should not be poisoned");
            *counts.entry(collection.to_string()).or_insert(0) += 1;
        }
        let collections = self
            .collections
            .read()
            .expect("collection lock should not be poisoned");
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn insert(&self, collection: &str, mut document: Value) -> CellarResult<DocumentId> {
        self.check_available()?;
        let id = new_document_id();
        if let Value::Object(fields) = &mut document {
            fields.insert("id".to_string(), Value::String(id.clone()));
        }
        let mut collections = self
            .collections
            .write()
            .expect("collection lock should not be poisoned");
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> CellarResult<()> {
        self.check_available()?;
        self.check_writable(collection, id)?;
        let mut collections = self
            .collections
            .write()
            .expect("collection lock should not be poisoned");
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> CellarResult<()> {
        self.check_available()?;
        self.check_writable(collection, id)?;
        let mut collections = self
            .collections
            .write()
            .expect("collection lock should not be poisoned");
        let document = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        match document {
            Value::Object(existing) => {
                for (field, value) in fields {
                    existing.insert(field, value);
                }
                Ok(())
            }
            _ => Err(StoreError::WriteFailed {
                collection: collection.to_string(),
                id: id.to_string(),
                reason: "document is not an object".to_string(),
            }
            .into()),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> CellarResult<()> {
        self.check_available()?;
        self.check_writable(collection, id)?;
        let mut collections = self
            .collections
            .write()
            .expect("collection lock should not be poisoned");
        if let Some(docs) = collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}
