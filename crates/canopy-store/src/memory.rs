use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use canopy_types::Fields;

use crate::document::{CollectionRef, StoredDocument, WriteMode};
use crate::error::{StoreError, StoreResult};
use crate::query::{compare_values, Direction, Query};
use crate::traits::DocumentStore;

/// Length of generated document names.
const GENERATED_ID_LEN: usize = 20;

/// In-memory, `BTreeMap`-based document store.
///
/// Intended for tests and embedding. Documents are held behind an `RwLock`
/// keyed by their full path; the ordered map gives unordered queries a
/// stable path order. Fields are cloned on read/write.
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<String, Fields>>,
}

impl InMemoryDocumentStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.documents.read().expect("store lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents
            .read()
            .expect("store lock poisoned")
            .is_empty()
    }

    /// Remove all documents from the store.
    pub fn clear(&self) {
        self.documents.write().expect("store lock poisoned").clear();
    }

    /// All document paths in order.
    pub fn all_paths(&self) -> Vec<String> {
        self.documents
            .read()
            .expect("store lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Insert a document directly, bypassing write-mode handling.
    pub fn insert(&self, path: impl Into<String>, fields: Fields) {
        self.documents
            .write()
            .expect("store lock poisoned")
            .insert(path.into(), fields);
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &count)
            .finish()
    }
}

/// Count path segments, rejecting empty ones.
fn validate_segments(path: &str) -> StoreResult<usize> {
    let mut count = 0;
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: "empty segment".to_string(),
            });
        }
        count += 1;
    }
    Ok(count)
}

/// A document address has an even segment count.
fn expect_document_path(path: &str) -> StoreResult<()> {
    if validate_segments(path)? % 2 != 0 {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "does not address a document".to_string(),
        });
    }
    Ok(())
}

/// A collection address has an odd segment count.
fn expect_collection_path(path: &str) -> StoreResult<()> {
    if validate_segments(path)? % 2 == 0 {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
            reason: "does not address a collection".to_string(),
        });
    }
    Ok(())
}

/// True if `path` is a direct child document of the collection at `prefix`.
fn is_direct_child(path: &str, collection_path: &str) -> bool {
    match path.strip_prefix(collection_path) {
        Some(rest) => {
            rest.starts_with('/') && !rest[1..].is_empty() && !rest[1..].contains('/')
        }
        None => false,
    }
}

/// True if the document at `path` lives in a collection named `name`.
fn in_collection_named(path: &str, name: &str) -> bool {
    let segments: Vec<&str> = path.split('/').collect();
    segments.len() >= 2 && segments.len() % 2 == 0 && segments[segments.len() - 2] == name
}

/// Sort by the ordering clause (if any), then cap to the limit (if any).
fn apply_order_and_limit(mut docs: Vec<StoredDocument>, query: &Query) -> Vec<StoredDocument> {
    if let Some(order) = &query.order_by {
        docs.sort_by(|a, b| {
            let ord = match (a.fields.get(&order.field), b.fields.get(&order.field)) {
                (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            match order.direction {
                Direction::Ascending => ord,
                Direction::Descending => ord.reverse(),
            }
        });
    }
    if let Some(limit) = query.limit {
        docs.truncate(limit);
    }
    docs
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, path: &str) -> StoreResult<Option<StoredDocument>> {
        expect_document_path(path)?;
        let map = self.documents.read().expect("store lock poisoned");
        Ok(map
            .get(path)
            .map(|fields| StoredDocument::new(path, fields.clone())))
    }

    async fn get_collection(&self, path: &str) -> StoreResult<CollectionRef> {
        expect_collection_path(path)?;
        Ok(CollectionRef::new(path))
    }

    async fn apply_query(
        &self,
        collection: &CollectionRef,
        query: &Query,
    ) -> StoreResult<Vec<StoredDocument>> {
        let map = self.documents.read().expect("store lock poisoned");
        let hits = map
            .iter()
            .filter(|(path, _)| is_direct_child(path, collection.path()))
            .filter(|(_, fields)| query.matches(fields))
            .map(|(path, fields)| StoredDocument::new(path.clone(), fields.clone()))
            .collect();
        Ok(apply_order_and_limit(hits, query))
    }

    async fn apply_collection_group_query(
        &self,
        collection_name: &str,
        query: &Query,
    ) -> StoreResult<Vec<StoredDocument>> {
        let map = self.documents.read().expect("store lock poisoned");
        let hits = map
            .iter()
            .filter(|(path, _)| in_collection_named(path, collection_name))
            .filter(|(_, fields)| query.matches(fields))
            .map(|(path, fields)| StoredDocument::new(path.clone(), fields.clone()))
            .collect();
        Ok(apply_order_and_limit(hits, query))
    }

    async fn generate_id(&self, _collection: &CollectionRef) -> StoreResult<String> {
        let mut rng = rand::thread_rng();
        let id: String = (0..GENERATED_ID_LEN)
            .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
            .collect();
        Ok(id)
    }

    async fn write_document(
        &self,
        path: &str,
        fields: &Fields,
        mode: WriteMode,
    ) -> StoreResult<()> {
        expect_document_path(path)?;
        let mut map = self.documents.write().expect("store lock poisoned");
        match mode {
            WriteMode::Replace => {
                map.insert(path.to_string(), fields.clone());
            }
            WriteMode::Merge => {
                let existing = map.entry(path.to_string()).or_default();
                for (key, value) in fields {
                    existing.insert(key.clone(), value.clone());
                }
            }
        }
        debug!(path, mode = %mode, "document written");
        Ok(())
    }
}
