use async_trait::async_trait;

use canopy_types::Fields;

use crate::document::{CollectionRef, StoredDocument, WriteMode};
use crate::error::StoreResult;
use crate::query::Query;

/// Hierarchical document store.
///
/// The loader consumes exactly this surface; implementations decide
/// persistence, indexing, and transactional behavior. All implementations
/// must satisfy these invariants:
/// - Absence is `Ok(None)`, never an error.
/// - Query results come back in a stable, backend-defined order.
/// - One path's failure in a batch read never affects sibling paths.
/// - All I/O errors are propagated, never silently ignored.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document at `path`.
    ///
    /// Returns `Ok(None)` if no document exists there.
    async fn get_document(&self, path: &str) -> StoreResult<Option<StoredDocument>>;

    /// Read multiple documents, one result per path.
    ///
    /// Default implementation calls `get_document()` for each path.
    /// Backends may override for fewer round-trips. Results are
    /// positionally aligned with `paths`; failures are per-path.
    async fn get_documents(&self, paths: &[String]) -> Vec<StoreResult<Option<StoredDocument>>> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            results.push(self.get_document(path).await);
        }
        results
    }

    /// Obtain a handle over the collection at `path`.
    async fn get_collection(&self, path: &str) -> StoreResult<CollectionRef>;

    /// Run `query` against a collection, returning matches in store order.
    async fn apply_query(
        &self,
        collection: &CollectionRef,
        query: &Query,
    ) -> StoreResult<Vec<StoredDocument>>;

    /// Run `query` against every collection named `collection_name`,
    /// regardless of ancestor path.
    async fn apply_collection_group_query(
        &self,
        collection_name: &str,
        query: &Query,
    ) -> StoreResult<Vec<StoredDocument>>;

    /// Mint a store-unique document name under the given collection.
    async fn generate_id(&self, collection: &CollectionRef) -> StoreResult<String>;

    /// Persist `fields` at `path` according to `mode`.
    async fn write_document(&self, path: &str, fields: &Fields, mode: WriteMode)
        -> StoreResult<()>;
}
