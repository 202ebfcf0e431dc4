use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use canopy_cache::{BatchFetcher, BatchingCache, CacheConfig, FailurePolicy, FetchError};
use canopy_store::{DocumentStore, Query, StoredDocument, WriteMode};
use canopy_types::{CollectionPathTemplate, DocumentPath, Fields, Record};

use crate::error::{LoaderError, LoaderResult};
use crate::target::{resolve_write_target, WriteTarget};

/// Configuration for a [`DocumentLoader`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LoaderConfig {
    /// Handling of rejected fetches in the read-through cache.
    pub failure_policy: FailurePolicy,
}

/// Bridges the cache's batch seam to the store's batch read.
struct StoreFetcher {
    store: Arc<dyn DocumentStore>,
}

#[async_trait]
impl BatchFetcher<String, Record> for StoreFetcher {
    async fn fetch_batch(&self, keys: &[String]) -> Vec<Result<Record, FetchError>> {
        let results = self.store.get_documents(keys).await;
        keys.iter()
            .zip(results)
            .map(|(key, result)| match result {
                Ok(Some(doc)) => record_from_stored(doc),
                Ok(None) => Err(FetchError::NotFound(key.clone())),
                Err(err) => Err(FetchError::Store(err.to_string())),
            })
            .collect()
    }
}

/// Inject `id`/`path` into a store-reported document.
fn record_from_stored(doc: StoredDocument) -> Result<Record, FetchError> {
    let path =
        DocumentPath::parse(&doc.path).map_err(|err| FetchError::Store(err.to_string()))?;
    Ok(Record::new(&path, doc.fields))
}

/// Hierarchical document loader: template-addressed reads and writes over
/// a [`DocumentStore`], de-duplicated through a request-coalescing cache.
///
/// The loader owns its cache exclusively. Entries live as long as the
/// loader instance and are never shared across loaders, even for
/// overlapping addresses.
pub struct DocumentLoader {
    template: CollectionPathTemplate,
    store: Arc<dyn DocumentStore>,
    cache: BatchingCache<String, Record>,
}

impl DocumentLoader {
    /// Create a loader for the given collection template.
    ///
    /// Fails with `EmptyTemplate` or `DelimiterInName` before any state
    /// is built.
    pub fn new<I, S>(store: Arc<dyn DocumentStore>, collection_names: I) -> LoaderResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(store, collection_names, LoaderConfig::default())
    }

    /// Create a loader with an explicit configuration.
    pub fn with_config<I, S>(
        store: Arc<dyn DocumentStore>,
        collection_names: I,
        config: LoaderConfig,
    ) -> LoaderResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let template = CollectionPathTemplate::new(collection_names)?;
        let fetcher = Arc::new(StoreFetcher {
            store: Arc::clone(&store),
        });
        let cache = BatchingCache::with_config(
            fetcher,
            CacheConfig {
                failure_policy: config.failure_policy,
            },
        );
        Ok(Self {
            template,
            store,
            cache,
        })
    }

    /// The loader's collection template.
    pub fn template(&self) -> &CollectionPathTemplate {
        &self.template
    }

    /// The underlying store adapter.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Fetch one document by its full name selector.
    ///
    /// Concurrent calls for the same document coalesce into one store
    /// read, and a resolved document is served from cache for the
    /// loader's lifetime. Returns `Ok(None)` for any per-key fetch
    /// failure, including plain absence; only malformed arguments error,
    /// before any I/O.
    pub async fn fetch_by_id(&self, doc_names: &[&str]) -> LoaderResult<Option<Record>> {
        let path = self.template.document_path(doc_names)?;
        Ok(self.cache.load(String::from(path)).await.ok())
    }

    /// Run `query` against the addressed collection.
    ///
    /// Results come back in store order. Every returned document is
    /// primed into the cache, so a later `fetch_by_id` for it is served
    /// without another store round trip.
    pub async fn fetch_by_query(
        &self,
        query: &Query,
        doc_names: &[&str],
    ) -> LoaderResult<Vec<Record>> {
        let path = self.template.collection_path(doc_names)?;
        let collection = self.store.get_collection(path.as_str()).await?;
        let docs = self.store.apply_query(&collection, query).await?;
        self.prime_all(docs)
    }

    /// Run `query` against every collection named like the template's
    /// innermost collection, regardless of ancestor path.
    ///
    /// Ancestor chains vary per result, so priming uses each document's
    /// store-reported path, never one computed from the template.
    pub async fn fetch_by_collection_group_query(
        &self,
        query: &Query,
    ) -> LoaderResult<Vec<Record>> {
        let docs = self
            .store
            .apply_collection_group_query(self.template.leaf_collection(), query)
            .await?;
        self.prime_all(docs)
    }

    /// Fetch every document in the addressed collection.
    pub async fn fetch_all(&self, doc_names: &[&str]) -> LoaderResult<Vec<Record>> {
        self.fetch_by_query(&Query::all(), doc_names).await
    }

    /// Create or update a document.
    ///
    /// A full selector writes at that exact document; a one-short
    /// selector writes under a store-generated name in the addressed
    /// collection. `overwrite` selects wholesale replacement, otherwise
    /// the payload is merged onto any existing document. Returns the
    /// store's materialized shape read back after the write -- which may
    /// differ from the submitted payload -- and re-primes the cache with
    /// it.
    pub async fn create_doc(
        &self,
        fields: Fields,
        overwrite: bool,
        doc_names: &[&str],
    ) -> LoaderResult<Record> {
        let path = match resolve_write_target(&self.template, doc_names)? {
            WriteTarget::Exact(path) => path,
            WriteTarget::Generated(collection_path) => {
                let collection = self.store.get_collection(collection_path.as_str()).await?;
                let id = self.store.generate_id(&collection).await?;
                collection_path.child(&id)?
            }
        };
        let mode = if overwrite {
            WriteMode::Replace
        } else {
            WriteMode::Merge
        };
        self.store.write_document(path.as_str(), &fields, mode).await?;
        debug!(path = path.as_str(), mode = %mode, "document written");

        // Read back straight from the store: the authoritative
        // materialized shape, not the submitted payload and not a stale
        // cache entry.
        let stored = self
            .store
            .get_document(path.as_str())
            .await?
            .ok_or_else(|| LoaderError::ReadBack(path.as_str().to_string()))?;
        let doc_path = DocumentPath::parse(&stored.path)?;
        let record = Record::new(&doc_path, stored.fields);
        self.cache.prime(record.path.clone(), record.clone());
        Ok(record)
    }

    /// Convert store documents to records, priming each under its
    /// store-reported path.
    fn prime_all(&self, docs: Vec<StoredDocument>) -> LoaderResult<Vec<Record>> {
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let path = DocumentPath::parse(&doc.path)?;
            let record = Record::new(&path, doc.fields);
            self.cache.prime(record.path.clone(), record.clone());
            records.push(record);
        }
        Ok(records)
    }
}

impl std::fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("template", &self.template)
            .field("cache", &self.cache)
            .finish()
    }
}
