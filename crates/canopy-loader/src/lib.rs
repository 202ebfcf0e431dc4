//! High-level hierarchical document loader for Canopy.
//!
//! A [`DocumentLoader`] translates between a fixed collection template and
//! flat document addresses, and wraps every read in a request-coalescing,
//! indefinitely-memoizing cache: repeated or concurrent fetches for the
//! same logical document never issue more than one underlying store read.
//! Bulk reads and writes prime the cache so follow-up fetches are free.
//! This is the main entry point for applications embedding Canopy.

pub mod error;
pub mod loader;
pub mod target;

pub use error::{LoaderError, LoaderResult};
pub use loader::{DocumentLoader, LoaderConfig};
pub use target::{resolve_write_target, WriteTarget};

// Re-export key types
pub use canopy_cache::{BatchFetcher, BatchingCache, FailurePolicy, FetchError};
pub use canopy_store::{
    DocumentStore, InMemoryDocumentStore, Query, StoredDocument, WriteMode,
};
pub use canopy_types::{CollectionPathTemplate, DocumentPath, Fields, PathError, Record};
