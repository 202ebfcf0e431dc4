//! Document store adapter boundary for Canopy.
//!
//! This crate defines the surface the loader consumes -- nothing more. The
//! store owns persistence, indexing, and query execution; the loader only
//! addresses it through flat slash-joined paths.
//!
//! # Key Types
//!
//! - [`DocumentStore`] -- the adapter trait all backends implement
//! - [`StoredDocument`] -- a store-reported document: path plus raw fields
//! - [`CollectionRef`] -- opaque handle queries and ID generation run against
//! - [`Query`] -- caller-supplied predicate/ordering/limit, opaque to the loader
//! - [`WriteMode`] -- wholesale replace vs. top-level merge
//!
//! # Backends
//!
//! - [`InMemoryDocumentStore`] -- `BTreeMap`-based store for tests and embedding

pub mod document;
pub mod error;
pub mod memory;
pub mod query;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use document::{CollectionRef, StoredDocument, WriteMode};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDocumentStore;
pub use query::{Direction, Filter, FilterOp, OrderBy, Query};
pub use traits::DocumentStore;
