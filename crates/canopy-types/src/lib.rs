//! Foundation types for Canopy, the hierarchical document loader.
//!
//! This crate provides the path codec and the record shape used throughout
//! the Canopy system. Every other Canopy crate depends on `canopy-types`.
//!
//! # Key Types
//!
//! - [`CollectionPathTemplate`] -- Ordered collection names fixed at loader construction
//! - [`DocumentPath`] -- Flat interleaved document address (the cache/store key)
//! - [`CollectionPath`] -- Flat address ending on a collection name
//! - [`Record`] -- Stored fields plus the injected `id`/`path`
//! - [`PathError`] -- Synchronous path validation failures

pub mod error;
pub mod path;
pub mod record;

pub use error::{PathError, PathResult};
pub use path::{
    validate_name, CollectionPath, CollectionPathTemplate, DocumentPath, PATH_DELIMITER,
};
pub use record::{Fields, Record};
