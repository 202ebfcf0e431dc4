use serde::{Deserialize, Serialize};

use canopy_types::Fields;

/// How a write applies to an existing document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Replace the document wholesale; unmentioned fields are dropped.
    Replace,
    /// Merge top-level fields onto the existing document, creating it if
    /// absent. Unmentioned fields survive.
    Merge,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replace => write!(f, "replace"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// A document as reported by the store: its full path and raw fields.
///
/// The store never injects derived fields; `id`/`path` injection into
/// records happens at the loader boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Full delimiter-joined address of the document.
    pub path: String,
    /// The stored field map.
    pub fields: Fields,
}

impl StoredDocument {
    /// Create a stored document from its address and fields.
    pub fn new(path: impl Into<String>, fields: Fields) -> Self {
        Self {
            path: path.into(),
            fields,
        }
    }

    /// The document's own name: the final path segment.
    pub fn document_id(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((_, id)) => id,
            None => &self.path,
        }
    }
}

/// Opaque handle over a collection, obtained from
/// `DocumentStore::get_collection`.
///
/// Queries and ID generation run against a handle rather than a raw path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionRef {
    path: String,
}

impl CollectionRef {
    /// Create a handle over the collection at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// The collection's full address.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The addressed collection's name: the final path segment.
    pub fn collection_name(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some((_, name)) => name,
            None => &self.path,
        }
    }
}
