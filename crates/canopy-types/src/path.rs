//! Path template and codec: interleaving collection names with document
//! names into flat addresses, and decomposing store-reported addresses
//! back into their document names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PathError, PathResult};

/// Separator between path segments.
pub const PATH_DELIMITER: char = '/';

/// Validate a single collection or document name.
///
/// Names must not contain the path delimiter. Validation runs before any
/// length check so a bad name is always reported as such.
pub fn validate_name(name: &str) -> PathResult<()> {
    if name.contains(PATH_DELIMITER) {
        return Err(PathError::DelimiterInName(name.to_string()));
    }
    Ok(())
}

/// Ordered, immutable list of collection names fixed at loader
/// construction.
///
/// The template defines one loader's addressing scheme: a document address
/// interleaves these collection names with caller-supplied document names,
/// `c0/d0/c1/d1/…`. A constructed template is always non-empty and
/// delimiter-free.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPathTemplate {
    names: Vec<String>,
}

impl CollectionPathTemplate {
    /// Build a template from an ordered list of collection names.
    ///
    /// Fails with `EmptyTemplate` for an empty list and `DelimiterInName`
    /// for any name containing the delimiter, before any state is built.
    pub fn new<I, S>(names: I) -> PathResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(PathError::EmptyTemplate);
        }
        for name in &names {
            validate_name(name)?;
        }
        Ok(Self { names })
    }

    /// Number of collection levels.
    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// The collection names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The innermost collection name (the target of collection-group
    /// queries).
    pub fn leaf_collection(&self) -> &str {
        self.names.last().expect("template is never empty")
    }

    /// Build the full interleaved document path `c0/d0/c1/d1/…`.
    ///
    /// Requires exactly one document name per collection level, else
    /// `DocumentNameCount`.
    pub fn document_path(&self, doc_names: &[&str]) -> PathResult<DocumentPath> {
        for name in doc_names {
            validate_name(name)?;
        }
        if doc_names.len() != self.names.len() {
            return Err(PathError::DocumentNameCount {
                expected: self.names.len(),
                actual: doc_names.len(),
            });
        }
        let mut segments = Vec::with_capacity(self.names.len() * 2);
        for (collection, doc) in self.names.iter().zip(doc_names) {
            segments.push(collection.as_str());
            segments.push(doc);
        }
        Ok(DocumentPath(segments.join("/")))
    }

    /// Build the collection path `c0/d0/…/c(n-1)`, ending on a collection
    /// name.
    ///
    /// Requires one document name fewer than the number of collection
    /// levels, else `CollectionNameCount`.
    pub fn collection_path(&self, doc_names: &[&str]) -> PathResult<CollectionPath> {
        for name in doc_names {
            validate_name(name)?;
        }
        if doc_names.len() + 1 != self.names.len() {
            return Err(PathError::CollectionNameCount {
                expected: self.names.len() - 1,
                actual: doc_names.len(),
            });
        }
        let mut segments = Vec::with_capacity(self.names.len() * 2 - 1);
        for (collection, doc) in self.names.iter().zip(doc_names) {
            segments.push(collection.as_str());
            segments.push(doc);
        }
        segments.push(self.leaf_collection());
        Ok(CollectionPath(segments.join("/")))
    }
}

/// Flat interleaved document address: `c0/d0/c1/d1/…`.
///
/// Serves as both the cache key and the address handed to the store. The
/// segment count is always even and every segment is non-empty when the
/// path came through [`DocumentPath::parse`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse a store-reported path string.
    ///
    /// The path must have an even number of non-empty segments.
    pub fn parse(raw: &str) -> PathResult<Self> {
        let segments: Vec<&str> = raw.split(PATH_DELIMITER).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(PathError::MalformedPath {
                path: raw.to_string(),
                reason: "empty segment".to_string(),
            });
        }
        if segments.len() % 2 != 0 {
            return Err(PathError::MalformedPath {
                path: raw.to_string(),
                reason: format!("odd segment count {}", segments.len()),
            });
        }
        Ok(Self(raw.to_string()))
    }

    /// The joined address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document's own name: the final path segment.
    pub fn document_id(&self) -> &str {
        match self.0.rsplit_once(PATH_DELIMITER) {
            Some((_, id)) => id,
            None => &self.0,
        }
    }

    /// Recover the caller-supplied document names: every odd-index
    /// segment. The inverse of [`CollectionPathTemplate::document_path`].
    pub fn document_names(&self) -> Vec<&str> {
        self.0.split(PATH_DELIMITER).skip(1).step_by(2).collect()
    }

    /// All path segments in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_DELIMITER)
    }
}

impl fmt::Debug for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentPath({})", self.0)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.0
    }
}

/// Flat collection address: `c0/d0/…/ck`, ending on a collection name.
///
/// The segment count is always odd.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// The joined address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The addressed collection's name: the final path segment.
    pub fn collection_name(&self) -> &str {
        match self.0.rsplit_once(PATH_DELIMITER) {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// The document path for `doc_name` inside this collection.
    pub fn child(&self, doc_name: &str) -> PathResult<DocumentPath> {
        validate_name(doc_name)?;
        Ok(DocumentPath(format!("{}/{}", self.0, doc_name)))
    }
}

impl fmt::Debug for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionPath({})", self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CollectionPath> for String {
    fn from(path: CollectionPath) -> Self {
        path.0
    }
}
