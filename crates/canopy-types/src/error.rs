use thiserror::Error;

/// Errors from path construction and decomposition.
///
/// All variants are raised synchronously, before any I/O is attempted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The collection template was constructed with no collection names.
    #[error("collection path template must not be empty")]
    EmptyTemplate,

    /// A collection or document name contains the path delimiter.
    #[error("name contains path delimiter '/': {0:?}")]
    DelimiterInName(String),

    /// Wrong number of document names for a full document path.
    #[error("document path requires {expected} document names, got {actual}")]
    DocumentNameCount { expected: usize, actual: usize },

    /// Wrong number of document names for a collection path.
    #[error("collection path requires {expected} document names, got {actual}")]
    CollectionNameCount { expected: usize, actual: usize },

    /// A raw path string does not decompose into collection/document pairs.
    #[error("malformed document path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },
}

/// Result alias for path operations.
pub type PathResult<T> = Result<T, PathError>;
