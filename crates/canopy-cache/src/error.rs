use thiserror::Error;

/// Errors delivered to `load` callers.
///
/// Cloneable: one batch outcome fans out to every coalesced waiter, and a
/// memoized rejection is handed to every later load of the same key.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The fetcher reported no value for the key.
    #[error("no value for key: {0}")]
    NotFound(String),

    /// The fetcher failed for this key.
    #[error("fetch failed: {0}")]
    Store(String),

    /// The fetcher returned the wrong number of results for the batch.
    #[error("batch returned {actual} results for {expected} keys")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The dispatch task dropped the batch before completion.
    #[error("batch dispatch dropped before completion")]
    Dispatch,
}
