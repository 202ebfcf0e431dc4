use thiserror::Error;

use canopy_store::StoreError;
use canopy_types::PathError;

/// Errors from loader operations.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// Path construction or validation failure, raised before any I/O.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Store adapter failure on a query or write path.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A write's read-back found no document at the written path.
    #[error("written document missing on read-back: {0}")]
    ReadBack(String),
}

/// Result alias for loader operations.
pub type LoaderResult<T> = Result<T, LoaderError>;
