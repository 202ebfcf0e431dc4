use async_trait::async_trait;

use crate::error::FetchError;

/// Batched fetch seam for the coalescing cache.
///
/// Receives the ordered list of keys accumulated in one coalescing window
/// and returns one result per key, positionally aligned. A result
/// sequence of the wrong length rejects the whole batch with
/// [`FetchError::ShapeMismatch`]; per-key failures reject only that key's
/// waiters.
#[async_trait]
pub trait BatchFetcher<K, V>: Send + Sync {
    async fn fetch_batch(&self, keys: &[K]) -> Vec<Result<V, FetchError>>;
}
