//! Request-coalescing, memoizing cache for Canopy.
//!
//! [`BatchingCache`] removes duplicate work: all loads issued in one
//! coalescing window become a single batched fetch, and every outcome is
//! memoized for the instance's lifetime. It is resilience through
//! de-duplication, not fault tolerance -- there are no retries, no TTLs,
//! and no eviction beyond the optional [`FailurePolicy::Evict`] handling
//! of rejected fetches.
//!
//! # Key Types
//!
//! - [`BatchingCache`] -- the keyed coalescing memoizer
//! - [`BatchFetcher`] -- the batched fetch seam backends implement
//! - [`FailurePolicy`] -- memoize vs. evict rejected fetches
//! - [`FetchError`] -- cloneable per-key failure fanned out to waiters

pub mod cache;
pub mod error;
pub mod fetcher;

pub use cache::{BatchingCache, CacheConfig, FailurePolicy};
pub use error::FetchError;
pub use fetcher::BatchFetcher;
