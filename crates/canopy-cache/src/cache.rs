//! The coalescing cache: one batched fetch per window, permanent
//! memoization, out-of-band priming.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::BatchFetcher;

/// What to do with a cache entry whose fetch failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep the rejection for the cache's lifetime; later loads observe
    /// the same error without refetching.
    #[default]
    Memoize,
    /// Drop the entry once waiters are notified; the next load refetches.
    Evict,
}

/// Configuration for a [`BatchingCache`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheConfig {
    /// Handling of rejected fetches. See [`FailurePolicy`].
    pub failure_policy: FailurePolicy,
}

/// Outcome delivered through a pending slot.
type Outcome<V> = Result<V, FetchError>;

/// Watch channel carrying `None` until the batch distributes results.
type Slot<V> = watch::Receiver<Option<Outcome<V>>>;

enum Entry<V> {
    /// Registered in a coalescing window. `ticket` identifies the
    /// registration so a later prime can displace the eventual result.
    Pending { ticket: u64, slot: Slot<V> },
    Resolved(V),
    Rejected(FetchError),
}

struct PendingKey<K, V> {
    key: K,
    ticket: u64,
    tx: watch::Sender<Option<Outcome<V>>>,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Keys accumulated in the current coalescing window, dispatch order.
    window: Vec<PendingKey<K, V>>,
    /// True while a spawned flush task is due to drain the window.
    flush_scheduled: bool,
    next_ticket: u64,
}

/// Keyed request-coalescing memoizer.
///
/// All `load` calls issued within one cooperative unit of work are grouped
/// into a single `fetch_batch` call; every resolved value is held for the
/// cache's lifetime, rejections per [`FailurePolicy`]. [`prime`] installs
/// values out of band; the freshest write wins.
///
/// Entries are never evicted or refreshed automatically -- the memoization
/// horizon is the owning instance's lifetime.
///
/// [`prime`]: BatchingCache::prime
pub struct BatchingCache<K, V> {
    fetcher: Arc<dyn BatchFetcher<K, V>>,
    inner: Arc<Mutex<Inner<K, V>>>,
    policy: FailurePolicy,
}

impl<K, V> BatchingCache<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache over `fetcher` with the default configuration.
    pub fn new(fetcher: Arc<dyn BatchFetcher<K, V>>) -> Self {
        Self::with_config(fetcher, CacheConfig::default())
    }

    /// Create a cache over `fetcher` with an explicit configuration.
    pub fn with_config(fetcher: Arc<dyn BatchFetcher<K, V>>, config: CacheConfig) -> Self {
        Self {
            fetcher,
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                window: Vec::new(),
                flush_scheduled: false,
                next_ticket: 0,
            })),
            policy: config.failure_policy,
        }
    }

    /// Load the value for `key`, coalescing with concurrent loads.
    ///
    /// A resolved or rejected entry returns immediately without I/O. A
    /// pending entry subscribes to the in-flight batch -- no duplicate
    /// fetch is issued. An unrequested key joins the current coalescing
    /// window and resolves when the window's single batch fetch does.
    pub async fn load(&self, key: K) -> Result<V, FetchError> {
        let mut slot = {
            let mut inner = self.inner.lock().expect("cache lock poisoned");
            let subscribed = match inner.entries.get(&key) {
                Some(Entry::Resolved(value)) => return Ok(value.clone()),
                Some(Entry::Rejected(err)) => return Err(err.clone()),
                Some(Entry::Pending { slot, .. }) => Some(slot.clone()),
                None => None,
            };
            match subscribed {
                Some(slot) => slot,
                None => {
                    let (tx, rx) = watch::channel(None);
                    let ticket = inner.next_ticket;
                    inner.next_ticket += 1;
                    inner.entries.insert(
                        key.clone(),
                        Entry::Pending {
                            ticket,
                            slot: rx.clone(),
                        },
                    );
                    inner.window.push(PendingKey { key, ticket, tx });
                    if !inner.flush_scheduled {
                        inner.flush_scheduled = true;
                        self.spawn_flush();
                    }
                    rx
                }
            }
        };
        loop {
            {
                let outcome = slot.borrow_and_update();
                if let Some(outcome) = &*outcome {
                    return outcome.clone();
                }
            }
            if slot.changed().await.is_err() {
                return Err(FetchError::Dispatch);
            }
        }
    }

    /// Install a resolved value for `key`, overwriting any prior state.
    ///
    /// An in-flight fetch for the key is not retracted -- its waiters still
    /// receive the batch outcome -- but that outcome will not displace the
    /// primed value. Priming never triggers a fetch.
    pub fn prime(&self, key: K, value: V) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.insert(key, Entry::Resolved(value));
    }

    /// Dispatch the current coalescing window immediately.
    pub async fn flush(&self) {
        Self::run_flush(
            Arc::clone(&self.fetcher),
            Arc::clone(&self.inner),
            self.policy,
        )
        .await;
    }

    /// Number of entries in any state (pending, resolved, or rejected).
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("cache lock poisoned")
            .entries
            .len()
    }

    /// Returns `true` if no key has ever been loaded or primed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has an entry in any state.
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner
            .lock()
            .expect("cache lock poisoned")
            .entries
            .contains_key(key)
    }

    fn spawn_flush(&self) {
        let fetcher = Arc::clone(&self.fetcher);
        let inner = Arc::clone(&self.inner);
        let policy = self.policy;
        tokio::spawn(async move {
            // Let every load already scheduled in this unit of work
            // enqueue before the window drains.
            tokio::task::yield_now().await;
            Self::run_flush(fetcher, inner, policy).await;
        });
    }

    async fn run_flush(
        fetcher: Arc<dyn BatchFetcher<K, V>>,
        inner: Arc<Mutex<Inner<K, V>>>,
        policy: FailurePolicy,
    ) {
        let window = {
            let mut guard = inner.lock().expect("cache lock poisoned");
            guard.flush_scheduled = false;
            std::mem::take(&mut guard.window)
        };
        if window.is_empty() {
            return;
        }

        let keys: Vec<K> = window.iter().map(|pending| pending.key.clone()).collect();
        debug!(keys = keys.len(), "dispatching batch fetch");
        let mut results = fetcher.fetch_batch(&keys).await;
        if results.len() != keys.len() {
            let err = FetchError::ShapeMismatch {
                expected: keys.len(),
                actual: results.len(),
            };
            results = window.iter().map(|_| Err(err.clone())).collect();
        }

        let mut guard = inner.lock().expect("cache lock poisoned");
        for (pending, outcome) in window.into_iter().zip(results) {
            // Install only if this registration still owns the entry; a
            // prime issued after dispatch wins over the batch outcome.
            let owns = matches!(
                guard.entries.get(&pending.key),
                Some(Entry::Pending { ticket, .. }) if *ticket == pending.ticket
            );
            if owns {
                match (&outcome, policy) {
                    (Ok(value), _) => {
                        guard
                            .entries
                            .insert(pending.key.clone(), Entry::Resolved(value.clone()));
                    }
                    (Err(err), FailurePolicy::Memoize) => {
                        guard
                            .entries
                            .insert(pending.key.clone(), Entry::Rejected(err.clone()));
                    }
                    (Err(_), FailurePolicy::Evict) => {
                        guard.entries.remove(&pending.key);
                    }
                }
            }
            let _ = pending.tx.send(Some(outcome));
        }
    }
}

impl<K, V> fmt::Debug for BatchingCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.inner.lock().expect("cache lock poisoned").entries.len();
        f.debug_struct("BatchingCache")
            .field("entry_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;

    /// Test fetcher: counts calls, records batches, and fails keys with
    /// a `missing:` or `boom:` prefix.
    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
        batches: StdMutex<Vec<Vec<String>>>,
    }

    impl CountingFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BatchFetcher<String, String> for CountingFetcher {
        async fn fetch_batch(&self, keys: &[String]) -> Vec<Result<String, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(keys.to_vec());
            keys.iter()
                .map(|key| {
                    if let Some(rest) = key.strip_prefix("missing:") {
                        Err(FetchError::NotFound(rest.to_string()))
                    } else if let Some(rest) = key.strip_prefix("boom:") {
                        Err(FetchError::Store(rest.to_string()))
                    } else {
                        Ok(format!("value:{key}"))
                    }
                })
                .collect()
        }
    }

    /// Fails every key on the first call, succeeds afterwards.
    #[derive(Default)]
    struct FlakyFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BatchFetcher<String, String> for FlakyFetcher {
        async fn fetch_batch(&self, keys: &[String]) -> Vec<Result<String, FetchError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            keys.iter()
                .map(|key| {
                    if call == 0 {
                        Err(FetchError::Store("transient".to_string()))
                    } else {
                        Ok(format!("value:{key}"))
                    }
                })
                .collect()
        }
    }

    /// Returns an empty result sequence regardless of the batch.
    struct EmptyFetcher;

    #[async_trait]
    impl BatchFetcher<String, String> for EmptyFetcher {
        async fn fetch_batch(&self, _keys: &[String]) -> Vec<Result<String, FetchError>> {
            Vec::new()
        }
    }

    fn cache_over(fetcher: Arc<CountingFetcher>) -> BatchingCache<String, String> {
        BatchingCache::new(fetcher)
    }

    // -----------------------------------------------------------------------
    // Coalescing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_loads_issue_one_fetch() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        let (a1, a2, b) = tokio::join!(
            cache.load("a".to_string()),
            cache.load("a".to_string()),
            cache.load("b".to_string()),
        );
        assert_eq!(a1.unwrap(), "value:a");
        assert_eq!(a2.unwrap(), "value:a");
        assert_eq!(b.unwrap(), "value:b");

        assert_eq!(fetcher.calls(), 1);
        // One window, newly-requested keys only, in request order.
        assert_eq!(fetcher.batches(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test]
    async fn sequential_windows_fetch_separately() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        cache.load("a".to_string()).await.unwrap();
        cache.load("b".to_string()).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn resolved_entry_is_served_without_fetch() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        cache.load("a".to_string()).await.unwrap();
        let again = cache.load("a".to_string()).await.unwrap();
        assert_eq!(again, "value:a");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn explicit_flush_dispatches_the_window() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = Arc::new(cache_over(Arc::clone(&fetcher)));

        let task = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.load("a".to_string()).await })
        };
        // Let the load register, then force the dispatch ourselves.
        tokio::task::yield_now().await;
        cache.flush().await;

        assert_eq!(task.await.unwrap().unwrap(), "value:a");
        assert_eq!(fetcher.calls(), 1);
    }

    // -----------------------------------------------------------------------
    // Priming
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn prime_then_load_skips_fetch() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        cache.prime("a".to_string(), "primed".to_string());
        assert_eq!(cache.load("a".to_string()).await.unwrap(), "primed");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn prime_overwrites_resolved_value() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        cache.load("a".to_string()).await.unwrap();
        cache.prime("a".to_string(), "fresher".to_string());
        assert_eq!(cache.load("a".to_string()).await.unwrap(), "fresher");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn prime_after_dispatch_wins_for_future_loads() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = Arc::new(cache_over(Arc::clone(&fetcher)));

        let task = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.load("k".to_string()).await })
        };
        // Let the load register and schedule its flush, then prime before
        // the batch distributes.
        tokio::task::yield_now().await;
        cache.prime("k".to_string(), "primed".to_string());

        // The in-flight waiter still observes the batch outcome.
        assert_eq!(task.await.unwrap().unwrap(), "value:k");
        // Future loads see the primed value.
        assert_eq!(cache.load("k".to_string()).await.unwrap(), "primed");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn prime_overwrites_memoized_rejection() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        assert!(cache.load("missing:a".to_string()).await.is_err());
        cache.prime("missing:a".to_string(), "recovered".to_string());
        assert_eq!(
            cache.load("missing:a".to_string()).await.unwrap(),
            "recovered"
        );
        assert_eq!(fetcher.calls(), 1);
    }

    // -----------------------------------------------------------------------
    // Failure isolation and policy
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn one_failing_key_leaves_siblings_resolved() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        let (good, bad) = tokio::join!(
            cache.load("a".to_string()),
            cache.load("missing:b".to_string()),
        );
        assert_eq!(good.unwrap(), "value:a");
        assert_eq!(bad.unwrap_err(), FetchError::NotFound("b".to_string()));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn memoize_policy_caches_rejections() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        let first = cache.load("boom:a".to_string()).await.unwrap_err();
        let second = cache.load("boom:a".to_string()).await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn evict_policy_retries_failed_keys() {
        let fetcher = Arc::new(FlakyFetcher::default());
        let cache: BatchingCache<String, String> = BatchingCache::with_config(
            fetcher,
            CacheConfig {
                failure_policy: FailurePolicy::Evict,
            },
        );

        assert!(cache.load("a".to_string()).await.is_err());
        assert_eq!(cache.load("a".to_string()).await.unwrap(), "value:a");
    }

    #[tokio::test]
    async fn shape_mismatch_rejects_every_key() {
        let cache: BatchingCache<String, String> = BatchingCache::new(Arc::new(EmptyFetcher));

        let (a, b) = tokio::join!(cache.load("a".to_string()), cache.load("b".to_string()));
        assert_eq!(
            a.unwrap_err(),
            FetchError::ShapeMismatch {
                expected: 2,
                actual: 0
            }
        );
        assert_eq!(
            b.unwrap_err(),
            FetchError::ShapeMismatch {
                expected: 2,
                actual: 0
            }
        );
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn len_and_contains() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(Arc::clone(&fetcher));

        assert!(cache.is_empty());
        cache.prime("a".to_string(), "v".to_string());
        cache.load("b".to_string()).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key(&"a".to_string()));
        assert!(!cache.contains_key(&"c".to_string()));
    }

    #[tokio::test]
    async fn debug_format() {
        let fetcher = Arc::new(CountingFetcher::default());
        let cache = cache_over(fetcher);
        cache.prime("a".to_string(), "v".to_string());
        let debug = format!("{cache:?}");
        assert!(debug.contains("BatchingCache"));
        assert!(debug.contains("entry_count"));
    }
}
